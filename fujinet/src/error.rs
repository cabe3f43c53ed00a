//! High-level error types

use std::time::Duration;

use fujinet_core::{ErrorKind, Status};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] fujinet_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] fujinet_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] fujinet_types::Error),

    #[error("Device not initialized")]
    NotInitialized,

    #[error("No complete response within {millis} ms")]
    Timeout { millis: u64 },
}

impl Error {
    pub(crate) fn timeout(after: Duration) -> Self {
        Self::Timeout {
            millis: after.as_millis() as u64,
        }
    }

    /// Which class of failure this is
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Core(e) => e.kind(),
            Self::Transport(_) | Self::NotInitialized | Self::Timeout { .. } => {
                ErrorKind::Transport
            }
            Self::Types(fujinet_types::Error::Validation(_)) => ErrorKind::Argument,
            Self::Types(fujinet_types::Error::Parse(_)) => ErrorKind::Protocol,
        }
    }

    /// Device status the error carries, if it came from the device
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Core(fujinet_core::Error::Status(status)) => Some(*status),
            _ => None,
        }
    }

    /// Device said "not yet": poll again
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::Core(e) if e.is_not_ready())
    }

    /// Device does not support the operation for this session kind
    pub fn is_unsupported(&self) -> bool {
        self.status() == Some(Status::Unsupported)
    }

    /// Check if error is recoverable (retry might succeed)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Core(e) => e.is_recoverable(),
            Self::Transport(e) => e.is_timeout(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}
