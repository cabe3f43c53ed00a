//! Error types for fujinet-core

use crate::command::Command;
use crate::status::Status;

/// Result type alias for fujinet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Broad error classes, used by callers to decide how to react
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A caller-supplied value violates a documented constraint
    Argument,
    /// Malformed or inconsistent frame
    Protocol,
    /// Link timeout, I/O failure or busy device
    Transport,
    /// No free session slot, unknown handle
    Resource,
    /// Valid response saying "not yet": poll again
    NotReady,
}

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller passed an invalid value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// URL exceeds the device limit
    #[error("URL too long: {len} bytes (max: {max} bytes)")]
    UrlTooLong {
        len: usize,
        max: usize,
    },

    /// Payload too large
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },

    /// Packet is too short to be valid
    #[error("Packet too short: expected at least {expected} bytes, got {actual} bytes")]
    PacketTooShort {
        expected: usize,
        actual: usize,
    },

    /// Header length disagrees with the bytes received
    #[error("Length mismatch: header says {declared} bytes, frame has {actual} bytes")]
    LengthMismatch {
        declared: usize,
        actual: usize,
    },

    /// Checksum verification failed
    #[error("Checksum mismatch: expected 0x{expected:02X}, received 0x{received:02X}")]
    ChecksumMismatch {
        expected: u8,
        received: u8,
    },

    /// Frame is structurally wrong
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Payload version byte we do not speak
    #[error("Unsupported payload version: {0}")]
    UnsupportedVersion(u8),

    /// Unknown wire device id
    #[error("Unknown device id: 0x{0:02X}")]
    UnknownDevice(u8),

    /// Unknown command code for a known device
    #[error("Unknown command 0x{command:02X} for device 0x{device:02X}")]
    UnknownCommand {
        device: u8,
        command: u8,
    },

    /// Response does not answer the request that was sent
    #[error("Unexpected response: sent {expected}, got {actual}")]
    UnexpectedResponse {
        expected: Command,
        actual: Command,
    },

    /// ESC at the very end of a SLIP frame
    #[error("SLIP frame ends inside an escape sequence")]
    DanglingEscape,

    /// ESC followed by a byte that is not a valid escape target
    #[error("Invalid SLIP escape target: 0x{0:02X}")]
    InvalidEscape(u8),

    /// Raw frame exceeds the receive buffer
    #[error("Frame too large: {size} bytes (max: {max} bytes)")]
    FrameTooLarge {
        size: usize,
        max: usize,
    },

    /// Device answered with a non-success status
    #[error("Device returned status: {0}")]
    Status(Status),

    /// Every session slot is in use
    #[error("No free session handles")]
    NoHandles,

    /// Handle is not tracked (never opened, or already closed)
    #[error("Handle not found: {0}")]
    HandleNotFound(u16),

    /// Value conversion failed
    #[error("Type error: {0}")]
    Types(#[from] fujinet_types::Error),
}

impl Error {
    /// Which class of failure this is
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_)
            | Self::UrlTooLong { .. }
            | Self::PayloadTooLarge { .. } => ErrorKind::Argument,

            Self::PacketTooShort { .. }
            | Self::LengthMismatch { .. }
            | Self::ChecksumMismatch { .. }
            | Self::InvalidFrame(_)
            | Self::UnsupportedVersion(_)
            | Self::UnknownDevice(_)
            | Self::UnknownCommand { .. }
            | Self::UnexpectedResponse { .. }
            | Self::Types(_) => ErrorKind::Protocol,

            Self::DanglingEscape | Self::InvalidEscape(_) | Self::FrameTooLarge { .. } => {
                ErrorKind::Transport
            }

            Self::NoHandles | Self::HandleNotFound(_) => ErrorKind::Resource,

            Self::Status(status) => status.kind(),
        }
    }

    /// Device said the data/condition is not available yet
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::Status(Status::NotReady))
    }

    /// Check if error is recoverable (retry might succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Status(Status::NotReady | Status::Busy | Status::Timeout)
        )
    }
}
