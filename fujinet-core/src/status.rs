//! Device status codes
//!
//! The first descriptor-selected field of a response frame carries one of
//! these. A frame without described fields means [`Status::Ok`].

use std::fmt;

use crate::error::ErrorKind;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Ok,
    NotFound,
    Invalid,
    Busy,
    NotReady,
    Io,
    Timeout,
    Internal,
    Unsupported,
    /// Code this library does not know; preserved verbatim
    Unknown(u8),
}

impl Status {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Error class of a non-success status
    pub fn kind(self) -> ErrorKind {
        match self {
            Self::NotReady => ErrorKind::NotReady,
            Self::Busy | Self::Io | Self::Timeout => ErrorKind::Transport,
            Self::NotFound => ErrorKind::Resource,
            Self::Invalid => ErrorKind::Argument,
            Self::Ok | Self::Internal | Self::Unsupported | Self::Unknown(_) => {
                ErrorKind::Protocol
            }
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NotFound => "Not found",
            Self::Invalid => "Invalid parameter",
            Self::Busy => "Device busy",
            Self::NotReady => "Not ready",
            Self::Io => "I/O error",
            Self::Timeout => "Timeout",
            Self::Internal => "Internal error",
            Self::Unsupported => "Not supported",
            Self::Unknown(_) => "Unknown error",
        }
    }
}

impl From<u8> for Status {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Ok,
            0x01 => Self::NotFound,
            0x02 => Self::Invalid,
            0x03 => Self::Busy,
            0x04 => Self::NotReady,
            0x05 => Self::Io,
            0x06 => Self::Timeout,
            0x07 => Self::Internal,
            0x08 => Self::Unsupported,
            other => Self::Unknown(other),
        }
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> u8 {
        match status {
            Status::Ok => 0x00,
            Status::NotFound => 0x01,
            Status::Invalid => 0x02,
            Status::Busy => 0x03,
            Status::NotReady => 0x04,
            Status::Io => 0x05,
            Status::Timeout => 0x06,
            Status::Internal => 0x07,
            Status::Unsupported => 0x08,
            Status::Unknown(code) => code,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.description(), u8::from(*self))
    }
}
