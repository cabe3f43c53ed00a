//! Session information structures

use std::fmt;

use crate::flags::{InfoFlags, ReadFlags};

/// Session information reported by an Info exchange
///
/// Fields the device did not flag as valid are `None` rather than a
/// placeholder value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionInfo {
    /// HTTP status code (HTTP sessions, once headers arrived)
    pub http_status: Option<u16>,

    /// Content length, when the server announced one
    pub content_length: Option<u64>,

    /// Raw info flags
    pub flags: InfoFlags,
}

impl SessionInfo {
    pub fn new(http_status: Option<u16>, content_length: Option<u64>, flags: InfoFlags) -> Self {
        Self {
            http_status,
            content_length,
            flags,
        }
    }

    /// TCP sessions: socket is connected
    pub fn is_connected(&self) -> bool {
        self.flags.contains(InfoFlags::CONNECTED)
    }

    /// TCP sessions: remote side closed
    pub fn peer_closed(&self) -> bool {
        self.flags.contains(InfoFlags::PEER_CLOSED)
    }
}

impl fmt::Display for SessionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Session[")?;
        match self.http_status {
            Some(status) => write!(f, "status: {status}")?,
            None => write!(f, "status: -")?,
        }
        match self.content_length {
            Some(len) => write!(f, ", length: {len}")?,
            None => write!(f, ", length: -")?,
        }
        write!(f, ", flags: 0x{:02X}]", self.flags.bits())
    }
}

/// Result of a Read exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadOutcome {
    /// Bytes copied into the caller's buffer
    pub bytes_read: usize,

    /// Data length the device declared; larger than `bytes_read` when the
    /// caller's buffer was too small
    pub declared_len: usize,

    pub flags: ReadFlags,
}

impl ReadOutcome {
    pub fn is_eof(&self) -> bool {
        self.flags.is_eof()
    }

    /// The device sent more than fit into the caller's buffer
    pub fn is_truncated(&self) -> bool {
        self.declared_len > self.bytes_read || self.flags.contains(ReadFlags::TRUNCATED)
    }
}
