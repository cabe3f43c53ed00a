//! Request methods

use std::fmt;

use crate::error::{Error, Result};

/// Method sent with an Open request
///
/// Raw byte-stream sessions (`tcp://`) use [`Method::Stream`], which is
/// encoded as zero on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Method {
    #[default]
    Stream = 0x00,
    Get = 0x01,
    Post = 0x02,
    Put = 0x03,
    Delete = 0x04,
    Head = 0x05,
}

impl Method {
    /// Whether the request normally carries a body
    pub fn has_body(self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Stream => "STREAM",
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }
}

impl From<Method> for u8 {
    fn from(method: Method) -> u8 {
        method as u8
    }
}

impl TryFrom<u8> for Method {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(Self::Stream),
            0x01 => Ok(Self::Get),
            0x02 => Ok(Self::Post),
            0x03 => Ok(Self::Put),
            0x04 => Ok(Self::Delete),
            0x05 => Ok(Self::Head),
            _ => Err(Error::Parse(format!("unknown method code 0x{value:02X}"))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
