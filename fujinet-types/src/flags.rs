//! Wire flag sets
//!
//! The bit values are the ones the device puts on (and expects from) the
//! wire, so they can be converted with `bits()` / `from_bits_retain()` without
//! any translation table.

use bitflags::bitflags;

bitflags! {
    /// Flags sent with an Open request
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OpenFlags: u8 {
        /// Use TLS for the connection
        const TLS = 0x01;
        /// Follow HTTP redirects
        const FOLLOW_REDIRECTS = 0x02;
        /// Body length not known up front (POST/PUT)
        const BODY_UNKNOWN = 0x04;
        /// Let the device evict an older handle when it is out of slots
        const ALLOW_EVICT = 0x08;
    }
}

bitflags! {
    /// Flags returned in an Open response
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OpenResponseFlags: u8 {
        /// The device allocated a handle
        const ACCEPTED = 0x01;
        /// Request body must be written before the response is available
        const NEEDS_BODY = 0x02;
    }
}

bitflags! {
    /// Flags returned in a Read response
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ReadFlags: u8 {
        /// No more data will follow
        const EOF = 0x01;
        /// The device had more data than was asked for
        const TRUNCATED = 0x02;
    }
}

bitflags! {
    /// Flags returned in an Info response
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InfoFlags: u8 {
        /// Response headers were captured
        const HEADERS = 0x01;
        /// Content length is valid
        const HAS_LENGTH = 0x02;
        /// HTTP status is valid
        const HAS_STATUS = 0x04;
        /// TCP: socket is connected
        const CONNECTED = 0x10;
        /// TCP: peer has closed its side
        const PEER_CLOSED = 0x20;
    }
}

impl ReadFlags {
    /// End of data reached
    pub fn is_eof(self) -> bool {
        self.contains(Self::EOF)
    }
}
