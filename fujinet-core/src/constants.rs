//! Protocol constants

/// Payload version byte for the network service
pub const NETWORK_VERSION: u8 = 0x01;

/// Payload version byte for the clock service
pub const CLOCK_VERSION: u8 = 0x01;

/// Maximum FujiBus frame size (header + fields + payload)
pub const MAX_PACKET_SIZE: usize = 1024;

/// Maximum URL length accepted by Open
pub const MAX_URL_LEN: usize = 256;

/// Maximum bytes moved by a single Read or Write
pub const MAX_CHUNK_SIZE: usize = 512;

/// Maximum timezone string length
pub const MAX_TIMEZONE_LEN: usize = 64;

/// Concurrent sessions the device supports
pub const MAX_SESSIONS: usize = 4;

/// Handle value the device never issues
pub const INVALID_HANDLE: u16 = 0x0000;

/// Default overall response timeout (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default interval between link polls while waiting (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
