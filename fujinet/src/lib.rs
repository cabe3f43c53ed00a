//! # fujinet
//!
//! Async client for FujiNet companion devices speaking the FujiBus protocol
//! over a serial line (or a TCP serial bridge).
//!
//! ## Features
//!
//! - HTTP(S) and raw TCP sessions through the device's network service
//! - Clock service: get/set time, formatted time, timezone, network sync
//! - SLIP framing with partial-frame reassembly and bounded timeouts
//! - Client-side session table with cursor checks before any exchange
//!
//! ## Quick Start
//!
//! ```no_run
//! use fujinet::{Device, Method, OpenFlags};
//!
//! #[tokio::main]
//! async fn main() -> fujinet::Result<()> {
//!     // Serial port from FN_PORT / FN_BAUD
//!     let mut device = Device::from_env();
//!     device.init().await?;
//!
//!     let handle = device
//!         .open(Method::Get, "https://example.com/", OpenFlags::TLS)
//!         .await?;
//!
//!     let mut buf = [0u8; 512];
//!     loop {
//!         match device.read(handle, 0, &mut buf).await {
//!             Ok(outcome) if outcome.is_eof() => break,
//!             Ok(_) => {}
//!             Err(e) if e.is_not_ready() => continue,
//!             Err(e) => return Err(e),
//!         }
//!     }
//!
//!     device.close(handle).await?;
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod device;
pub mod error;
pub mod exchange;

#[cfg(test)]
mod testing;

// Re-exports
pub use device::Device;
pub use error::{Error, Result};
pub use exchange::Exchange;

// Re-export types
pub use fujinet_core::{Command, ErrorKind, Packet, Session, SessionKind, SessionTable, Status};
pub use fujinet_transport::{SerialTransport, TcpTransport, Transport};
pub use fujinet_types::{
    ClockTime, FormattedTime, InfoFlags, Method, OpenFlags, ReadFlags, ReadOutcome, SessionInfo,
    TimeFormat,
};

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
