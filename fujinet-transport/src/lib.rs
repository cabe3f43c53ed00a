//! Transport layer for the FujiBus link
//!
//! Provides byte-stream links to the companion device: a serial port, or a
//! TCP bridge that forwards the same SLIP stream.

pub mod error;
pub mod serial;
pub mod tcp;

pub use error::{Error, Result};
pub use serial::SerialTransport;
pub use tcp::TcpTransport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// Transport trait for different communication methods
///
/// Transports move raw bytes only. Framing happens above this layer, so a
/// single `receive` may return part of a frame, or several frames.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the link
    async fn connect(&mut self) -> Result<()>;

    /// Close the link
    async fn disconnect(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Send raw bytes
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive whatever bytes are available, waiting at most `timeout`
    ///
    /// Returns [`Error::ReadTimeout`] when nothing arrived in time.
    async fn receive(&mut self, timeout: Duration) -> Result<BytesMut>;

    /// Drop any bytes already buffered on the receive side
    async fn discard_input(&mut self) -> Result<()> {
        Ok(())
    }

    /// Human-readable peer description (port path or socket address)
    fn remote_addr(&self) -> String;
}
