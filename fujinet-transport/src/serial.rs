//! Serial port transport
//!
//! The port is driven through the blocking `serialport` API on tokio's
//! blocking pool.

use std::env;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use parking_lot::Mutex;
use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, trace, warn};

use crate::{error::*, Transport};

/// Default serial device
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Default line speed
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Environment variable naming the serial device
pub const PORT_ENV: &str = "FN_PORT";

/// Environment variable overriding the baud rate
pub const BAUD_ENV: &str = "FN_BAUD";

const READ_CHUNK: usize = 1024;

type SharedPort = Arc<Mutex<Box<dyn SerialPort>>>;

/// Serial link to the companion device (8N1, no flow control)
pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    port: Option<SharedPort>,
}

impl SerialTransport {
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            port: None,
        }
    }

    /// Configure from `FN_PORT` / `FN_BAUD`, falling back to defaults
    ///
    /// An unparsable `FN_BAUD` is logged and ignored.
    pub fn from_env() -> Self {
        let path = env::var(PORT_ENV).unwrap_or_else(|_| DEFAULT_PORT.to_string());
        let baud_rate = match env::var(BAUD_ENV) {
            Ok(raw) => parse_baud(&raw).unwrap_or_else(|e| {
                warn!("{}, using {}", e, DEFAULT_BAUD_RATE);
                DEFAULT_BAUD_RATE
            }),
            Err(_) => DEFAULT_BAUD_RATE,
        };

        Self::new(path, baud_rate)
    }

    /// Set line speed (takes effect on the next connect)
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn port(&self) -> Result<SharedPort> {
        self.port.clone().ok_or(Error::NotConnected)
    }
}

fn parse_baud(raw: &str) -> Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(Error::InvalidConfig(format!("{BAUD_ENV}={raw:?} is not a baud rate"))),
        Ok(baud) => Ok(baud),
    }
}

/// Run blocking port I/O off the async executor
async fn blocking<T, F>(port: SharedPort, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut dyn SerialPort) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = port.lock();
        f(&mut **guard)
    })
    .await
    .map_err(|e| Error::Io(io::Error::other(e)))?
}

#[async_trait]
impl Transport for SerialTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        debug!("Opening {} at {} baud...", self.path, self.baud_rate);

        let path = self.path.clone();
        let baud_rate = self.baud_rate;
        let port = tokio::task::spawn_blocking(move || {
            serialport::new(path, baud_rate)
                .data_bits(serialport::DataBits::Eight)
                .parity(serialport::Parity::None)
                .stop_bits(serialport::StopBits::One)
                .flow_control(serialport::FlowControl::None)
                .timeout(Duration::from_millis(100))
                .open()
        })
        .await
        .map_err(|e| Error::Io(io::Error::other(e)))??;

        debug!("Opened {}", self.path);

        self.port = Some(Arc::new(Mutex::new(port)));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            debug!("Closed {}", self.path);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port()?;

        trace!("Sending {} bytes: {:02X?}", data.len(), &data[..data.len().min(16)]);

        let data = data.to_vec();
        blocking(port, move |port| {
            port.write_all(&data)?;
            port.flush()?;
            Ok(())
        })
        .await
    }

    async fn receive(&mut self, wait: Duration) -> Result<BytesMut> {
        let port = self.port()?;

        let buf = blocking(port, move |port| {
            port.set_timeout(wait)?;

            let mut buf = BytesMut::zeroed(READ_CHUNK);
            match port.read(&mut buf) {
                Ok(0) => Err(Error::ReadTimeout),
                Ok(n) => {
                    buf.truncate(n);
                    Ok(buf)
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => Err(Error::ReadTimeout),
                Err(e) => Err(Error::Io(e)),
            }
        })
        .await?;

        trace!("Received {} bytes: {:02X?}", buf.len(), &buf[..buf.len().min(16)]);

        Ok(buf)
    }

    async fn discard_input(&mut self) -> Result<()> {
        let port = self.port()?;
        blocking(port, |port| Ok(port.clear(ClearBuffer::Input)?)).await
    }

    fn remote_addr(&self) -> String {
        format!("{}@{}", self.path, self.baud_rate)
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.is_connected() {
            warn!("Serial transport dropped while still open");
        }
    }
}
