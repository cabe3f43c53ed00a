//! One request/response cycle over the link
//!
//! The engine SLIP-encodes a request, hands it to the transport, then polls
//! the transport until a complete delimited frame has arrived or the overall
//! deadline passes. Exactly one request is outstanding at a time.

use std::io;
use std::time::Duration;

use bytes::BytesMut;
use tokio::time::Instant;
use tracing::{debug, trace};

use fujinet_core::constants::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS, MAX_PACKET_SIZE};
use fujinet_core::{slip, FrameAccumulator, Request, Response};
use fujinet_transport::Transport;

use crate::error::{Error, Result};

/// Timeout policy for exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exchange {
    timeout: Duration,
    poll_interval: Duration,
}

impl Exchange {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            // A zero wait would spin on the transport
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self::new(timeout, self.poll_interval)
    }

    pub fn with_poll_interval(self, poll_interval: Duration) -> Self {
        Self::new(self.timeout, poll_interval)
    }

    /// Encode `request`, exchange it and parse the answer
    ///
    /// Argument errors surface from encoding, before the transport is
    /// touched.
    pub async fn run(&self, transport: &mut dyn Transport, request: &Request<'_>) -> Result<Response> {
        let command = request.command();
        let frame = request.encode()?;

        trace!(%command, "Exchanging");

        let raw = self.transact(transport, &frame).await?;
        Ok(Response::decode(command, raw)?)
    }

    /// Send one unframed packet and return the unframed response packet
    pub async fn transact(&self, transport: &mut dyn Transport, frame: &[u8]) -> Result<BytesMut> {
        trace!(len = frame.len(), frame = %hex::encode(frame), "Sending frame");

        // Bytes left over from an earlier timed-out exchange belong to no one
        transport.discard_input().await?;

        let wire = slip::encode(frame);
        transport.send(&wire).await?;

        let deadline = Instant::now() + self.timeout;
        let mut accumulator = FrameAccumulator::new(MAX_PACKET_SIZE);

        let delimited = loop {
            let now = Instant::now();
            if now >= deadline {
                if accumulator.pending() > 0 {
                    debug!(pending = accumulator.pending(), "Partial frame at timeout");
                }
                return Err(Error::timeout(self.timeout));
            }

            let wait = self.poll_interval.min(deadline - now);
            let chunk = match transport.receive(wait).await {
                Ok(chunk) => chunk,
                Err(fujinet_transport::Error::ReadTimeout) => continue,
                Err(e) => return Err(e.into()),
            };

            match accumulator.push(&chunk) {
                Ok(Some(delimited)) => break delimited,
                Ok(None) => {}
                Err(e) => return Err(invalid_data(e)),
            }
        };

        let packet = slip::decode(&delimited).map_err(invalid_data)?;
        if packet.is_empty() {
            return Err(invalid_data("empty frame"));
        }

        trace!(len = packet.len(), frame = %hex::encode(&packet), "Received frame");

        Ok(packet)
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_TIMEOUT_MS),
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        )
    }
}

/// Undecodable link data is reported as a transport I/O failure
fn invalid_data<E>(e: E) -> Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    Error::Transport(fujinet_transport::Error::Io(io::Error::new(
        io::ErrorKind::InvalidData,
        e,
    )))
}
