//! Scripted transport for unit tests
//!
//! Each `send` records the decoded request and appends the next scripted
//! reply to the receive queue, behind anything already on the link. With
//! nothing queued, `receive` waits out its timeout and reports `ReadTimeout`,
//! like a silent device.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use parking_lot::Mutex;

use fujinet_core::{slip, Packet};
use fujinet_transport::{Error, Result, Transport};

#[derive(Debug, Default)]
struct Script {
    /// One entry per expected request, each a list of link chunks
    replies: VecDeque<Vec<Vec<u8>>>,
    /// Bytes on the link, not yet received
    inbound: VecDeque<Vec<u8>>,
    requests: Vec<Packet>,
}

pub(crate) struct MockTransport {
    script: Arc<Mutex<Script>>,
    connected: bool,
}

/// Test-side view of a [`MockTransport`]
#[derive(Clone)]
pub(crate) struct MockScript {
    script: Arc<Mutex<Script>>,
}

impl MockTransport {
    pub(crate) fn new() -> (Self, MockScript) {
        let script = Arc::new(Mutex::new(Script::default()));
        let transport = Self {
            script: script.clone(),
            connected: true,
        };
        (transport, MockScript { script })
    }
}

impl MockScript {
    /// Answer the next request with `packet`
    pub(crate) fn reply(&self, packet: Packet) {
        let frame = packet.encode().expect("scripted reply must encode");
        self.reply_chunks(vec![slip::encode(&frame).to_vec()]);
    }

    /// Answer the next request with raw link bytes, delivered one chunk per
    /// receive
    pub(crate) fn reply_chunks(&self, chunks: Vec<Vec<u8>>) {
        self.script.lock().replies.push_back(chunks);
    }

    /// Put `packet` on the link now, outside any request/reply pairing,
    /// like a reply that arrives after its request gave up
    pub(crate) fn arrive(&self, packet: Packet) {
        let frame = packet.encode().expect("late frame must encode");
        self.script.lock().inbound.push_back(slip::encode(&frame).to_vec());
    }

    /// Requests sent so far, decoded
    pub(crate) fn requests(&self) -> Vec<Packet> {
        self.script.lock().requests.clone()
    }

    /// Number of requests that reached the link
    pub(crate) fn exchanges(&self) -> usize {
        self.script.lock().requests.len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        let frame = slip::decode(data).expect("client sent invalid SLIP");
        let packet = Packet::decode(frame).expect("client sent invalid frame");

        let mut script = self.script.lock();
        script.requests.push(packet);
        if let Some(chunks) = script.replies.pop_front() {
            script.inbound.extend(chunks);
        }
        Ok(())
    }

    async fn receive(&mut self, timeout: Duration) -> Result<BytesMut> {
        let chunk = self.script.lock().inbound.pop_front();
        match chunk {
            Some(chunk) => Ok(BytesMut::from(&chunk[..])),
            None => {
                tokio::time::sleep(timeout).await;
                Err(Error::ReadTimeout)
            }
        }
    }

    async fn discard_input(&mut self) -> Result<()> {
        self.script.lock().inbound.clear();
        Ok(())
    }

    fn remote_addr(&self) -> String {
        "mock".into()
    }
}
