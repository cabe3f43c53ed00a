//! High-level device interface

use std::time::Duration;

use tracing::{debug, info, warn};

use fujinet_core::constants::MAX_CHUNK_SIZE;
use fujinet_core::{Request, Response, Session, SessionKind, SessionTable};
use fujinet_transport::{SerialTransport, TcpTransport, Transport};
use fujinet_types::{Method, OpenFlags, ReadOutcome, SessionInfo};

use crate::error::{Error, Result};
use crate::exchange::Exchange;

/// FujiNet companion device
///
/// Owns the link and the table of open sessions. Every operation is one
/// request/response exchange; the device is addressed strictly one
/// transaction at a time.
///
/// # Examples
///
/// ```no_run
/// use fujinet::{Device, Method, OpenFlags};
///
/// #[tokio::main]
/// async fn main() -> fujinet::Result<()> {
///     let mut device = Device::tcp("127.0.0.1", 6502);
///     device.init().await?;
///
///     let handle = device.tcp_open("example.com", 7).await?;
///     device.write(handle, 0, b"PING\r\n").await?;
///
///     let mut buf = [0u8; 512];
///     let outcome = device.read(handle, 0, &mut buf).await?;
///     println!("{:?}", &buf[..outcome.bytes_read]);
///
///     device.close(handle).await?;
///     device.shutdown().await?;
///     Ok(())
/// }
/// ```
pub struct Device {
    transport: Box<dyn Transport>,
    sessions: SessionTable,
    exchange: Exchange,
    initialized: bool,
}

impl Device {
    /// Create a device on any transport
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            sessions: SessionTable::new(),
            exchange: Exchange::default(),
            initialized: false,
        }
    }

    /// Device on a serial port
    pub fn serial(path: impl Into<String>, baud_rate: u32) -> Self {
        Self::new(SerialTransport::new(path, baud_rate))
    }

    /// Device behind a TCP serial bridge
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::new(TcpTransport::new(host, port))
    }

    /// Serial device configured from `FN_PORT` / `FN_BAUD`
    pub fn from_env() -> Self {
        Self::new(SerialTransport::from_env())
    }

    /// Set overall response timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.exchange = self.exchange.with_timeout(timeout);
        self
    }

    /// Set how long each link poll waits while a response is pending
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.exchange = self.exchange.with_poll_interval(poll_interval);
        self
    }

    /// Track at most `capacity` sessions
    pub fn with_sessions(mut self, capacity: usize) -> Self {
        self.sessions = SessionTable::with_capacity(capacity);
        self
    }

    /// Session table (shared handle)
    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    /// Local state for `handle`
    pub fn session(&self, handle: u16) -> Option<Session> {
        self.sessions.get(handle)
    }

    /// Open the link and drop any stale input
    pub async fn init(&mut self) -> Result<()> {
        if !self.transport.is_connected() {
            info!("Connecting to {}...", self.transport.remote_addr());
            self.transport.connect().await?;
        }

        self.transport.discard_input().await?;
        self.initialized = true;

        info!("Link ready on {}", self.transport.remote_addr());
        Ok(())
    }

    /// Check if the link is up
    pub fn is_ready(&self) -> bool {
        self.initialized && self.transport.is_connected()
    }

    /// Forget all sessions and close the link
    ///
    /// Sessions are not closed on the device.
    pub async fn shutdown(&mut self) -> Result<()> {
        if !self.sessions.is_empty() {
            warn!(open = ?self.sessions.handles(), "Shutting down with open sessions");
        }
        self.sessions.clear();
        self.initialized = false;

        self.transport.disconnect().await?;
        info!("Disconnected");
        Ok(())
    }

    /// Open a session on `url`
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The URL is empty or longer than the device limit
    /// - Every local session slot is in use (checked before any exchange)
    /// - The device refuses the open
    pub async fn open(&mut self, method: Method, url: &str, flags: OpenFlags) -> Result<u16> {
        self.open_with_body(method, url, flags, 0).await
    }

    /// Open a session announcing a request body of `body_len` bytes
    pub async fn open_with_body(
        &mut self,
        method: Method,
        url: &str,
        flags: OpenFlags,
        body_len: u32,
    ) -> Result<u16> {
        let request = Request::Open {
            method,
            flags,
            url,
            body_len_hint: body_len,
        };
        request.to_packet()?;

        let reservation = self.sessions.reserve()?;

        let open = match self.call(&request).await? {
            Response::Open(open) => open,
            other => return Err(unexpected(other)),
        };

        if !open.accepted() {
            return Err(protocol(format!("open of {url} not accepted")));
        }

        let mut session = Session::new(open.handle, SessionKind::from_url(url));
        session.needs_body_write = open.needs_body();
        reservation.bind(session)?;

        debug!(handle = open.handle, %method, url, "Session opened");
        Ok(open.handle)
    }

    /// Open a raw TCP stream to `host:port`
    pub async fn tcp_open(&mut self, host: &str, port: u16) -> Result<u16> {
        let url = format!("tcp://{host}:{port}");
        self.open(Method::Stream, &url, OpenFlags::empty()).await
    }

    /// Write `data` at `offset`, returning the bytes the device accepted
    ///
    /// `offset` must equal the session's write cursor; the cursor advances
    /// by the accepted count only. An empty `data` is a half-close.
    pub async fn write(&mut self, handle: u16, offset: u32, data: &[u8]) -> Result<u16> {
        let session = self.lookup(handle)?;
        if offset != session.write_cursor {
            return Err(fujinet_core::Error::InvalidArgument(format!(
                "write offset {} does not match cursor {} on handle {}",
                offset, session.write_cursor, handle
            ))
            .into());
        }

        let request = Request::Write { handle, offset, data };
        let written = match self.call(&request).await? {
            Response::Write(write) => {
                check_handle(handle, write.handle)?;
                check_offset(offset, write.offset)?;
                write.written
            }
            other => return Err(unexpected(other)),
        };

        if written as usize > data.len() {
            return Err(protocol(format!(
                "device accepted {} bytes of a {}-byte write",
                written,
                data.len()
            )));
        }

        self.sessions.update(handle, |s| {
            s.write_cursor = s.write_cursor.wrapping_add(written as u32);
            if data.is_empty() {
                s.needs_body_write = false;
            }
        })?;

        Ok(written)
    }

    /// Signal end of the request body or outgoing stream
    ///
    /// Returns `false` when the device does not support half-close for this
    /// session kind.
    pub async fn half_close(&mut self, handle: u16) -> Result<bool> {
        let cursor = self.lookup(handle)?.write_cursor;

        match self.write(handle, cursor, &[]).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_unsupported() => {
                debug!(handle, "Half-close not supported");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Read up to `buf.len()` bytes (at most one chunk) from `offset`
    ///
    /// A "not ready" device status comes back as an error with
    /// [`Error::is_not_ready`] set; poll again.
    pub async fn read(&mut self, handle: u16, offset: u32, buf: &mut [u8]) -> Result<ReadOutcome> {
        self.lookup(handle)?;
        if buf.is_empty() {
            return Err(fujinet_core::Error::InvalidArgument("empty read buffer".into()).into());
        }

        let max_bytes = buf.len().min(MAX_CHUNK_SIZE) as u16;
        let request = Request::Read {
            handle,
            offset,
            max_bytes,
        };

        let read = match self.call(&request).await? {
            Response::Read(read) => read,
            other => return Err(unexpected(other)),
        };
        check_handle(handle, read.handle)?;
        check_offset(offset, read.offset)?;

        let bytes_read = read.copy_into(buf);
        let outcome = ReadOutcome {
            bytes_read,
            declared_len: read.declared_len(),
            flags: read.flags,
        };

        if outcome.is_truncated() {
            debug!(handle, declared = outcome.declared_len, bytes_read, "Read truncated");
        }

        self.sessions.update(handle, |s| {
            s.read_cursor = offset.wrapping_add(bytes_read as u32);
        })?;

        Ok(outcome)
    }

    /// Query HTTP status, content length and connection state
    pub async fn info(&mut self, handle: u16) -> Result<SessionInfo> {
        self.lookup(handle)?;

        match self.call(&Request::Info { handle }).await? {
            Response::Info(info) => {
                check_handle(handle, info.handle)?;
                Ok(info.info)
            }
            other => Err(unexpected(other)),
        }
    }

    /// Close the session on the device and locally
    ///
    /// The local entry is released even when the device reports an error.
    pub async fn close(&mut self, handle: u16) -> Result<()> {
        self.lookup(handle)?;

        let result = self.call(&Request::Close { handle }).await;
        self.sessions.remove(handle);

        match result? {
            Response::Close => {
                debug!(handle, "Session closed");
                Ok(())
            }
            other => Err(unexpected(other)),
        }
    }

    // Helper methods

    fn ensure_ready(&self) -> Result<()> {
        if !self.is_ready() {
            return Err(Error::NotInitialized);
        }
        Ok(())
    }

    fn lookup(&self, handle: u16) -> Result<Session> {
        self.sessions
            .get(handle)
            .ok_or_else(|| fujinet_core::Error::HandleNotFound(handle).into())
    }

    pub(crate) async fn call(&mut self, request: &Request<'_>) -> Result<Response> {
        self.ensure_ready()?;
        self.exchange.run(self.transport.as_mut(), request).await
    }
}

fn check_handle(expected: u16, actual: u16) -> Result<()> {
    if expected != actual {
        return Err(protocol(format!(
            "response for handle {actual}, expected {expected}"
        )));
    }
    Ok(())
}

fn check_offset(expected: u32, actual: u32) -> Result<()> {
    if expected != actual {
        return Err(protocol(format!(
            "response for offset {actual}, expected {expected}"
        )));
    }
    Ok(())
}

pub(crate) fn protocol(message: String) -> Error {
    fujinet_core::Error::InvalidFrame(message).into()
}

pub(crate) fn unexpected(response: Response) -> Error {
    protocol(format!("unexpected response: {response:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockScript, MockTransport};
    use fujinet_core::{Command, ErrorKind, Packet, Status};
    use fujinet_types::{InfoFlags, ReadFlags};
    use pretty_assertions::assert_eq;

    fn payload(head: &[u8], handle: u16, tail: &[u8]) -> Vec<u8> {
        let mut p = head.to_vec();
        p.extend_from_slice(&handle.to_le_bytes());
        p.extend_from_slice(tail);
        p
    }

    fn open_ok(handle: u16) -> Packet {
        Packet::with_status(Command::Open, Status::Ok, payload(&[1, 0x01, 0, 0], handle, &[]))
    }

    fn write_ok(handle: u16, offset: u32, written: u16) -> Packet {
        let mut tail = offset.to_le_bytes().to_vec();
        tail.extend_from_slice(&written.to_le_bytes());
        Packet::with_status(Command::Write, Status::Ok, payload(&[1, 0, 0, 0], handle, &tail))
    }

    fn read_ok(handle: u16, offset: u32, flags: ReadFlags, data: &[u8]) -> Packet {
        let mut tail = offset.to_le_bytes().to_vec();
        tail.extend_from_slice(&(data.len() as u16).to_le_bytes());
        tail.extend_from_slice(data);
        Packet::with_status(
            Command::Read,
            Status::Ok,
            payload(&[1, flags.bits(), 0, 0], handle, &tail),
        )
    }

    async fn ready_device() -> (Device, MockScript) {
        let (transport, script) = MockTransport::new();
        let mut device = Device::new(transport);
        device.init().await.unwrap();
        (device, script)
    }

    #[test]
    fn test_device_create() {
        let device = Device::tcp("127.0.0.1", 6502);
        assert!(!device.is_ready());
        assert!(device.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_requires_init() {
        let (transport, script) = MockTransport::new();
        let mut device = Device::new(transport);

        let err = device.open(Method::Get, "http://x/", OpenFlags::empty()).await.unwrap_err();
        assert!(matches!(err, Error::NotInitialized));
        assert_eq!(script.exchanges(), 0);
    }

    #[tokio::test]
    async fn test_tcp_ping_pong() {
        let (mut device, script) = ready_device().await;
        script.reply(open_ok(2));
        script.reply(write_ok(2, 0, 6));
        script.reply(read_ok(2, 0, ReadFlags::EOF, b"PONG\r\n"));

        let handle = device.tcp_open("host", 7777).await.unwrap();
        assert_eq!(handle, 2);
        assert_eq!(device.session(2).unwrap().kind, SessionKind::Tcp);

        let written = device.write(handle, 0, b"PING\r\n").await.unwrap();
        assert_eq!(written, 6);
        assert_eq!(device.session(handle).unwrap().write_cursor, 6);

        let mut buf = [0u8; 512];
        let outcome = device.read(handle, 0, &mut buf).await.unwrap();
        assert_eq!(outcome.bytes_read, 6);
        assert!(outcome.is_eof());
        assert_eq!(&buf[..6], b"PONG\r\n");
        assert_eq!(device.session(handle).unwrap().read_cursor, 6);

        let requests = script.requests();
        assert_eq!(requests.len(), 3);
        let url_len = u16::from_le_bytes([requests[0].payload[3], requests[0].payload[4]]) as usize;
        assert_eq!(&requests[0].payload[5..5 + url_len], b"tcp://host:7777");
    }

    #[tokio::test]
    async fn test_write_offset_mismatch_skips_exchange() {
        let (mut device, script) = ready_device().await;
        script.reply(open_ok(1));
        let handle = device.open(Method::Post, "http://x/", OpenFlags::empty()).await.unwrap();

        let err = device.write(handle, 4, b"data").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert_eq!(script.exchanges(), 1);
    }

    #[tokio::test]
    async fn test_partial_write_advances_by_accepted_bytes() {
        let (mut device, script) = ready_device().await;
        script.reply(open_ok(1));
        script.reply(write_ok(1, 0, 3));

        let handle = device.open(Method::Post, "http://x/", OpenFlags::empty()).await.unwrap();
        assert_eq!(device.write(handle, 0, b"abcdef").await.unwrap(), 3);
        assert_eq!(device.session(handle).unwrap().write_cursor, 3);
    }

    #[tokio::test]
    async fn test_unknown_handle_skips_exchange() {
        let (mut device, script) = ready_device().await;

        let mut buf = [0u8; 16];
        for err in [
            device.read(9, 0, &mut buf).await.unwrap_err(),
            device.write(9, 0, b"x").await.unwrap_err(),
            device.info(9).await.unwrap_err(),
            device.close(9).await.unwrap_err(),
        ] {
            assert_eq!(err.kind(), ErrorKind::Resource);
        }
        assert_eq!(script.exchanges(), 0);
    }

    #[tokio::test]
    async fn test_read_length_mismatch_is_protocol_error() {
        let (mut device, script) = ready_device().await;
        script.reply(open_ok(1));

        let mut frame = read_ok(1, 0, ReadFlags::empty(), b"hello").encode().unwrap();
        // Header claims one byte more than was framed
        let declared = u16::from_le_bytes([frame[2], frame[3]]) + 1;
        frame[2..4].copy_from_slice(&declared.to_le_bytes());
        script.reply_chunks(vec![fujinet_core::slip::encode(&frame).to_vec()]);

        let handle = device.open(Method::Get, "http://x/", OpenFlags::empty()).await.unwrap();
        let mut buf = [0u8; 64];
        let err = device.read(handle, 0, &mut buf).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Core(fujinet_core::Error::LengthMismatch { .. })
        ));
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn test_read_not_ready() {
        let (mut device, script) = ready_device().await;
        script.reply(open_ok(1));
        script.reply(Packet::with_status(Command::Read, Status::NotReady, vec![]));

        let handle = device.open(Method::Get, "http://x/", OpenFlags::empty()).await.unwrap();
        let mut buf = [0u8; 64];
        let err = device.read(handle, 0, &mut buf).await.unwrap_err();

        assert!(err.is_not_ready());
        assert!(err.is_recoverable());
        assert!(device.session(handle).is_some());
    }

    #[tokio::test]
    async fn test_read_truncated_to_buffer() {
        let (mut device, script) = ready_device().await;
        script.reply(open_ok(1));
        script.reply(read_ok(1, 0, ReadFlags::empty(), b"0123456789"));

        let handle = device.open(Method::Get, "http://x/", OpenFlags::empty()).await.unwrap();
        let mut buf = [0u8; 4];
        let outcome = device.read(handle, 0, &mut buf).await.unwrap();

        assert_eq!(outcome.bytes_read, 4);
        assert_eq!(outcome.declared_len, 10);
        assert!(outcome.is_truncated());

        // Request asked for no more than the buffer holds
        let read_req = &script.requests()[1];
        assert_eq!(&read_req.payload[7..9], &4u16.to_le_bytes());
    }

    #[tokio::test]
    async fn test_info_not_ready() {
        let (mut device, script) = ready_device().await;
        script.reply(open_ok(1));
        script.reply(Packet::with_status(Command::Info, Status::NotReady, vec![]));

        let handle = device.open(Method::Get, "http://x/", OpenFlags::empty()).await.unwrap();
        let err = device.info(handle).await.unwrap_err();
        assert!(err.is_not_ready());
    }

    #[tokio::test]
    async fn test_info_reports_absent_fields() {
        let (mut device, script) = ready_device().await;
        script.reply(open_ok(1));

        let flags = InfoFlags::HAS_STATUS | InfoFlags::CONNECTED;
        let mut tail = 200u16.to_le_bytes().to_vec();
        tail.extend_from_slice(&999u64.to_le_bytes());
        script.reply(Packet::with_status(
            Command::Info,
            Status::Ok,
            payload(&[1, flags.bits(), 0, 0], 1, &tail),
        ));

        let handle = device.open(Method::Get, "http://x/", OpenFlags::empty()).await.unwrap();
        let info = device.info(handle).await.unwrap();

        assert_eq!(info.http_status, Some(200));
        assert_eq!(info.content_length, None);
        assert!(info.is_connected());
    }

    #[tokio::test]
    async fn test_open_when_full_fails_locally() {
        let (transport, script) = MockTransport::new();
        let mut device = Device::new(transport).with_sessions(1);
        device.init().await.unwrap();

        script.reply(open_ok(1));
        device.open(Method::Get, "http://a/", OpenFlags::empty()).await.unwrap();

        let err = device.open(Method::Get, "http://b/", OpenFlags::empty()).await.unwrap_err();
        assert!(matches!(err, Error::Core(fujinet_core::Error::NoHandles)));
        assert_eq!(script.exchanges(), 1);
    }

    #[tokio::test]
    async fn test_failed_open_releases_slot() {
        let (transport, script) = MockTransport::new();
        let mut device = Device::new(transport).with_sessions(1);
        device.init().await.unwrap();

        script.reply(Packet::with_status(Command::Open, Status::Io, vec![]));
        script.reply(open_ok(4));

        assert!(device.open(Method::Get, "http://a/", OpenFlags::empty()).await.is_err());
        assert_eq!(device.open(Method::Get, "http://a/", OpenFlags::empty()).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_url_too_long_skips_exchange() {
        let (mut device, script) = ready_device().await;
        let url = format!("http://{}", "a".repeat(300));

        let err = device.open(Method::Get, &url, OpenFlags::empty()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert_eq!(script.exchanges(), 0);
        assert!(device.sessions().reserve().is_ok());
    }

    #[tokio::test]
    async fn test_half_close() {
        let (mut device, script) = ready_device().await;
        script.reply(open_ok(3));
        script.reply(write_ok(3, 0, 4));
        script.reply(write_ok(3, 4, 0));

        let handle = device.tcp_open("host", 7).await.unwrap();
        device.write(handle, 0, b"data").await.unwrap();
        assert!(device.half_close(handle).await.unwrap());

        let last = script.requests().pop().unwrap();
        assert_eq!(last.command, Command::Write);
        // offset 4, zero length
        assert_eq!(&last.payload[3..9], &[4, 0, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_half_close_unsupported_is_tolerated() {
        let (mut device, script) = ready_device().await;
        script.reply(open_ok(3));
        script.reply(Packet::with_status(Command::Write, Status::Unsupported, vec![]));

        let handle = device.open(Method::Get, "http://x/", OpenFlags::empty()).await.unwrap();
        assert!(!device.half_close(handle).await.unwrap());
    }

    #[tokio::test]
    async fn test_close_releases_even_on_device_error() {
        let (mut device, script) = ready_device().await;
        script.reply(open_ok(5));
        script.reply(Packet::with_status(Command::Close, Status::NotFound, vec![]));

        let handle = device.open(Method::Get, "http://x/", OpenFlags::empty()).await.unwrap();
        assert!(device.close(handle).await.is_err());
        assert!(device.session(handle).is_none());
    }

    #[tokio::test]
    async fn test_mismatched_handle_echo() {
        let (mut device, script) = ready_device().await;
        script.reply(open_ok(1));
        script.reply(read_ok(2, 0, ReadFlags::empty(), b"x"));

        let handle = device.open(Method::Get, "http://x/", OpenFlags::empty()).await.unwrap();
        let mut buf = [0u8; 8];
        let err = device.read(handle, 0, &mut buf).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn test_mismatched_offset_echo() {
        let (mut device, script) = ready_device().await;
        script.reply(open_ok(1));
        script.reply(read_ok(1, 512, ReadFlags::empty(), b"stale"));

        let handle = device.open(Method::Get, "http://x/", OpenFlags::empty()).await.unwrap();
        let mut buf = [0u8; 8];
        let err = device.read(handle, 1024, &mut buf).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(buf, [0u8; 8]);
        assert_eq!(device.session(handle).unwrap().read_cursor, 0);
    }

    #[tokio::test]
    async fn test_mismatched_write_offset_echo() {
        let (mut device, script) = ready_device().await;
        script.reply(open_ok(1));
        script.reply(write_ok(1, 64, 4));

        let handle = device.open(Method::Post, "http://x/", OpenFlags::empty()).await.unwrap();
        let err = device.write(handle, 0, b"body").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(device.session(handle).unwrap().write_cursor, 0);
    }

    #[tokio::test]
    async fn test_shutdown_clears_sessions() {
        let (mut device, script) = ready_device().await;
        script.reply(open_ok(1));
        device.open(Method::Get, "http://x/", OpenFlags::empty()).await.unwrap();

        device.shutdown().await.unwrap();
        assert!(!device.is_ready());
        assert!(device.sessions().is_empty());
    }
}
