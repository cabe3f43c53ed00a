//! Typed response parsers
//!
//! Every response is first checked by [`Packet::decode`] (length, checksum,
//! descriptor). A non-success status is returned as [`Error::Status`]
//! without looking at the payload; otherwise the payload is interpreted
//! according to the command that was sent.

use byteorder::{ByteOrder, LittleEndian};
use bytes::{Bytes, BytesMut};

use fujinet_types::{
    ClockTime, FormattedTime, InfoFlags, OpenResponseFlags, ReadFlags, SessionInfo, TimeFormat,
};

use crate::{
    command::Command,
    constants::{CLOCK_VERSION, NETWORK_VERSION},
    error::{Error, Result},
    packet::Packet,
};

/// Open response: `ver | flags | reserved(2) | handle(2)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenResponse {
    pub handle: u16,
    pub flags: OpenResponseFlags,
}

impl OpenResponse {
    pub const MIN_LEN: usize = 6;

    pub fn accepted(&self) -> bool {
        self.flags.contains(OpenResponseFlags::ACCEPTED)
    }

    pub fn needs_body(&self) -> bool {
        self.flags.contains(OpenResponseFlags::NEEDS_BODY)
    }
}

/// Read response:
/// `ver | flags | reserved(2) | handle(2) | offset(4) | data_len(2) | data`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResponse {
    pub handle: u16,
    /// Offset the device served from
    pub offset: u32,
    pub flags: ReadFlags,
    /// All `data_len` bytes the device sent
    pub data: Bytes,
}

impl ReadResponse {
    pub const MIN_LEN: usize = 12;

    /// Length the device declared
    pub fn declared_len(&self) -> usize {
        self.data.len()
    }

    /// Copy `min(declared_len, buf.len())` bytes into `buf`, returning the
    /// number copied
    pub fn copy_into(&self, buf: &mut [u8]) -> usize {
        let n = self.data.len().min(buf.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        n
    }
}

/// Write response:
/// `ver | flags | reserved(2) | handle(2) | offset(4) | written(2)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteResponse {
    pub handle: u16,
    pub offset: u32,
    /// Bytes the device accepted
    pub written: u16,
}

impl WriteResponse {
    pub const MIN_LEN: usize = 12;
}

/// Info response:
/// `ver | flags | reserved(2) | handle(2) | http_status(2) | content_length(8)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfoResponse {
    pub handle: u16,
    pub info: SessionInfo,
}

impl InfoResponse {
    pub const MIN_LEN: usize = 16;
}

/// Clock time payload: `ver | flags | reserved(2) | unix_seconds(8)`
const CLOCK_TIME_LEN: usize = 12;

/// Formatted time payload: `ver | flags | reserved(2) | format | len | data`
const FORMATTED_TIME_MIN_LEN: usize = 6;

/// Timezone payload: `ver | flags | reserved(2) | len | tz`
const TIMEZONE_MIN_LEN: usize = 5;

/// Parsed response, one variant per command family
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Open(OpenResponse),
    Read(ReadResponse),
    Write(WriteResponse),
    Close,
    Info(InfoResponse),
    /// Clock Get, Set and SyncNetworkTime
    Time(ClockTime),
    FormattedTime(FormattedTime),
    Timezone(String),
    /// SetTimezone / SetTimezoneSave
    TimezoneSet,
}

impl Response {
    /// Decode a raw frame and parse it as the answer to `expected`
    pub fn decode(expected: Command, frame: BytesMut) -> Result<Self> {
        let packet = Packet::decode(frame)?;
        Self::parse(expected, &packet)
    }

    /// Parse a decoded packet as the answer to `expected`
    pub fn parse(expected: Command, packet: &Packet) -> Result<Self> {
        if packet.command != expected {
            return Err(Error::UnexpectedResponse {
                expected,
                actual: packet.command,
            });
        }

        let status = packet.status();
        if !status.is_ok() {
            return Err(Error::Status(status));
        }

        let p = &packet.payload;

        match expected {
            Command::Open => {
                require(p, OpenResponse::MIN_LEN, NETWORK_VERSION)?;
                Ok(Self::Open(OpenResponse {
                    flags: OpenResponseFlags::from_bits_retain(p[1]),
                    handle: LittleEndian::read_u16(&p[4..6]),
                }))
            }
            Command::Read => {
                require(p, ReadResponse::MIN_LEN, NETWORK_VERSION)?;

                let data_len = LittleEndian::read_u16(&p[10..12]) as usize;
                let end = ReadResponse::MIN_LEN + data_len;
                if end > p.len() {
                    return Err(Error::InvalidFrame(format!(
                        "read data length {} exceeds payload ({} bytes available)",
                        data_len,
                        p.len() - ReadResponse::MIN_LEN
                    )));
                }

                Ok(Self::Read(ReadResponse {
                    flags: ReadFlags::from_bits_retain(p[1]),
                    handle: LittleEndian::read_u16(&p[4..6]),
                    offset: LittleEndian::read_u32(&p[6..10]),
                    data: p.slice(ReadResponse::MIN_LEN..end),
                }))
            }
            Command::Write => {
                require(p, WriteResponse::MIN_LEN, NETWORK_VERSION)?;
                Ok(Self::Write(WriteResponse {
                    handle: LittleEndian::read_u16(&p[4..6]),
                    offset: LittleEndian::read_u32(&p[6..10]),
                    written: LittleEndian::read_u16(&p[10..12]),
                }))
            }
            Command::Close => Ok(Self::Close),
            Command::Info => {
                require(p, InfoResponse::MIN_LEN, NETWORK_VERSION)?;

                let flags = InfoFlags::from_bits_retain(p[1]);
                let http_status = flags
                    .contains(InfoFlags::HAS_STATUS)
                    .then(|| LittleEndian::read_u16(&p[6..8]));
                let content_length = flags
                    .contains(InfoFlags::HAS_LENGTH)
                    .then(|| LittleEndian::read_u64(&p[8..16]));

                Ok(Self::Info(InfoResponse {
                    handle: LittleEndian::read_u16(&p[4..6]),
                    info: SessionInfo::new(http_status, content_length, flags),
                }))
            }
            Command::ClockGet | Command::ClockSet | Command::ClockSyncNetworkTime => {
                require(p, CLOCK_TIME_LEN, CLOCK_VERSION)?;
                Ok(Self::Time(ClockTime::from_unix(LittleEndian::read_u64(&p[4..12]))))
            }
            Command::ClockGetFormat => {
                require(p, FORMATTED_TIME_MIN_LEN, CLOCK_VERSION)?;

                let format = TimeFormat::try_from(p[4])?;
                let data_len = p[5] as usize;
                let end = FORMATTED_TIME_MIN_LEN + data_len;
                if end > p.len() {
                    return Err(Error::InvalidFrame(format!(
                        "formatted time length {data_len} exceeds payload"
                    )));
                }

                let time = FormattedTime::new(format, p[FORMATTED_TIME_MIN_LEN..end].to_vec())?;
                Ok(Self::FormattedTime(time))
            }
            Command::ClockGetTimezone => {
                require(p, TIMEZONE_MIN_LEN, CLOCK_VERSION)?;

                let tz_len = p[4] as usize;
                let end = TIMEZONE_MIN_LEN + tz_len;
                if end > p.len() {
                    return Err(Error::InvalidFrame(format!(
                        "timezone length {tz_len} exceeds payload"
                    )));
                }

                let tz = std::str::from_utf8(&p[TIMEZONE_MIN_LEN..end])
                    .map_err(|e| Error::InvalidFrame(format!("timezone is not UTF-8: {e}")))?;
                Ok(Self::Timezone(tz.to_owned()))
            }
            Command::ClockSetTimezone | Command::ClockSetTimezoneSave => Ok(Self::TimezoneSet),
        }
    }
}

/// Check minimum payload length, then the version byte
fn require(payload: &[u8], min_len: usize, version: u8) -> Result<()> {
    if payload.len() < min_len {
        return Err(Error::InvalidFrame(format!(
            "payload too short: expected at least {} bytes, got {}",
            min_len,
            payload.len()
        )));
    }
    if payload[0] != version {
        return Err(Error::UnsupportedVersion(payload[0]));
    }
    Ok(())
}
