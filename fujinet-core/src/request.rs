//! Typed request builders
//!
//! Each variant validates its arguments and lays out its payload; the frame
//! header, descriptor and checksum come from [`Packet::encode`].

use bytes::{BufMut, BytesMut};

use fujinet_types::{ClockTime, Method, OpenFlags, TimeFormat};

use crate::{
    command::Command,
    constants::{
        CLOCK_VERSION, INVALID_HANDLE, MAX_CHUNK_SIZE, MAX_TIMEZONE_LEN, MAX_URL_LEN,
        NETWORK_VERSION,
    },
    error::{Error, Result},
    packet::Packet,
};

/// A request to the companion device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request<'a> {
    /// Open a session on `url`
    Open {
        method: Method,
        flags: OpenFlags,
        url: &'a str,
        /// Expected request body length for POST/PUT (0 when unknown or none)
        body_len_hint: u32,
    },
    Read {
        handle: u16,
        offset: u32,
        max_bytes: u16,
    },
    /// Write `data` at `offset`; empty `data` is a half-close
    Write {
        handle: u16,
        offset: u32,
        data: &'a [u8],
    },
    Close {
        handle: u16,
    },
    Info {
        handle: u16,
    },
    ClockGet,
    ClockSet {
        time: ClockTime,
    },
    /// Render the current time; `timezone` overrides the device timezone
    /// for this request only
    ClockGetFormat {
        format: TimeFormat,
        timezone: Option<&'a str>,
    },
    ClockGetTimezone,
    /// Set the device timezone; `persist` also saves it to configuration
    ClockSetTimezone {
        timezone: &'a str,
        persist: bool,
    },
    ClockSyncNetworkTime,
}

impl Request<'_> {
    pub fn command(&self) -> Command {
        match self {
            Self::Open { .. } => Command::Open,
            Self::Read { .. } => Command::Read,
            Self::Write { .. } => Command::Write,
            Self::Close { .. } => Command::Close,
            Self::Info { .. } => Command::Info,
            Self::ClockGet => Command::ClockGet,
            Self::ClockSet { .. } => Command::ClockSet,
            Self::ClockGetFormat { .. } => Command::ClockGetFormat,
            Self::ClockGetTimezone => Command::ClockGetTimezone,
            Self::ClockSetTimezone { persist: false, .. } => Command::ClockSetTimezone,
            Self::ClockSetTimezone { persist: true, .. } => Command::ClockSetTimezoneSave,
            Self::ClockSyncNetworkTime => Command::ClockSyncNetworkTime,
        }
    }

    /// Validate arguments and build the packet
    pub fn to_packet(&self) -> Result<Packet> {
        let mut payload = BytesMut::new();

        match *self {
            Self::Open {
                method,
                flags,
                url,
                body_len_hint,
            } => {
                validate_url(url)?;

                // version + method + flags + url_len + url + header_count + body_len + resp_header_count
                payload.reserve(1 + 1 + 1 + 2 + url.len() + 2 + 4 + 2);
                payload.put_u8(NETWORK_VERSION);
                payload.put_u8(method.into());
                payload.put_u8(flags.bits());
                payload.put_u16_le(url.len() as u16);
                payload.put_slice(url.as_bytes());
                payload.put_u16_le(0); // Request headers
                payload.put_u32_le(body_len_hint);
                payload.put_u16_le(0); // Captured response headers
            }
            Self::Read {
                handle,
                offset,
                max_bytes,
            } => {
                validate_handle(handle)?;
                if max_bytes == 0 {
                    return Err(Error::InvalidArgument("read of zero bytes".into()));
                }
                if max_bytes as usize > MAX_CHUNK_SIZE {
                    return Err(Error::PayloadTooLarge {
                        size: max_bytes as usize,
                        max: MAX_CHUNK_SIZE,
                    });
                }

                payload.put_u8(NETWORK_VERSION);
                payload.put_u16_le(handle);
                payload.put_u32_le(offset);
                payload.put_u16_le(max_bytes);
            }
            Self::Write {
                handle,
                offset,
                data,
            } => {
                validate_handle(handle)?;
                if data.len() > MAX_CHUNK_SIZE {
                    return Err(Error::PayloadTooLarge {
                        size: data.len(),
                        max: MAX_CHUNK_SIZE,
                    });
                }

                payload.reserve(1 + 2 + 4 + 2 + data.len());
                payload.put_u8(NETWORK_VERSION);
                payload.put_u16_le(handle);
                payload.put_u32_le(offset);
                payload.put_u16_le(data.len() as u16);
                payload.put_slice(data);
            }
            Self::Close { handle } | Self::Info { handle } => {
                validate_handle(handle)?;

                payload.put_u8(NETWORK_VERSION);
                payload.put_u16_le(handle);
            }
            Self::ClockGet => {}
            Self::ClockSet { time } => {
                payload.put_u8(CLOCK_VERSION);
                payload.put_u64_le(time.unix_seconds());
            }
            Self::ClockGetFormat { format, timezone } => {
                let tz = timezone.unwrap_or("");
                if timezone.is_some() {
                    validate_timezone(tz)?;
                }

                payload.put_u8(CLOCK_VERSION);
                payload.put_u8(format.into());
                payload.put_u8(tz.len() as u8);
                payload.put_slice(tz.as_bytes());
            }
            Self::ClockGetTimezone | Self::ClockSyncNetworkTime => {
                payload.put_u8(CLOCK_VERSION);
            }
            Self::ClockSetTimezone { timezone, .. } => {
                validate_timezone(timezone)?;

                payload.put_u8(CLOCK_VERSION);
                payload.put_u8(timezone.len() as u8);
                payload.put_slice(timezone.as_bytes());
            }
        }

        Ok(Packet::with_payload(self.command(), payload.freeze()))
    }

    /// Build the complete frame (before SLIP)
    pub fn encode(&self) -> Result<BytesMut> {
        self.to_packet()?.encode()
    }
}

fn validate_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(Error::InvalidArgument("empty URL".into()));
    }
    if url.len() > MAX_URL_LEN {
        return Err(Error::UrlTooLong {
            len: url.len(),
            max: MAX_URL_LEN,
        });
    }
    Ok(())
}

fn validate_handle(handle: u16) -> Result<()> {
    if handle == INVALID_HANDLE {
        return Err(Error::InvalidArgument("invalid handle 0".into()));
    }
    Ok(())
}

fn validate_timezone(tz: &str) -> Result<()> {
    if tz.is_empty() {
        return Err(Error::InvalidArgument("empty timezone".into()));
    }
    if tz.len() > MAX_TIMEZONE_LEN {
        return Err(Error::InvalidArgument(format!(
            "timezone too long: {} bytes (max: {} bytes)",
            tz.len(),
            MAX_TIMEZONE_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::HEADER_SIZE;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_open_payload() {
        let request = Request::Open {
            method: Method::Get,
            flags: OpenFlags::TLS | OpenFlags::FOLLOW_REDIRECTS,
            url: "http://x",
            body_len_hint: 0,
        };

        let packet = request.to_packet().unwrap();
        assert_eq!(packet.command, Command::Open);
        assert_eq!(
            &packet.payload[..],
            &[
                0x01, 0x01, 0x03, 8, 0, b'h', b't', b't', b'p', b':', b'/', b'/', b'x', 0, 0, 0,
                0, 0, 0, 0, 0
            ]
        );

        let encoded = request.encode().unwrap();
        assert_eq!(encoded.len(), HEADER_SIZE + 21);
    }

    #[test]
    fn test_open_url_limits() {
        let long = "h".repeat(MAX_URL_LEN + 1);
        let request = Request::Open {
            method: Method::Get,
            flags: OpenFlags::empty(),
            url: &long,
            body_len_hint: 0,
        };
        assert!(matches!(request.encode(), Err(Error::UrlTooLong { len: 257, max: 256 })));

        let exact = "h".repeat(MAX_URL_LEN);
        let request = Request::Open {
            method: Method::Get,
            flags: OpenFlags::empty(),
            url: &exact,
            body_len_hint: 0,
        };
        assert!(request.encode().is_ok());
    }

    #[test]
    fn test_read_payload() {
        let packet = Request::Read {
            handle: 0x0102,
            offset: 0x0A0B0C0D,
            max_bytes: 512,
        }
        .to_packet()
        .unwrap();

        assert_eq!(
            &packet.payload[..],
            &[0x01, 0x02, 0x01, 0x0D, 0x0C, 0x0B, 0x0A, 0x00, 0x02]
        );
    }

    #[test]
    fn test_read_bounds() {
        let too_big = Request::Read {
            handle: 1,
            offset: 0,
            max_bytes: 513,
        };
        assert!(matches!(too_big.encode(), Err(Error::PayloadTooLarge { .. })));

        let zero = Request::Read {
            handle: 1,
            offset: 0,
            max_bytes: 0,
        };
        assert!(matches!(zero.encode(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_write_payload() {
        let packet = Request::Write {
            handle: 3,
            offset: 6,
            data: b"PING\r\n",
        }
        .to_packet()
        .unwrap();

        assert_eq!(&packet.payload[..9], &[0x01, 3, 0, 6, 0, 0, 0, 6, 0]);
        assert_eq!(&packet.payload[9..], b"PING\r\n");
    }

    #[test]
    fn test_zero_length_write_is_valid() {
        let packet = Request::Write {
            handle: 3,
            offset: 10,
            data: &[],
        }
        .to_packet()
        .unwrap();

        assert_eq!(packet.payload.len(), 9);
    }

    #[test]
    fn test_invalid_handle_rejected() {
        assert!(matches!(
            Request::Close { handle: 0 }.encode(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_clock_get_has_no_payload() {
        let encoded = Request::ClockGet.encode().unwrap();
        assert_eq!(encoded.len(), HEADER_SIZE);
        assert_eq!(encoded[0], 0x45);
        assert_eq!(encoded[1], 0x01);
    }

    #[test]
    fn test_clock_set_payload() {
        let packet = Request::ClockSet {
            time: ClockTime::from_unix(1_704_067_200),
        }
        .to_packet()
        .unwrap();

        let mut expected = vec![CLOCK_VERSION];
        expected.extend_from_slice(&1_704_067_200u64.to_le_bytes());
        assert_eq!(&packet.payload[..], &expected[..]);
    }

    #[test]
    fn test_clock_get_format_with_timezone() {
        let packet = Request::ClockGetFormat {
            format: TimeFormat::TzIso,
            timezone: Some("UTC0"),
        }
        .to_packet()
        .unwrap();

        assert_eq!(&packet.payload[..], &[CLOCK_VERSION, 0x03, 4, b'U', b'T', b'C', b'0']);

        let plain = Request::ClockGetFormat {
            format: TimeFormat::Simple,
            timezone: None,
        }
        .to_packet()
        .unwrap();
        assert_eq!(&plain.payload[..], &[CLOCK_VERSION, 0x00, 0]);
    }

    #[test]
    fn test_set_timezone_commands() {
        let runtime = Request::ClockSetTimezone {
            timezone: "CET-1CEST,M3.5.0,M10.5.0/3",
            persist: false,
        };
        let saved = Request::ClockSetTimezone {
            timezone: "CET-1CEST,M3.5.0,M10.5.0/3",
            persist: true,
        };

        assert_eq!(runtime.command(), Command::ClockSetTimezone);
        assert_eq!(saved.command(), Command::ClockSetTimezoneSave);
        assert_eq!(runtime.to_packet().unwrap().payload, saved.to_packet().unwrap().payload);
    }

    #[test]
    fn test_timezone_limits() {
        let long = "X".repeat(MAX_TIMEZONE_LEN + 1);
        let request = Request::ClockSetTimezone {
            timezone: &long,
            persist: false,
        };
        assert!(matches!(request.encode(), Err(Error::InvalidArgument(_))));
    }
}
