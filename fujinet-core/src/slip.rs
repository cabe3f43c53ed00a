//! SLIP framing (RFC 1055 style)
//!
//! The serial link has no message boundaries, so every FujiBus frame is
//! wrapped in END bytes and any END/ESC bytes inside it are escaped:
//!
//! ```text
//! 0xC0 -> 0xDB 0xDC
//! 0xDB -> 0xDB 0xDD
//! ```

use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::error::{Error, Result};

/// Frame delimiter
pub const END: u8 = 0xC0;

/// Escape prefix
pub const ESC: u8 = 0xDB;

/// Escaped END
pub const ESC_END: u8 = 0xDC;

/// Escaped ESC
pub const ESC_ESC: u8 = 0xDD;

/// Worst-case encoded size: every byte escaped plus two delimiters
pub const fn max_encoded_len(len: usize) -> usize {
    len * 2 + 2
}

/// Wrap `frame` in END delimiters, escaping END/ESC bytes in between
///
/// # Examples
///
/// ```
/// use fujinet_core::slip;
///
/// let encoded = slip::encode(&[0x01, 0xC0, 0x02]);
/// assert_eq!(&encoded[..], &[0xC0, 0x01, 0xDB, 0xDC, 0x02, 0xC0]);
/// ```
pub fn encode(frame: &[u8]) -> BytesMut {
    let mut out = BytesMut::with_capacity(max_encoded_len(frame.len()));

    out.put_u8(END);
    for &b in frame {
        match b {
            END => out.put_slice(&[ESC, ESC_END]),
            ESC => out.put_slice(&[ESC, ESC_ESC]),
            _ => out.put_u8(b),
        }
    }
    out.put_u8(END);

    out
}

/// Strip SLIP framing from `input`
///
/// A single leading END is skipped; decoding stops at the next unescaped END
/// (or the end of input). Anything after that END is ignored.
///
/// # Errors
///
/// - [`Error::DanglingEscape`] if the input ends right after an ESC
/// - [`Error::InvalidEscape`] if ESC is followed by anything but ESC_END/ESC_ESC
pub fn decode(input: &[u8]) -> Result<BytesMut> {
    let mut out = BytesMut::with_capacity(input.len());

    let body = match input.first() {
        Some(&END) => &input[1..],
        _ => input,
    };

    let mut bytes = body.iter();
    while let Some(&b) = bytes.next() {
        match b {
            END => break,
            ESC => match bytes.next() {
                Some(&ESC_END) => out.put_u8(END),
                Some(&ESC_ESC) => out.put_u8(ESC),
                Some(&other) => return Err(Error::InvalidEscape(other)),
                None => return Err(Error::DanglingEscape),
            },
            _ => out.put_u8(b),
        }
    }

    Ok(out)
}

/// Collects raw link bytes until one complete delimited frame is present
///
/// Bytes before the first END are line noise and dropped. Back-to-back END
/// bytes (empty frames) collapse into one, so a frame is complete once an
/// END follows at least one non-END byte.
#[derive(Debug)]
pub struct FrameAccumulator {
    buf: BytesMut,
    max_len: usize,
}

impl FrameAccumulator {
    /// `max_frame` is the largest decoded frame expected; the raw buffer is
    /// bounded by its worst-case encoded size.
    pub fn new(max_frame: usize) -> Self {
        let max_len = max_encoded_len(max_frame);
        Self {
            buf: BytesMut::with_capacity(max_len),
            max_len,
        }
    }

    /// Append a chunk read from the link
    ///
    /// Returns the delimited frame (`END .. END`, still escaped) once it is
    /// complete. Bytes following the closing END are discarded: the link is
    /// half-duplex, so nothing else may be in flight.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Option<BytesMut>> {
        for &b in chunk {
            if self.buf.is_empty() {
                if b == END {
                    self.buf.put_u8(END);
                } else {
                    trace!("Dropping noise byte 0x{:02X} before frame start", b);
                }
                continue;
            }

            if b == END {
                if self.buf.len() == 1 {
                    // Empty frame, keep the single opening END
                    continue;
                }
                self.buf.put_u8(END);
                let frame = self.buf.split();
                return Ok(Some(frame));
            }

            if self.buf.len() + 1 >= self.max_len {
                return Err(Error::FrameTooLarge {
                    size: self.buf.len() + 1,
                    max: self.max_len,
                });
            }
            self.buf.put_u8(b);
        }

        Ok(None)
    }

    /// Raw bytes buffered for an incomplete frame
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
