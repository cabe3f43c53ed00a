//! FujiBus frame structure and encoding/decoding

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    checksum,
    command::Command,
    constants::MAX_PACKET_SIZE,
    error::{Error, Result},
    status::Status,
};

/// Frame header size, including the first descriptor byte
pub const HEADER_SIZE: usize = 6;

/// Offset of the total length field
pub const LENGTH_OFFSET: usize = 2;

/// Offset of the checksum byte
pub const CHECKSUM_OFFSET: usize = 4;

/// Offset of the first descriptor byte
pub const DESCRIPTOR_OFFSET: usize = 5;

/// Descriptor bit: another descriptor byte follows
const MORE_DESCRIPTORS: u8 = 0x80;

/// Descriptor bits that must be zero
const RESERVED_BITS: u8 = 0x78;

/// Descriptor code -> (field width in bytes, field count)
const DESCRIPTOR_TABLE: [(usize, usize); 8] = [
    (0, 0),
    (1, 1),
    (1, 2),
    (1, 3),
    (1, 4),
    (2, 1),
    (2, 2),
    (4, 1),
];

/// Look up the `(width, count)` pair for a 3-bit descriptor code
pub fn descriptor_layout(code: u8) -> (usize, usize) {
    DESCRIPTOR_TABLE[(code & 0x07) as usize]
}

/// Descriptor code for `count` fields of `width` bytes, if the table has one
fn descriptor_code(width: usize, count: usize) -> Option<u8> {
    DESCRIPTOR_TABLE
        .iter()
        .position(|&(w, c)| w == width && c == count)
        .map(|code| code as u8)
}

/// Fixed-width field selected by the descriptor
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Field {
    U8(u8),
    U16(u16),
    U32(u32),
}

impl Field {
    pub fn width(self) -> usize {
        match self {
            Self::U8(_) => 1,
            Self::U16(_) => 2,
            Self::U32(_) => 4,
        }
    }

    pub fn value(self) -> u32 {
        match self {
            Self::U8(v) => v as u32,
            Self::U16(v) => v as u32,
            Self::U32(v) => v,
        }
    }

    fn put(self, buf: &mut BytesMut) {
        match self {
            Self::U8(v) => buf.put_u8(v),
            Self::U16(v) => buf.put_u16_le(v),
            Self::U32(v) => buf.put_u32_le(v),
        }
    }

    fn read(width: usize, bytes: &[u8]) -> Self {
        match width {
            1 => Self::U8(bytes[0]),
            2 => Self::U16(u16::from_le_bytes([bytes[0], bytes[1]])),
            _ => Self::U32(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        }
    }
}

/// FujiBus frame
///
/// # Frame Structure
///
/// ```text
/// ┌──────────┬──────────┬─────────────┬──────────┬────────────┬──────────────┬─────────┐
/// │ DeviceId │ Command  │ Total length│ Checksum │ Descriptor │ Fields       │ Payload │
/// │ 1 byte   │ 1 byte   │ 2 bytes (LE)│ 1 byte   │ 1+ bytes   │ per table    │ N bytes │
/// └──────────┴──────────┴─────────────┴──────────┴────────────┴──────────────┴─────────┘
/// ```
///
/// The descriptor's low three bits pick a `(width, count)` entry from the
/// descriptor table; bit 7 chains another descriptor byte. All descriptor
/// bytes come first, then the fields they describe, then the payload.
///
/// # Examples
///
/// ```
/// use fujinet_core::{Command, Packet};
///
/// let packet = Packet::with_payload(Command::Close, vec![0x01, 0x02, 0x00]);
/// let encoded = packet.encode().unwrap();
///
/// let decoded = Packet::decode(encoded).unwrap();
/// assert_eq!(packet, decoded);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    /// Command (carries the device id)
    pub command: Command,

    /// Descriptor-selected fields; on responses the first one is the status
    pub fields: Vec<Field>,

    /// Opaque payload
    pub payload: Bytes,
}

impl Packet {
    /// Create a packet with no fields and no payload
    pub fn new(command: Command) -> Self {
        Self {
            command,
            fields: Vec::new(),
            payload: Bytes::new(),
        }
    }

    /// Create a request-style packet (no fields) with payload
    pub fn with_payload(command: Command, payload: impl Into<Bytes>) -> Self {
        Self {
            command,
            fields: Vec::new(),
            payload: payload.into(),
        }
    }

    /// Create a response-style packet whose first field is `status`
    pub fn with_status(command: Command, status: Status, payload: impl Into<Bytes>) -> Self {
        Self {
            command,
            fields: vec![Field::U8(status.into())],
            payload: payload.into(),
        }
    }

    /// Status carried by the first described field; `Ok` when there is none
    ///
    /// A first field wider than a byte holding a value above 0xFF is not a
    /// status the device can send. [`Packet::decode`] rejects such frames; a
    /// locally built one reads as `Unknown(0xFF)`.
    pub fn status(&self) -> Status {
        self.fields
            .first()
            .map(|field| {
                u8::try_from(field.value()).map_or(Status::Unknown(u8::MAX), Status::from)
            })
            .unwrap_or_default()
    }

    /// Descriptor bytes for `fields`
    ///
    /// Consecutive fields of equal width are packed into as few descriptors
    /// as the table allows.
    fn descriptors(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut i = 0;

        while i < self.fields.len() {
            let width = self.fields[i].width();
            let max_count = match width {
                1 => 4,
                2 => 2,
                _ => 1,
            };

            let mut count = 1;
            while count < max_count
                && i + count < self.fields.len()
                && self.fields[i + count].width() == width
            {
                count += 1;
            }

            // Every (width, 1..=max_count) pair exists in the table
            if let Some(code) = descriptor_code(width, count) {
                out.push(code);
            }
            i += count;
        }

        if out.is_empty() {
            out.push(0);
        }

        let last = out.len() - 1;
        for d in &mut out[..last] {
            *d |= MORE_DESCRIPTORS;
        }

        out
    }

    /// Total encoded size
    pub fn size(&self) -> usize {
        let fields: usize = self.fields.iter().map(|f| f.width()).sum();
        HEADER_SIZE - 1 + self.descriptors().len() + fields + self.payload.len()
    }

    /// Encode packet to bytes
    ///
    /// Writes the header with a zero checksum, appends fields and payload,
    /// then patches the checksum computed over the whole frame.
    ///
    /// # Errors
    ///
    /// [`Error::PayloadTooLarge`] if the frame would exceed
    /// [`MAX_PACKET_SIZE`].
    pub fn encode(&self) -> Result<BytesMut> {
        let total_size = self.size();
        if total_size > MAX_PACKET_SIZE {
            return Err(Error::PayloadTooLarge {
                size: total_size,
                max: MAX_PACKET_SIZE,
            });
        }

        let mut buf = BytesMut::with_capacity(total_size);

        buf.put_u8(self.command.device().into());
        buf.put_u8(self.command.code());
        buf.put_u16_le(total_size as u16);
        buf.put_u8(0); // Checksum placeholder
        buf.put_slice(&self.descriptors());

        for field in &self.fields {
            field.put(&mut buf);
        }

        buf.put_slice(&self.payload);

        buf[CHECKSUM_OFFSET] = checksum::frame_checksum(&buf);

        Ok(buf)
    }

    /// Decode packet from a complete (un-SLIPped) frame
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Buffer is shorter than the header
    /// - Declared total length differs from the buffer length
    /// - Checksum verification fails
    /// - Device id / command is unknown
    /// - Descriptors use reserved bits or describe more bytes than present
    pub fn decode(buf: BytesMut) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::PacketTooShort {
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let declared = u16::from_le_bytes([buf[LENGTH_OFFSET], buf[LENGTH_OFFSET + 1]]) as usize;
        if declared != buf.len() {
            return Err(Error::LengthMismatch {
                declared,
                actual: buf.len(),
            });
        }

        let received = buf[CHECKSUM_OFFSET];
        let expected = checksum::frame_checksum(&buf);
        if expected != received {
            return Err(Error::ChecksumMismatch { expected, received });
        }

        let command = Command::from_wire(buf[0], buf[1])?;

        // Descriptor chain
        let mut layouts = Vec::new();
        let mut pos = DESCRIPTOR_OFFSET;
        loop {
            let descriptor = *buf.get(pos).ok_or_else(|| Error::PacketTooShort {
                expected: pos + 1,
                actual: buf.len(),
            })?;
            pos += 1;

            if descriptor & RESERVED_BITS != 0 {
                return Err(Error::InvalidFrame(format!(
                    "reserved descriptor bits set: 0x{descriptor:02X}"
                )));
            }

            layouts.push(descriptor_layout(descriptor));

            if descriptor & MORE_DESCRIPTORS == 0 {
                break;
            }
        }

        // Described fields
        let mut fields = Vec::new();
        for (width, count) in layouts {
            for _ in 0..count {
                let end = pos + width;
                if end > buf.len() {
                    return Err(Error::PacketTooShort {
                        expected: end,
                        actual: buf.len(),
                    });
                }
                fields.push(Field::read(width, &buf[pos..end]));
                pos = end;
            }
        }

        if let Some(field) = fields.first() {
            if field.value() > u8::MAX as u32 {
                return Err(Error::InvalidFrame(format!(
                    "status field out of range: 0x{:X}",
                    field.value()
                )));
            }
        }

        let payload = buf.freeze().slice(pos..);

        Ok(Self {
            command,
            fields,
            payload,
        })
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("command", &self.command)
            .field("fields", &self.fields)
            .field("status", &self.status())
            .field("payload_len", &self.payload.len())
            .field("payload", &hex::encode(&self.payload[..self.payload.len().min(32)]))
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Packet[{}](fields={}, len={})",
            self.command,
            self.fields.len(),
            self.payload.len()
        )
    }
}
