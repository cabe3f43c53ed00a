//! Clock values

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Seconds since the Unix epoch, as kept by the device clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ClockTime(pub u64);

impl ClockTime {
    pub fn from_unix(seconds: u64) -> Self {
        Self(seconds)
    }

    pub fn unix_seconds(self) -> u64 {
        self.0
    }

    /// Convert to a UTC date-time. `None` if the value is outside chrono's range.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.0).ok()?;
        DateTime::from_timestamp(secs, 0)
    }

    /// Build from a UTC date-time. `None` for instants before the epoch.
    pub fn from_datetime(dt: DateTime<Utc>) -> Option<Self> {
        u64::try_from(dt.timestamp()).ok().map(Self)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            None => write!(f, "@{}", self.0),
        }
    }
}

/// Time layouts the device can render on our behalf
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TimeFormat {
    /// `[century, year, month, day, hour, min, sec]`
    Simple = 0x00,
    /// Apple ProDOS date/time words
    ProDos = 0x01,
    /// `[day, month, year, hour, min, sec]`
    ApeTime = 0x02,
    /// `YYYY-MM-DDTHH:MM:SS+HHMM` in the device (or requested) timezone
    TzIso = 0x03,
    /// `YYYY-MM-DDTHH:MM:SS+0000`
    UtcIso = 0x04,
    /// `YYYYMMDD0HHMMSS000`
    Apple3Sos = 0x05,
}

impl TimeFormat {
    /// Exact size of the rendered value
    pub fn data_len(self) -> usize {
        match self {
            Self::Simple => 7,
            Self::ProDos => 4,
            Self::ApeTime => 6,
            Self::TzIso | Self::UtcIso => 24,
            Self::Apple3Sos => 16,
        }
    }

    /// Rendered as printable text rather than binary fields
    pub fn is_text(self) -> bool {
        matches!(self, Self::TzIso | Self::UtcIso | Self::Apple3Sos)
    }
}

impl From<TimeFormat> for u8 {
    fn from(format: TimeFormat) -> u8 {
        format as u8
    }
}

impl TryFrom<u8> for TimeFormat {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(Self::Simple),
            0x01 => Ok(Self::ProDos),
            0x02 => Ok(Self::ApeTime),
            0x03 => Ok(Self::TzIso),
            0x04 => Ok(Self::UtcIso),
            0x05 => Ok(Self::Apple3Sos),
            _ => Err(Error::Parse(format!("unknown time format 0x{value:02X}"))),
        }
    }
}

/// Time value rendered by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedTime {
    pub format: TimeFormat,
    pub data: Vec<u8>,
}

impl FormattedTime {
    /// Validates that `data` has the size `format` prescribes
    pub fn new(format: TimeFormat, data: Vec<u8>) -> Result<Self> {
        if data.len() != format.data_len() {
            return Err(Error::Validation(format!(
                "{:?} time must be {} bytes, got {}",
                format,
                format.data_len(),
                data.len()
            )));
        }
        Ok(Self { format, data })
    }

    /// Text view for the string formats
    pub fn as_str(&self) -> Option<&str> {
        if !self.format.is_text() {
            return None;
        }
        std::str::from_utf8(&self.data).ok()
    }
}
