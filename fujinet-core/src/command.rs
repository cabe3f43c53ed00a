//! FujiBus device ids and command definitions

use std::fmt;

use crate::error::{Error, Result};

/// Wire device identifiers
///
/// Each service on the companion device answers to its own id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DeviceId {
    /// Clock service
    Clock = 0x45,
    /// FujiNet configuration device
    Fuji = 0x70,
    /// Disk service
    Disk = 0xFC,
    /// Network service (HTTP/TCP sessions)
    Network = 0xFD,
    /// File service
    File = 0xFE,
}

impl DeviceId {
    pub fn name(self) -> &'static str {
        match self {
            Self::Clock => "CLOCK",
            Self::Fuji => "FUJI",
            Self::Disk => "DISK",
            Self::Network => "NETWORK",
            Self::File => "FILE",
        }
    }
}

impl From<DeviceId> for u8 {
    fn from(id: DeviceId) -> u8 {
        id as u8
    }
}

impl TryFrom<u8> for DeviceId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x45 => Ok(Self::Clock),
            0x70 => Ok(Self::Fuji),
            0xFC => Ok(Self::Disk),
            0xFD => Ok(Self::Network),
            0xFE => Ok(Self::File),
            _ => Err(Error::UnknownDevice(value)),
        }
    }
}

/// Protocol commands this library issues
///
/// Command codes are only unique per device, so a command always travels
/// with its [`DeviceId`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    // Network service
    Open,
    Read,
    Write,
    Close,
    Info,

    // Clock service
    ClockGet,
    ClockSet,
    ClockGetFormat,
    ClockGetTimezone,
    ClockSetTimezone,
    ClockSetTimezoneSave,
    ClockSyncNetworkTime,
}

impl Command {
    /// Device that handles this command
    pub fn device(self) -> DeviceId {
        match self {
            Self::Open | Self::Read | Self::Write | Self::Close | Self::Info => DeviceId::Network,
            _ => DeviceId::Clock,
        }
    }

    /// Command byte on the wire
    pub fn code(self) -> u8 {
        match self {
            Self::Open => 0x01,
            Self::Read => 0x02,
            Self::Write => 0x03,
            Self::Close => 0x04,
            Self::Info => 0x05,
            Self::ClockGet => 0x01,
            Self::ClockSet => 0x02,
            Self::ClockGetFormat => 0x03,
            Self::ClockGetTimezone => 0x04,
            Self::ClockSetTimezone => 0x05,
            Self::ClockSetTimezoneSave => 0x06,
            Self::ClockSyncNetworkTime => 0x07,
        }
    }

    /// Resolve a `(device, command)` pair read off the wire
    pub fn from_wire(device: u8, command: u8) -> Result<Self> {
        let unknown = || Error::UnknownCommand { device, command };

        match DeviceId::try_from(device)? {
            DeviceId::Network => match command {
                0x01 => Ok(Self::Open),
                0x02 => Ok(Self::Read),
                0x03 => Ok(Self::Write),
                0x04 => Ok(Self::Close),
                0x05 => Ok(Self::Info),
                _ => Err(unknown()),
            },
            DeviceId::Clock => match command {
                0x01 => Ok(Self::ClockGet),
                0x02 => Ok(Self::ClockSet),
                0x03 => Ok(Self::ClockGetFormat),
                0x04 => Ok(Self::ClockGetTimezone),
                0x05 => Ok(Self::ClockSetTimezone),
                0x06 => Ok(Self::ClockSetTimezoneSave),
                0x07 => Ok(Self::ClockSyncNetworkTime),
                _ => Err(unknown()),
            },
            DeviceId::Fuji | DeviceId::Disk | DeviceId::File => Err(unknown()),
        }
    }

    /// Get command name
    pub fn name(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::Close => "CLOSE",
            Self::Info => "INFO",
            Self::ClockGet => "CLOCK_GET",
            Self::ClockSet => "CLOCK_SET",
            Self::ClockGetFormat => "CLOCK_GET_FORMAT",
            Self::ClockGetTimezone => "CLOCK_GET_TZ",
            Self::ClockSetTimezone => "CLOCK_SET_TZ",
            Self::ClockSetTimezoneSave => "CLOCK_SET_TZ_SAVE",
            Self::ClockSyncNetworkTime => "CLOCK_SYNC",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}:0x{:02X})", self.name(), self.device().name(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_conversion() {
        assert_eq!(Command::Info.code(), 5);
        assert_eq!(Command::Info.device(), DeviceId::Network);
        assert_eq!(Command::from_wire(0xFD, 0x02).unwrap(), Command::Read);
        assert_eq!(Command::from_wire(0x45, 0x02).unwrap(), Command::ClockSet);
    }

    #[test]
    fn test_codes_are_per_device() {
        assert_eq!(Command::Open.code(), Command::ClockGet.code());
        assert_ne!(Command::Open.device(), Command::ClockGet.device());
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(
            Command::from_wire(0xFD, 0x99),
            Err(Error::UnknownCommand { device: 0xFD, command: 0x99 })
        ));
        assert!(matches!(Command::from_wire(0x12, 0x01), Err(Error::UnknownDevice(0x12))));
    }

    #[test]
    fn test_command_display() {
        assert_eq!(Command::Write.to_string(), "WRITE(NETWORK:0x03)");
    }
}
