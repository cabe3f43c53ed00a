//! Clock service operations

use tracing::debug;

use fujinet_core::Request;
use fujinet_core::Response;
use fujinet_types::{ClockTime, FormattedTime, TimeFormat};

use crate::device::{protocol, unexpected, Device};
use crate::error::Result;

impl Device {
    /// Current device time
    pub async fn clock_get(&mut self) -> Result<ClockTime> {
        self.clock_time(&Request::ClockGet).await
    }

    /// Set the device clock; returns the time the device now reports
    pub async fn clock_set(&mut self, time: ClockTime) -> Result<ClockTime> {
        self.clock_time(&Request::ClockSet { time }).await
    }

    /// Ask the device to sync from network time, returning the new time
    pub async fn clock_sync_network_time(&mut self) -> Result<ClockTime> {
        let time = self.clock_time(&Request::ClockSyncNetworkTime).await?;
        debug!(%time, "Clock synced");
        Ok(time)
    }

    /// Current time rendered in `format` using the device timezone
    pub async fn clock_get_format(&mut self, format: TimeFormat) -> Result<FormattedTime> {
        self.formatted_time(format, None).await
    }

    /// Current time rendered in `format` for `timezone` (POSIX TZ string),
    /// without changing the device timezone
    pub async fn clock_get_format_tz(
        &mut self,
        format: TimeFormat,
        timezone: &str,
    ) -> Result<FormattedTime> {
        self.formatted_time(format, Some(timezone)).await
    }

    pub async fn clock_get_timezone(&mut self) -> Result<String> {
        match self.call(&Request::ClockGetTimezone).await? {
            Response::Timezone(tz) => Ok(tz),
            other => Err(unexpected(other)),
        }
    }

    /// Set the timezone until the device restarts
    pub async fn clock_set_timezone(&mut self, timezone: &str) -> Result<()> {
        self.set_timezone(timezone, false).await
    }

    /// Set the timezone and save it to the device configuration
    pub async fn clock_set_timezone_save(&mut self, timezone: &str) -> Result<()> {
        self.set_timezone(timezone, true).await
    }

    async fn clock_time(&mut self, request: &Request<'_>) -> Result<ClockTime> {
        match self.call(request).await? {
            Response::Time(time) => Ok(time),
            other => Err(unexpected(other)),
        }
    }

    async fn formatted_time(
        &mut self,
        format: TimeFormat,
        timezone: Option<&str>,
    ) -> Result<FormattedTime> {
        let request = Request::ClockGetFormat { format, timezone };

        let time = match self.call(&request).await? {
            Response::FormattedTime(time) => time,
            other => return Err(unexpected(other)),
        };

        if time.format != format {
            return Err(protocol(format!(
                "asked for {:?} time, device sent {:?}",
                format, time.format
            )));
        }
        Ok(time)
    }

    async fn set_timezone(&mut self, timezone: &str, persist: bool) -> Result<()> {
        match self
            .call(&Request::ClockSetTimezone { timezone, persist })
            .await?
        {
            Response::TimezoneSet => {
                debug!(timezone, persist, "Timezone set");
                Ok(())
            }
            other => Err(unexpected(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockScript, MockTransport};
    use fujinet_core::{Command, ErrorKind, Packet, Status};
    use pretty_assertions::assert_eq;

    const VERSION: u8 = 0x01;

    async fn ready_device() -> (Device, MockScript) {
        let (transport, script) = MockTransport::new();
        let mut device = Device::new(transport);
        device.init().await.unwrap();
        (device, script)
    }

    fn time_reply(command: Command, seconds: u64) -> Packet {
        let mut payload = vec![VERSION, 0, 0, 0];
        payload.extend_from_slice(&seconds.to_le_bytes());
        Packet::with_status(command, Status::Ok, payload)
    }

    #[tokio::test]
    async fn test_clock_get() {
        let (mut device, script) = ready_device().await;
        script.reply(time_reply(Command::ClockGet, 1_704_067_200));

        let time = device.clock_get().await.unwrap();
        assert_eq!(time.unix_seconds(), 1_704_067_200);
        assert_eq!(time.to_string(), "2024-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn test_clock_set_sends_seconds() {
        let (mut device, script) = ready_device().await;
        script.reply(time_reply(Command::ClockSet, 1_000));

        device.clock_set(ClockTime::from_unix(1_000)).await.unwrap();

        let request = &script.requests()[0];
        assert_eq!(request.command, Command::ClockSet);
        assert_eq!(&request.payload[1..], &1_000u64.to_le_bytes());
    }

    #[tokio::test]
    async fn test_clock_sync() {
        let (mut device, script) = ready_device().await;
        script.reply(time_reply(Command::ClockSyncNetworkTime, 42));
        assert_eq!(device.clock_sync_network_time().await.unwrap(), ClockTime::from_unix(42));
    }

    #[tokio::test]
    async fn test_clock_get_format() {
        let (mut device, script) = ready_device().await;

        let iso = b"2024-01-01T00:00:00+0000";
        let mut payload = vec![VERSION, 0, 0, 0, TimeFormat::UtcIso.into(), iso.len() as u8];
        payload.extend_from_slice(iso);
        script.reply(Packet::with_status(Command::ClockGetFormat, Status::Ok, payload));

        let time = device.clock_get_format(TimeFormat::UtcIso).await.unwrap();
        assert_eq!(time.as_str(), Some("2024-01-01T00:00:00+0000"));
    }

    #[tokio::test]
    async fn test_clock_get_format_tz_sends_timezone() {
        let (mut device, script) = ready_device().await;

        let mut payload = vec![VERSION, 0, 0, 0, TimeFormat::ProDos.into(), 4];
        payload.extend_from_slice(&[1, 2, 3, 4]);
        script.reply(Packet::with_status(Command::ClockGetFormat, Status::Ok, payload));

        device
            .clock_get_format_tz(TimeFormat::ProDos, "UTC0")
            .await
            .unwrap();

        let request = &script.requests()[0];
        assert_eq!(&request.payload[..], &[VERSION, 0x01, 4, b'U', b'T', b'C', b'0']);
    }

    #[tokio::test]
    async fn test_clock_get_format_wrong_format() {
        let (mut device, script) = ready_device().await;

        let mut payload = vec![VERSION, 0, 0, 0, TimeFormat::ProDos.into(), 4];
        payload.extend_from_slice(&[1, 2, 3, 4]);
        script.reply(Packet::with_status(Command::ClockGetFormat, Status::Ok, payload));

        let err = device.clock_get_format(TimeFormat::Simple).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn test_timezone_round_trip() {
        let (mut device, script) = ready_device().await;
        script.reply(Packet::with_status(Command::ClockSetTimezoneSave, Status::Ok, vec![]));

        let tz = b"CET-1CEST,M3.5.0,M10.5.0/3";
        let mut payload = vec![VERSION, 0, 0, 0, tz.len() as u8];
        payload.extend_from_slice(tz);
        script.reply(Packet::with_status(Command::ClockGetTimezone, Status::Ok, payload));

        device.clock_set_timezone_save("CET-1CEST,M3.5.0,M10.5.0/3").await.unwrap();
        assert_eq!(device.clock_get_timezone().await.unwrap(), "CET-1CEST,M3.5.0,M10.5.0/3");

        assert_eq!(script.requests()[0].command, Command::ClockSetTimezoneSave);
    }

    #[tokio::test]
    async fn test_set_timezone_rejects_empty() {
        let (mut device, script) = ready_device().await;

        let err = device.clock_set_timezone("").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert_eq!(script.exchanges(), 0);
    }

    #[tokio::test]
    async fn test_clock_status_error() {
        let (mut device, script) = ready_device().await;
        script.reply(Packet::with_status(Command::ClockGet, Status::Internal, vec![]));

        let err = device.clock_get().await.unwrap_err();
        assert_eq!(err.status(), Some(Status::Internal));
    }
}
