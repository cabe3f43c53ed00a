//! Clock service walkthrough

use fujinet::{Device, TimeFormat};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> fujinet::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut device = Device::from_env();
    device.init().await?;

    let now = device.clock_get().await?;
    println!("Device time: {} ({} s)", now, now.unix_seconds());

    let tz = device.clock_get_timezone().await?;
    println!("Timezone:    {}", tz);

    for format in [TimeFormat::TzIso, TimeFormat::UtcIso] {
        let time = device.clock_get_format(format).await?;
        println!("{:?}: {}", format, time.as_str().unwrap_or("<binary>"));
    }

    let prodos = device.clock_get_format_tz(TimeFormat::ProDos, "UTC0").await?;
    println!("ProDOS (UTC): {:02X?}", prodos.data);

    let synced = device.clock_sync_network_time().await?;
    println!("After sync:  {}", synced);

    device.shutdown().await?;
    Ok(())
}
