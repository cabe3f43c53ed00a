//! TCP echo example
//!
//! Opens a raw TCP session through the device, sends one line and prints
//! the reply.

use std::time::Duration;

use anyhow::Context;
use fujinet::Device;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let host = std::env::var("FN_TCP_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port: u16 = std::env::var("FN_TCP_PORT")
        .unwrap_or_else(|_| "7777".to_string())
        .parse()
        .context("FN_TCP_PORT is not a port number")?;

    let mut device = Device::from_env();
    device.init().await?;

    let handle = device.tcp_open(&host, port).await?;
    println!("Opened tcp://{}:{} (handle {})", host, port, handle);

    let written = device.write(handle, 0, b"PING\r\n").await?;
    println!("Sent {} bytes", written);

    let mut buf = [0u8; 512];
    for _ in 0..50 {
        match device.read(handle, 0, &mut buf).await {
            Ok(outcome) => {
                print!("{}", String::from_utf8_lossy(&buf[..outcome.bytes_read]));
                if outcome.bytes_read > 0 || outcome.is_eof() {
                    break;
                }
            }
            Err(e) if e.is_not_ready() => tokio::time::sleep(Duration::from_millis(50)).await,
            Err(e) => return Err(e.into()),
        }
    }

    device.close(handle).await?;
    device.shutdown().await?;

    Ok(())
}
