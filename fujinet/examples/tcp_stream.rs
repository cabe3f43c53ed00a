//! TCP streaming example
//!
//! Reads a TCP stream until the peer closes it or nothing has arrived for
//! the idle budget.

use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use fujinet::Device;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

const IDLE_BUDGET: Duration = Duration::from_secs(10);

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

    // Nothing more to send
    if !device.half_close(handle).await? {
        println!("(half-close not supported, continuing)");
    }

    let mut buf = [0u8; 512];
    let mut offset = 0u32;
    let mut last_data = Instant::now();
    let mut stdout = std::io::stdout();

    loop {
        match device.read(handle, offset, &mut buf).await {
            Ok(outcome) => {
                if outcome.bytes_read > 0 {
                    stdout.write_all(&buf[..outcome.bytes_read])?;
                    offset += outcome.bytes_read as u32;
                    last_data = Instant::now();
                }
                if outcome.is_eof() {
                    break;
                }
            }
            Err(e) if e.is_not_ready() => {
                if last_data.elapsed() > IDLE_BUDGET {
                    println!("\nIdle for {:?}, giving up", IDLE_BUDGET);
                    break;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let info = device.info(handle).await?;
    println!("\n{} bytes received, {}", offset, info);

    device.close(handle).await?;
    device.shutdown().await?;

    Ok(())
}
