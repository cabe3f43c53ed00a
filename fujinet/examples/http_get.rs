//! HTTP GET example

use std::time::Duration;

use fujinet::{Device, Method, OpenFlags};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let url = std::env::var("FN_HTTP_URL")
        .or_else(|_| std::env::var("FN_TEST_URL"))
        .unwrap_or_else(|_| "https://example.com/".to_string());

    let mut device = Device::from_env().with_timeout(Duration::from_secs(10));
    device.init().await?;

    let mut flags = OpenFlags::FOLLOW_REDIRECTS;
    if url.starts_with("https://") {
        flags |= OpenFlags::TLS;
    }

    let handle = device.open(Method::Get, &url, flags).await?;

    // Headers arrive before the body
    let info = loop {
        match device.info(handle).await {
            Ok(info) => break info,
            Err(e) if e.is_not_ready() => tokio::time::sleep(Duration::from_millis(50)).await,
            Err(e) => return Err(e.into()),
        }
    };
    println!("GET {} -> {}", url, info);

    let mut buf = [0u8; 512];
    let mut offset = 0u32;
    loop {
        match device.read(handle, offset, &mut buf).await {
            Ok(outcome) => {
                print!("{}", String::from_utf8_lossy(&buf[..outcome.bytes_read]));
                offset += outcome.bytes_read as u32;
                if outcome.is_eof() {
                    break;
                }
            }
            Err(e) if e.is_not_ready() => tokio::time::sleep(Duration::from_millis(20)).await,
            Err(e) => return Err(e.into()),
        }
    }
    println!("\n({} bytes)", offset);

    device.close(handle).await?;
    device.shutdown().await?;

    Ok(())
}
