//! Posts a media URL to a running server's `/info` and prints the catalog.
//!
//! Usage: info-probe [media-url] [server-base-url]

use anyhow::{bail, Context, Result};
use media_downloader_lib::downloader::models::InfoResponse;

const DEFAULT_SERVER: &str = "http://localhost:5000";

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let media_url = args.next().context("usage: info-probe <media-url> [server-base-url]")?;
    let server = args.next().unwrap_or_else(|| DEFAULT_SERVER.to_string());

    let response = reqwest::Client::new()
        .post(format!("{}/info", server.trim_end_matches('/')))
        .json(&serde_json::json!({ "url": media_url }))
        .send()
        .await
        .with_context(|| format!("connecting to {}", server))?;

    if !response.status().is_success() {
        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        bail!("{}: {}", status, body["error"].as_str().unwrap_or("no error message"));
    }

    let info: InfoResponse = response.json().await.context("decoding /info response")?;

    println!("Title: {}", info.title.as_deref().unwrap_or("Unknown"));
    println!("Uploader: {}", info.uploader.as_deref().unwrap_or("Unknown"));
    println!("Total formats found: {}", info.formats.len());
    println!();
    for (i, fmt) in info.formats.iter().enumerate() {
        println!(
            "{}. ID: {}, Res: {}, Ext: {}, Note: {}",
            i + 1,
            fmt.format_id,
            fmt.resolution,
            fmt.ext,
            fmt.format_note
        );
    }

    Ok(())
}
