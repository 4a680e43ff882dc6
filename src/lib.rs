pub mod config;
pub mod downloader;
pub mod server;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use downloader::backends::YtDlpCli;
use downloader::tools::{ToolManager, ToolType};
use downloader::{DownloadConfig, Downloader};
use server::AppState;

/// Log to stderr; `RUST_LOG` overrides the default `info` level
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let tools = ToolManager::new(config.ytdlp_path.clone(), config.ffmpeg_path.clone());
    let probed = tools.log_environment();
    let ffmpeg_location = probed
        .iter()
        .find(|t| t.tool_type == ToolType::Ffmpeg && t.is_available)
        .and_then(|t| t.path.clone());

    let engine = Arc::new(YtDlpCli::new(
        tools.command_for(ToolType::YtDlp),
        config.extract_timeout,
    ));
    let download_config = DownloadConfig::standard(
        config.output_dir.to_string_lossy().to_string(),
        ffmpeg_location,
    );

    let state = AppState {
        extractor: engine.clone(),
        downloader: Arc::new(Downloader::new(engine, download_config)),
        catalog: Arc::new(config.catalog.clone()),
        tools: Arc::new(tools),
    };

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    tracing::info!(
        "[Server] Listening on http://{} (downloads go to {})",
        addr,
        config.output_dir.display()
    );

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running server")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("[Server] Failed to install Ctrl+C handler: {}", err);
    }
}
