use media_downloader_lib::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    media_downloader_lib::init_tracing();
    let config = AppConfig::load()?;
    media_downloader_lib::run(config).await
}
