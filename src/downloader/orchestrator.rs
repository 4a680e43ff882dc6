// Session orchestrator: one validated request, one engine call

use std::sync::Arc;

use serde_json::Value;

use super::errors::DownloadError;
use super::models::{DownloadConfig, DownloadProgress, DownloadRequest, SessionEvent};
use super::progress::{normalize, Normalized};
use super::traits::{DownloadEngine, EventSink};

pub struct Downloader {
    engine: Arc<dyn DownloadEngine>,
    config: DownloadConfig,
}

fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Downloader {
    pub fn new(engine: Arc<dyn DownloadEngine>, config: DownloadConfig) -> Self {
        Self { engine, config }
    }

    /// Runs one download to completion, relaying normalized events to `sink`.
    /// Emits exactly one `error` event on failure, or `complete` + `done`.
    pub async fn run_download(
        &self,
        request: &DownloadRequest,
        sink: &dyn EventSink,
    ) -> Result<(), DownloadError> {
        let (Some(url), Some(format_id)) = (required(&request.url), required(&request.format_id))
        else {
            let err = DownloadError::InvalidInput("Missing URL or format_id".to_string());
            sink.emit(SessionEvent::error(err.to_string()));
            return Err(err);
        };

        tracing::info!(
            "[Downloader] Starting {} format={} via {}",
            url,
            format_id,
            self.engine.name()
        );

        let mut on_progress = |raw: Value| match normalize(&raw) {
            Normalized::Progress(progress) => sink.emit(SessionEvent::Progress(progress)),
            Normalized::Failed { message } => sink.emit(SessionEvent::error(message)),
            Normalized::Passthrough(raw) => sink.emit(SessionEvent::RawProgress(raw)),
        };

        match self
            .engine
            .download(url, format_id, &self.config, &mut on_progress)
            .await
        {
            Ok(()) => {
                tracing::info!("[Downloader] ✓ Finished {} format={}", url, format_id);
                sink.emit(SessionEvent::Progress(DownloadProgress::complete()));
                sink.emit(SessionEvent::done());
                Ok(())
            }
            Err(e) => {
                tracing::warn!("[Downloader] ✗ {} failed: {}", url, e);
                sink.emit(SessionEvent::error(e.to_string()));
                Err(e)
            }
        }
    }
}
