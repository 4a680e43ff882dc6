// Engine and sink seams

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

use super::errors::DownloadError;
use super::models::{DownloadConfig, MediaMetadata, SessionEvent};

/// Callback the download engine feeds raw progress dictionaries into
pub type ProgressCallback<'a> = dyn FnMut(Value) + Send + 'a;

/// Fetches metadata and the stream list for a URL
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Name of the engine (for logging)
    fn name(&self) -> &'static str;

    async fn extract(&self, url: &str) -> Result<MediaMetadata, DownloadError>;
}

/// Downloads one format selection, reporting progress as it goes
#[async_trait]
pub trait DownloadEngine: Send + Sync {
    /// Name of the engine (for logging)
    fn name(&self) -> &'static str;

    async fn download(
        &self,
        url: &str,
        format_selector: &str,
        config: &DownloadConfig,
        on_progress: &mut ProgressCallback<'_>,
    ) -> Result<(), DownloadError>;
}

/// Receiver of one session's outbound events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SessionEvent);
}

impl EventSink for UnboundedSender<SessionEvent> {
    fn emit(&self, event: SessionEvent) {
        // Subscriber gone; the download still runs to completion
        if self.send(event).is_err() {
            tracing::debug!("[Session] Subscriber dropped, event discarded");
        }
    }
}
