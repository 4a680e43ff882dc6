// Common data models for the downloader

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One stream as reported by `yt-dlp --dump-json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Format ID (e.g., "137", "140")
    #[serde(default)]
    pub format_id: Option<String>,
    /// File extension (mp4, webm, m4a)
    #[serde(default)]
    pub ext: Option<String>,
    /// Resolution string (e.g., "1920x1080", "audio only")
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Total bitrate in kbps
    #[serde(default)]
    pub tbr: Option<f64>,
    /// Video codec (avc1, vp9, av01, none)
    #[serde(default)]
    pub vcodec: Option<String>,
    /// Audio codec (mp4a, opus, none)
    #[serde(default)]
    pub acodec: Option<String>,
    /// File size in bytes
    #[serde(default)]
    pub filesize: Option<u64>,
    /// Format note (e.g., "1080p", "tiny")
    #[serde(default)]
    pub format_note: Option<String>,
}

/// A codec field counts as present unless missing, empty or `"none"`
fn codec_present(codec: &Option<String>) -> bool {
    codec
        .as_deref()
        .map_or(false, |c| !c.is_empty() && c != "none")
}

impl StreamDescriptor {
    pub fn has_video(&self) -> bool {
        codec_present(&self.vcodec)
    }

    pub fn has_audio(&self) -> bool {
        codec_present(&self.acodec)
    }

    pub fn is_combined(&self) -> bool {
        self.has_video() && self.has_audio()
    }

    pub fn is_audio_only(&self) -> bool {
        !self.has_video() && self.has_audio()
    }

    pub fn is_video_only(&self) -> bool {
        self.has_video() && !self.has_audio()
    }
}

/// Metadata of one media resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub formats: Vec<StreamDescriptor>,
}

/// Downloadable option shown to the client. Always carries audio and video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatOption {
    pub format_id: String,
    pub ext: String,
    pub resolution: String,
    pub filesize: Option<u64>,
    pub format_note: String,
    pub vcodec: String,
    pub acodec: String,
    pub has_video: bool,
    pub has_audio: bool,
}

/// Body of a successful `/info` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub formats: Vec<FormatOption>,
}

/// Client request to start a download. Fields are optional so a missing
/// one can be reported instead of rejected by the decoder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub format_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Downloading,
    Processing,
    Complete,
}

/// Normalized progress update relayed to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub status: ProgressStatus,
    pub percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    /// Bytes per second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Seconds remaining
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DownloadProgress {
    pub fn complete() -> Self {
        Self {
            status: ProgressStatus::Complete,
            percent: 100.0,
            downloaded_bytes: None,
            total_bytes: None,
            speed: None,
            eta: None,
            elapsed: None,
            filename: None,
            message: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoneStatus {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorMessage {
    pub message: String,
}

/// Outbound session event. Serialized as `{"event": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    Progress(DownloadProgress),
    /// Raw engine event with an unrecognized status, forwarded untouched
    #[serde(rename = "progress")]
    RawProgress(Value),
    Done(DoneStatus),
    Error(ErrorMessage),
}

impl SessionEvent {
    pub fn done() -> Self {
        Self::Done(DoneStatus {
            status: "complete".to_string(),
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorMessage {
            message: message.into(),
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Inbound client message on the event channel
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    StartDownload(DownloadRequest),
}

/// Fixed engine policy for one download
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Directory the final file lands in
    pub output_dir: String,
    /// yt-dlp output template, relative to `output_dir`
    pub output_template: String,
    /// Container every result is converted to
    pub target_container: String,
    /// Fix DASH m4a audio containers
    pub fixup_m4a: bool,
    pub embed_metadata: bool,
    /// Directory or binary path of ffmpeg, when known
    pub ffmpeg_location: Option<String>,
    /// Keep the single-stream files after merging
    pub keep_intermediate: bool,
}

impl DownloadConfig {
    pub fn standard(output_dir: impl Into<String>, ffmpeg_location: Option<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            output_template: "%(title)s.%(ext)s".to_string(),
            target_container: "mp4".to_string(),
            fixup_m4a: true,
            embed_metadata: true,
            ffmpeg_location,
            keep_intermediate: false,
        }
    }
}
