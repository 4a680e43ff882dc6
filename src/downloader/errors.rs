// Error types shared by the engines, the catalog builder and the transport

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadError {
    /// Client request is missing a required field
    InvalidInput(String),

    /// URL is malformed or no extractor supports it
    InvalidUrl(String),

    /// Private, removed or region-locked media
    Unavailable(String),

    /// Network timeout while talking to the media host
    NetworkTimeout(String),

    /// yt-dlp or ffmpeg not found in system
    ToolNotFound(String),

    /// Failed to parse yt-dlp JSON output
    ParseError(String),

    /// Command execution failed
    ExecutionError(String),

    /// Unclassified engine failure, carries the engine's own text
    Unknown(String),
}

impl DownloadError {
    /// Whether the failure was caused by the client's request
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "{}", msg),
            Self::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            Self::Unavailable(msg) => write!(f, "Media unavailable: {}", msg),
            Self::NetworkTimeout(msg) => write!(f, "Network timeout: {}", msg),
            Self::ToolNotFound(tool) => write!(f, "Tool not found: {}", tool),
            Self::ParseError(msg) => write!(f, "Parse error: {}", msg),
            Self::ExecutionError(msg) => write!(f, "Execution error: {}", msg),
            Self::Unknown(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for DownloadError {}

// Classifies raw engine stderr
impl From<String> for DownloadError {
    fn from(s: String) -> Self {
        let lower = s.to_lowercase();

        if lower.contains("unsupported url") || lower.contains("is not a valid url") {
            return Self::InvalidUrl(s);
        }

        if lower.contains("private video")
            || lower.contains("video unavailable")
            || lower.contains("not available in your country")
            || lower.contains("geo restriction")
            || lower.contains("has been removed")
        {
            return Self::Unavailable(s);
        }

        if lower.contains("timeout") || lower.contains("timed out") {
            return Self::NetworkTimeout(s);
        }

        // Only a failed spawn means the binary is missing; yt-dlp's own
        // "No such file or directory" is about output paths
        if lower.starts_with("failed to start")
            && (lower.contains("no such file or directory") || lower.contains("not found"))
        {
            return Self::ToolNotFound(s);
        }

        Self::Unknown(s)
    }
}
