// Progress normalization
//
// yt-dlp reports progress as loosely-typed dictionaries. `normalize` maps
// them onto the small vocabulary the client understands; `parse_line` turns
// yt-dlp stdout lines into those raw dictionaries.

use regex::Regex;
use serde_json::{json, Value};

use super::models::{DownloadProgress, ProgressStatus};

/// Prefix the progress template puts in front of every JSON progress line
pub const PROGRESS_MARKER: &str = "__progress__";

pub const PROCESSING_MESSAGE: &str = "Download finished, merging and converting...";

const UNKNOWN_ERROR: &str = "Unknown download error";

/// Result of normalizing one raw progress event
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Progress(DownloadProgress),
    Failed { message: String },
    Passthrough(Value),
}

fn number(raw: &Value, key: &str) -> Option<f64> {
    raw.get(key).and_then(Value::as_f64)
}

fn bytes(raw: &Value, key: &str) -> Option<u64> {
    number(raw, key).filter(|n| *n >= 0.0).map(|n| n as u64)
}

fn text(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

pub fn normalize(raw: &Value) -> Normalized {
    match raw.get("status").and_then(Value::as_str) {
        Some("downloading") => {
            let downloaded = bytes(raw, "downloaded_bytes").unwrap_or(0);
            let total = bytes(raw, "total_bytes")
                .or_else(|| bytes(raw, "total_bytes_estimate"))
                .unwrap_or(0);
            let percent = if total > 0 {
                downloaded as f64 / total as f64 * 100.0
            } else {
                0.0
            };

            Normalized::Progress(DownloadProgress {
                status: ProgressStatus::Downloading,
                percent,
                downloaded_bytes: Some(downloaded),
                total_bytes: Some(total),
                speed: number(raw, "speed"),
                eta: number(raw, "eta"),
                elapsed: number(raw, "elapsed"),
                filename: text(raw, "filename"),
                message: None,
            })
        }
        Some("finished") => Normalized::Progress(DownloadProgress {
            status: ProgressStatus::Processing,
            percent: 99.0,
            downloaded_bytes: None,
            total_bytes: None,
            speed: None,
            eta: None,
            elapsed: None,
            filename: text(raw, "filename"),
            message: Some(PROCESSING_MESSAGE.to_string()),
        }),
        Some("error") => Normalized::Failed {
            message: text(raw, "error")
                .or_else(|| text(raw, "message"))
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
        },
        _ => Normalized::Passthrough(raw.clone()),
    }
}

/// One classified line of yt-dlp stdout
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressLine {
    /// Raw progress dictionary
    Event(Value),
    /// Anything else yt-dlp printed
    Other,
}

/// Parse yt-dlp output lines like:
/// __progress__ {"status": "downloading", "downloaded_bytes": 1024, ...}
/// [Merger] Merging formats into "Title.mp4"
pub fn parse_line(line: &str) -> ProgressLine {
    lazy_static::lazy_static! {
        static ref POSTPROCESS_RE: Regex = Regex::new(
            r"^\[(Merger|VideoConvertor|VideoRemuxer|FixupM4a|FixupM3u8|Metadata)\]\s+(.+)$"
        ).unwrap();
    }

    let line = line.trim();

    if let Some(payload) = line.strip_prefix(PROGRESS_MARKER) {
        return match serde_json::from_str::<Value>(payload.trim()) {
            Ok(value) if value.is_object() => ProgressLine::Event(value),
            _ => ProgressLine::Other,
        };
    }

    if let Some(caps) = POSTPROCESS_RE.captures(line) {
        let postprocessor = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let message = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        return ProgressLine::Event(json!({
            "status": "postprocessing",
            "postprocessor": postprocessor,
            "message": message,
        }));
    }

    ProgressLine::Other
}
