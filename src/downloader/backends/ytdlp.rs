// yt-dlp CLI engine
//
// Metadata comes from `--dump-json`. Downloads run with a progress template
// that prints every progress dictionary as one JSON line, so the raw events
// reach the normalizer with yt-dlp's own field names.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{DownloadConfig, MediaMetadata};
use crate::downloader::progress::{parse_line, ProgressLine, PROGRESS_MARKER};
use crate::downloader::traits::{DownloadEngine, ExtractionEngine, ProgressCallback};
use crate::downloader::utils::{error_summary, run_captured};

pub struct YtDlpCli {
    ytdlp_path: String,
    timeout_seconds: u64,
}

impl YtDlpCli {
    pub fn new(ytdlp_path: impl Into<String>, timeout_seconds: u64) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
            timeout_seconds,
        }
    }

    fn build_info_args(&self, url: &str) -> Vec<String> {
        vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.timeout_seconds.to_string(),
            url.to_string(),
        ]
    }

    fn build_download_args(url: &str, format_selector: &str, config: &DownloadConfig) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            format_selector.to_string(),
            "--no-playlist".to_string(),
            "--newline".to_string(),
            "--no-update".to_string(),
            "--progress-template".to_string(),
            format!("download:{} %(progress)j", PROGRESS_MARKER),
            "-P".to_string(),
            config.output_dir.clone(),
            "-o".to_string(),
            config.output_template.clone(),
            "--merge-output-format".to_string(),
            config.target_container.clone(),
            "--recode-video".to_string(),
            config.target_container.clone(),
            "--fixup".to_string(),
            if config.fixup_m4a { "detect_or_warn" } else { "never" }.to_string(),
        ];

        if config.embed_metadata {
            args.push("--embed-metadata".to_string());
        }

        if let Some(location) = &config.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(location.clone());
        }

        args.push(if config.keep_intermediate { "-k" } else { "--no-keep-video" }.to_string());

        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl ExtractionEngine for YtDlpCli {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn extract(&self, url: &str) -> Result<MediaMetadata, DownloadError> {
        let args = self.build_info_args(url);
        tracing::debug!("[yt-dlp] {} {}", self.ytdlp_path, args.join(" "));

        // Extraction also gets a slack of a few socket timeouts
        let stdout = run_captured(&self.ytdlp_path, &args, self.timeout_seconds * 3)
            .await
            .map_err(DownloadError::from)?;

        serde_json::from_slice::<MediaMetadata>(&stdout)
            .map_err(|e| DownloadError::ParseError(format!("Invalid JSON: {}", e)))
    }
}

#[async_trait]
impl DownloadEngine for YtDlpCli {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn download(
        &self,
        url: &str,
        format_selector: &str,
        config: &DownloadConfig,
        on_progress: &mut ProgressCallback<'_>,
    ) -> Result<(), DownloadError> {
        let args = Self::build_download_args(url, format_selector, config);
        tracing::debug!("[yt-dlp] {} {}", self.ytdlp_path, args.join(" "));

        let mut child = Command::new(&self.ytdlp_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DownloadError::from(format!("Failed to start yt-dlp: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::ExecutionError("Failed to capture stdout".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::ExecutionError("Failed to capture stderr".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).into_owned()
        });

        // Titles and file names may carry bytes that are not UTF-8
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|e| DownloadError::ExecutionError(format!("Failed to read stdout: {}", e)))?;
            if read == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            match parse_line(&line) {
                ProgressLine::Event(raw) => on_progress(raw),
                ProgressLine::Other => tracing::debug!("[yt-dlp] {}", line.trim_end()),
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| DownloadError::ExecutionError(format!("Process error: {}", e)))?;
        let stderr_output = stderr_task.await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(DownloadError::from(error_summary(&stderr_output, status)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_download_args_apply_fixed_policy() {
        let config = DownloadConfig::standard("/tmp/out", Some("/usr/bin/ffmpeg".to_string()));
        let args = YtDlpCli::build_download_args("https://example.com/v", "137+140", &config);

        assert_eq!(arg_after(&args, "-f"), Some("137+140"));
        assert_eq!(arg_after(&args, "-P"), Some("/tmp/out"));
        assert_eq!(arg_after(&args, "-o"), Some("%(title)s.%(ext)s"));
        assert_eq!(arg_after(&args, "--merge-output-format"), Some("mp4"));
        assert_eq!(arg_after(&args, "--recode-video"), Some("mp4"));
        assert_eq!(arg_after(&args, "--fixup"), Some("detect_or_warn"));
        assert_eq!(arg_after(&args, "--ffmpeg-location"), Some("/usr/bin/ffmpeg"));
        assert_eq!(
            arg_after(&args, "--progress-template"),
            Some("download:__progress__ %(progress)j")
        );
        assert!(args.contains(&"--embed-metadata".to_string()));
        assert!(args.contains(&"--no-keep-video".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://example.com/v"));
    }

    #[test]
    fn test_info_args() {
        let engine = YtDlpCli::new("yt-dlp", 15);
        let args = engine.build_info_args("https://example.com/v");

        assert!(args.contains(&"--dump-json".to_string()));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert_eq!(arg_after(&args, "--socket-timeout"), Some("15"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_error() {
        let engine = YtDlpCli::new("/nonexistent/yt-dlp", 5);

        let err = engine.extract("https://example.com/v").await.unwrap_err();

        assert!(matches!(err, DownloadError::ToolNotFound(_)));
    }

    #[cfg(unix)]
    fn fake_ytdlp(name: &str, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = std::env::temp_dir().join(format!("{}-{}", name, std::process::id()));
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_download_survives_non_utf8_output() {
        let script = fake_ytdlp(
            "fake-ytdlp-latin1",
            "printf 'title \\377\\376 bytes\\n'\n\
             printf '__progress__ {\"status\": \"downloading\", \"downloaded_bytes\": 50, \"total_bytes\": 200}\\n'\n\
             exit 0",
        );
        let engine = YtDlpCli::new(script.to_string_lossy(), 5);
        let config = DownloadConfig::standard("/tmp", None);
        let mut events = Vec::new();

        let result = engine
            .download("https://example.com/v", "18", &config, &mut |raw: serde_json::Value| events.push(raw))
            .await;
        std::fs::remove_file(&script).ok();

        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["downloaded_bytes"], 50);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_keeps_non_utf8_stderr() {
        let script = fake_ytdlp(
            "fake-ytdlp-fail",
            "printf 'ERROR: unable to write caf\\351.mp4\\n' >&2\nexit 1",
        );
        let engine = YtDlpCli::new(script.to_string_lossy(), 5);
        let config = DownloadConfig::standard("/tmp", None);

        let err = engine
            .download("https://example.com/v", "18", &config, &mut |_: serde_json::Value| {})
            .await
            .unwrap_err();
        std::fs::remove_file(&script).ok();

        assert!(err.to_string().contains("ERROR: unable to write caf"), "{}", err);
    }
}
