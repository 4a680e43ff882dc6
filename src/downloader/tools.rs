use serde::{Deserialize, Serialize};
use std::process::Command;

use super::utils::find_binary;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ToolType {
    YtDlp,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "--version",
            ToolType::Ffmpeg => "-version", // ffmpeg uses a single dash
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<String>,
    pub is_available: bool,
}

/// Locates and version-probes the external binaries
#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    ytdlp_override: Option<String>,
    ffmpeg_override: Option<String>,
}

impl ToolManager {
    pub fn new(ytdlp_override: Option<String>, ffmpeg_override: Option<String>) -> Self {
        Self {
            ytdlp_override,
            ffmpeg_override,
        }
    }

    pub fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let path = self.locate(tool_type);
        let version = path
            .as_deref()
            .and_then(|p| Self::get_version(p, tool_type));

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            // A binary that cannot report its version is unusable
            is_available: version.is_some(),
            version,
            path,
        }
    }

    pub fn get_all_tools(&self) -> Vec<ToolInfo> {
        vec![
            self.get_tool_info(ToolType::YtDlp),
            self.get_tool_info(ToolType::Ffmpeg),
        ]
    }

    /// Path used to launch the tool; falls back to the bare name on PATH
    pub fn command_for(&self, tool_type: ToolType) -> String {
        self.locate(tool_type)
            .unwrap_or_else(|| tool_type.as_str().to_string())
    }

    fn locate(&self, tool_type: ToolType) -> Option<String> {
        let configured = match tool_type {
            ToolType::YtDlp => &self.ytdlp_override,
            ToolType::Ffmpeg => &self.ffmpeg_override,
        };
        configured
            .clone()
            .or_else(|| find_binary(tool_type.as_str()))
    }

    fn get_version(path: &str, tool_type: ToolType) -> Option<String> {
        match Command::new(path).arg(tool_type.version_arg()).output() {
            Ok(output) if output.status.success() => {
                let out = String::from_utf8_lossy(&output.stdout);
                // ffmpeg prints its banner; the first line carries the version
                out.lines().next().map(|l| l.trim().to_string())
            }
            _ => None,
        }
    }

    /// Logs the environment at startup. Missing ffmpeg only degrades merging.
    pub fn log_environment(&self) -> Vec<ToolInfo> {
        let tools = self.get_all_tools();
        for tool in &tools {
            match (&tool.version, tool.tool_type) {
                (Some(version), _) => {
                    tracing::info!("[Tools] {} available: {}", tool.name, version)
                }
                (None, ToolType::Ffmpeg) => tracing::warn!(
                    "[Tools] ffmpeg not found: separate audio and video streams cannot be merged"
                ),
                (None, ToolType::YtDlp) => tracing::warn!(
                    "[Tools] yt-dlp not found: metadata and download requests will fail"
                ),
            }
        }
        tools
    }
}
