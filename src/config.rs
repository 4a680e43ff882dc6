//! Runtime configuration: environment variables first, command-line flags on top.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use crate::downloader::CatalogPolicy;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_EXTRACT_TIMEOUT: u64 = 15;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Where finished downloads land
    pub output_dir: PathBuf,
    pub ytdlp_path: Option<String>,
    pub ffmpeg_path: Option<String>,
    /// yt-dlp socket timeout in seconds
    pub extract_timeout: u64,
    pub catalog: CatalogPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            output_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            ytdlp_path: None,
            ffmpeg_path: None,
            extract_timeout: DEFAULT_EXTRACT_TIMEOUT,
            catalog: CatalogPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Reads the process environment and arguments
    pub fn load() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_sources(&vars, std::env::args().skip(1))
    }

    pub fn from_sources<I>(vars: &HashMap<String, String>, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        Self::from_env(vars)?.apply_args(args)
    }

    pub fn from_env(vars: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        if let Some(host) = get("MEDIA_DL_HOST") {
            config.host = parse_host(host)?;
        }
        if let Some(port) = get("MEDIA_DL_PORT") {
            config.port = parse_port(port)?;
        }
        if let Some(dir) = get("MEDIA_DL_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        config.ytdlp_path = get("MEDIA_DL_YTDLP").map(str::to_string);
        config.ffmpeg_path = get("MEDIA_DL_FFMPEG").map(str::to_string);
        if let Some(timeout) = get("MEDIA_DL_EXTRACT_TIMEOUT") {
            config.extract_timeout = timeout
                .parse()
                .context("MEDIA_DL_EXTRACT_TIMEOUT must be a number of seconds")?;
        }
        if let Some(placeholder) = vars.get("MEDIA_DL_RESOLUTION_PLACEHOLDER") {
            config.catalog = config.catalog.with_placeholder(placeholder.clone());
        }
        if let Some(width) = get("MEDIA_DL_MIN_VIDEO_WIDTH") {
            let width = width
                .parse()
                .context("MEDIA_DL_MIN_VIDEO_WIDTH must be a pixel count")?;
            config.catalog = config.catalog.with_min_video_width(width);
        }
        if let Some(list) = vars.get("MEDIA_DL_EXCLUDED_CONTAINERS") {
            let containers = list
                .split(',')
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .collect();
            config.catalog = config.catalog.with_excluded_containers(containers);
        }

        Ok(config)
    }

    pub fn apply_args<I>(mut self, iter: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = iter.into_iter();
        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
                None => (arg.clone(), None),
            };
            let mut value = || {
                inline
                    .clone()
                    .or_else(|| args.next())
                    .ok_or_else(|| anyhow!("{} requires a value", flag))
            };

            match flag.as_str() {
                "--host" => self.host = parse_host(&value()?)?,
                "--port" => self.port = parse_port(&value()?)?,
                "--output-dir" => self.output_dir = PathBuf::from(value()?),
                _ => return Err(anyhow!("unknown argument: {arg}")),
            }
        }
        Ok(self)
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_catalog(mut self, catalog: CatalogPolicy) -> Self {
        self.catalog = catalog;
        self
    }
}

fn parse_port(value: &str) -> Result<u16> {
    value
        .parse::<u16>()
        .context("expected a numeric port between 0 and 65535")
}

fn parse_host(value: &str) -> Result<IpAddr> {
    value
        .parse::<IpAddr>()
        .context("expected a valid IPv4 or IPv6 address")
}
