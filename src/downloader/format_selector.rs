// Format catalog builder
//
// Turns the raw stream list of one media resource into the options a client
// can download. Every option carries both audio and video:
// - combined streams are offered as they are
// - each wide-enough video-only stream is paired with the best audio-only
//   stream, to be merged by ffmpeg at download time
// Combined options come first, synthetic pairs after, both in input order.

use serde::{Deserialize, Serialize};

use super::errors::DownloadError;
use super::models::{FormatOption, StreamDescriptor};

/// Tunables for catalog building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPolicy {
    /// Containers dropped before either pass
    pub excluded_containers: Vec<String>,
    /// Narrower video-only streams are never paired
    pub min_video_width: u32,
    /// Used when a stream reports no container
    pub default_container: String,
    /// Token rendered for a missing width or height
    pub resolution_placeholder: String,
    /// Note for combined streams that carry none
    pub combined_note: String,
}

impl Default for CatalogPolicy {
    fn default() -> Self {
        Self {
            excluded_containers: vec!["webm".to_string()],
            min_video_width: 640,
            default_container: "mp4".to_string(),
            resolution_placeholder: "?".to_string(),
            combined_note: "Combined".to_string(),
        }
    }
}

impl CatalogPolicy {
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.resolution_placeholder = placeholder.into();
        self
    }

    pub fn with_min_video_width(mut self, width: u32) -> Self {
        self.min_video_width = width;
        self
    }

    pub fn with_excluded_containers(mut self, containers: Vec<String>) -> Self {
        self.excluded_containers = containers;
        self
    }

    fn is_excluded(&self, stream: &StreamDescriptor) -> bool {
        stream
            .ext
            .as_deref()
            .map_or(false, |ext| self.excluded_containers.iter().any(|x| x == ext))
    }

    /// Explicit resolution label if present, else `{width}x{height}` with the
    /// placeholder standing in for missing dimensions.
    pub fn resolution_of(&self, stream: &StreamDescriptor) -> String {
        if let Some(label) = stream.resolution.as_deref().filter(|r| !r.is_empty()) {
            return label.to_string();
        }

        let dim = |v: Option<u32>| {
            v.map(|n| n.to_string())
                .unwrap_or_else(|| self.resolution_placeholder.clone())
        };
        format!("{}x{}", dim(stream.width), dim(stream.height))
    }

    fn container_of(&self, stream: &StreamDescriptor) -> String {
        stream
            .ext
            .clone()
            .unwrap_or_else(|| self.default_container.clone())
    }
}

/// Builds the downloadable format catalog for one resource
pub struct FormatSelector;

impl FormatSelector {
    pub fn build_catalog(
        streams: &[StreamDescriptor],
        policy: &CatalogPolicy,
    ) -> Result<Vec<FormatOption>, DownloadError> {
        let eligible: Vec<(usize, &StreamDescriptor)> = streams
            .iter()
            .enumerate()
            .filter(|(_, s)| !policy.is_excluded(s))
            .collect();

        let mut catalog = Vec::new();

        for &(index, stream) in eligible.iter().filter(|(_, s)| s.is_combined()) {
            catalog.push(FormatOption {
                format_id: require_id(index, stream)?.to_string(),
                ext: policy.container_of(stream),
                resolution: policy.resolution_of(stream),
                filesize: stream.filesize,
                format_note: stream
                    .format_note
                    .clone()
                    .unwrap_or_else(|| policy.combined_note.clone()),
                vcodec: stream.vcodec.clone().unwrap_or_default(),
                acodec: stream.acodec.clone().unwrap_or_default(),
                has_video: true,
                has_audio: true,
            });
        }

        let Some((audio_index, best_audio)) = Self::find_best_audio(&eligible) else {
            return Ok(catalog);
        };
        let audio_id = require_id(audio_index, best_audio)?;

        for (index, video) in Self::video_candidates(&eligible, policy.min_video_width) {
            let resolution = policy.resolution_of(video);
            catalog.push(FormatOption {
                format_id: format!("{}+{}", require_id(index, video)?, audio_id),
                ext: policy.container_of(video),
                filesize: Some(video.filesize.unwrap_or(0) + best_audio.filesize.unwrap_or(0)),
                format_note: format!("High Quality {}", resolution),
                resolution,
                vcodec: video.vcodec.clone().unwrap_or_default(),
                acodec: best_audio.acodec.clone().unwrap_or_default(),
                has_video: true,
                has_audio: true,
            });
        }

        Ok(catalog)
    }

    /// Highest-bitrate audio-only stream; the earliest one wins a tie
    fn find_best_audio<'a>(
        eligible: &[(usize, &'a StreamDescriptor)],
    ) -> Option<(usize, &'a StreamDescriptor)> {
        let mut best: Option<(usize, &StreamDescriptor)> = None;
        for &(index, stream) in eligible.iter().filter(|(_, s)| s.is_audio_only()) {
            let bitrate = stream.tbr.unwrap_or(0.0);
            match best {
                Some((_, current)) if bitrate <= current.tbr.unwrap_or(0.0) => {}
                _ => best = Some((index, stream)),
            }
        }
        best
    }

    fn video_candidates<'a>(
        eligible: &[(usize, &'a StreamDescriptor)],
        min_width: u32,
    ) -> Vec<(usize, &'a StreamDescriptor)> {
        eligible
            .iter()
            .filter(|(_, s)| s.is_video_only() && s.width.unwrap_or(0) >= min_width)
            .copied()
            .collect()
    }
}

fn require_id(index: usize, stream: &StreamDescriptor) -> Result<&str, DownloadError> {
    stream
        .format_id
        .as_deref()
        .ok_or_else(|| DownloadError::ParseError(format!("stream #{} has no format_id", index)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_combined_format(id: &str, ext: &str, width: u32, height: u32) -> StreamDescriptor {
        StreamDescriptor {
            format_id: Some(id.to_string()),
            ext: Some(ext.to_string()),
            resolution: None,
            width: Some(width),
            height: Some(height),
            tbr: Some(500.0),
            vcodec: Some("avc1.42001E".to_string()),
            acodec: Some("mp4a.40.2".to_string()),
            filesize: Some(10_000_000),
            format_note: None,
        }
    }

    fn make_video_format(id: &str, width: u32, size: Option<u64>) -> StreamDescriptor {
        StreamDescriptor {
            format_id: Some(id.to_string()),
            ext: Some("mp4".to_string()),
            resolution: None,
            width: Some(width),
            height: Some(width * 9 / 16),
            tbr: Some(1500.0),
            vcodec: Some("avc1.4d401f".to_string()),
            acodec: Some("none".to_string()),
            filesize: size,
            format_note: None,
        }
    }

    fn make_audio_format(id: &str, bitrate: f64, size: Option<u64>) -> StreamDescriptor {
        StreamDescriptor {
            format_id: Some(id.to_string()),
            ext: Some("m4a".to_string()),
            resolution: Some("audio only".to_string()),
            width: None,
            height: None,
            tbr: Some(bitrate),
            vcodec: Some("none".to_string()),
            acodec: Some("mp4a.40.2".to_string()),
            filesize: size,
            format_note: None,
        }
    }

    fn build(streams: &[StreamDescriptor]) -> Vec<FormatOption> {
        FormatSelector::build_catalog(streams, &CatalogPolicy::default()).unwrap()
    }

    #[test]
    fn test_catalog_combined_then_synthetic() {
        let mut webm = make_combined_format("43", "webm", 640, 360);
        webm.format_note = Some("360p".to_string());
        let formats = vec![
            make_combined_format("18", "mp4", 640, 360),
            webm,
            make_audio_format("140", 128.0, Some(3_000_000)),
            make_video_format("136", 1280, Some(40_000_000)),
            make_video_format("160", 320, Some(2_000_000)),
        ];

        let catalog = build(&formats);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].format_id, "18");
        assert_eq!(catalog[0].format_note, "Combined");
        assert_eq!(catalog[0].resolution, "640x360");
        assert_eq!(catalog[1].format_id, "136+140");
        assert_eq!(catalog[1].resolution, "1280x720");
        assert_eq!(catalog[1].format_note, "High Quality 1280x720");
        assert_eq!(catalog[1].filesize, Some(43_000_000));
        assert_eq!(catalog[1].acodec, "mp4a.40.2");
    }

    #[test]
    fn test_every_option_has_audio_and_video() {
        let mut no_codecs = make_combined_format("sb0", "mhtml", 0, 0);
        no_codecs.vcodec = None;
        no_codecs.acodec = Some("none".to_string());
        let formats = vec![
            no_codecs,
            make_audio_format("140", 128.0, None),
            make_video_format("137", 1920, None),
            make_combined_format("22", "mp4", 1280, 720),
        ];

        let catalog = build(&formats);

        assert_eq!(catalog.len(), 2);
        for option in &catalog {
            assert!(option.has_video && option.has_audio);
            assert!(!option.vcodec.is_empty() && option.vcodec != "none");
            assert!(!option.acodec.is_empty() && option.acodec != "none");
        }
    }

    #[test]
    fn test_webm_never_paired() {
        let mut webm_audio = make_audio_format("251", 160.0, None);
        webm_audio.ext = Some("webm".to_string());
        let mut webm_video = make_video_format("248", 1920, None);
        webm_video.ext = Some("webm".to_string());
        let formats = vec![
            webm_audio,
            make_audio_format("140", 128.0, None),
            webm_video,
            make_video_format("137", 1920, None),
        ];

        let catalog = build(&formats);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].format_id, "137+140");
        assert!(catalog.iter().all(|o| !o.format_id.contains("251")));
        assert!(catalog.iter().all(|o| !o.format_id.contains("248")));
    }

    #[test]
    fn test_audio_tie_keeps_first() {
        let formats = vec![
            make_audio_format("139", 48.0, None),
            make_audio_format("140", 128.0, None),
            make_audio_format("141", 128.0, None),
            make_video_format("136", 1280, None),
        ];

        let catalog = build(&formats);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].format_id, "136+140");
    }

    #[test]
    fn test_missing_bitrate_counts_as_zero() {
        let mut unknown = make_audio_format("599", 0.0, None);
        unknown.tbr = None;
        let formats = vec![
            unknown,
            make_audio_format("600", 32.0, None),
            make_video_format("136", 1280, None),
        ];

        assert_eq!(build(&formats)[0].format_id, "136+600");
    }

    #[test]
    fn test_width_threshold() {
        let mut no_width = make_video_format("399", 0, None);
        no_width.width = None;
        let formats = vec![
            make_audio_format("140", 128.0, None),
            make_video_format("a", 639, None),
            make_video_format("b", 640, None),
            no_width,
        ];

        let ids: Vec<String> = build(&formats).into_iter().map(|o| o.format_id).collect();

        assert_eq!(ids, vec!["b+140".to_string()]);
    }

    #[test]
    fn test_no_audio_means_no_pairs() {
        let formats = vec![
            make_video_format("137", 1920, None),
            make_video_format("136", 1280, None),
        ];

        assert!(build(&formats).is_empty());
    }

    #[test]
    fn test_synthetic_size_treats_missing_as_zero() {
        let formats = vec![
            make_audio_format("140", 128.0, None),
            make_video_format("137", 1920, Some(80_000_000)),
        ];

        assert_eq!(build(&formats)[0].filesize, Some(80_000_000));
    }

    #[test]
    fn test_pairs_keep_input_order() {
        let formats = vec![
            make_video_format("137", 1920, None),
            make_audio_format("140", 128.0, None),
            make_video_format("136", 1280, None),
            make_video_format("135", 854, None),
        ];

        let ids: Vec<String> = build(&formats).into_iter().map(|o| o.format_id).collect();

        assert_eq!(ids, vec!["137+140", "136+140", "135+140"]);
    }

    #[test]
    fn test_placeholder_used_in_both_passes() {
        let mut combined = make_combined_format("18", "mp4", 0, 0);
        combined.width = None;
        combined.height = None;
        let mut video = make_video_format("137", 1920, None);
        video.height = None;
        let formats = vec![combined, make_audio_format("140", 128.0, None), video];

        let catalog = build(&formats);
        assert_eq!(catalog[0].resolution, "?x?");
        assert_eq!(catalog[1].resolution, "1920x?");
        assert_eq!(catalog[1].format_note, "High Quality 1920x?");

        let legacy = CatalogPolicy::default().with_placeholder("None");
        let catalog = FormatSelector::build_catalog(&formats, &legacy).unwrap();
        assert_eq!(catalog[0].resolution, "NonexNone");
    }

    #[test]
    fn test_explicit_resolution_wins() {
        let mut combined = make_combined_format("18", "mp4", 640, 360);
        combined.resolution = Some("360p".to_string());
        combined.format_note = Some("medium".to_string());

        let catalog = build(&[combined]);

        assert_eq!(catalog[0].resolution, "360p");
        assert_eq!(catalog[0].format_note, "medium");
    }

    #[test]
    fn test_missing_container_defaults_to_mp4() {
        let mut video = make_video_format("137", 1920, None);
        video.ext = None;
        let formats = vec![make_audio_format("140", 128.0, None), video];

        assert_eq!(build(&formats)[0].ext, "mp4");
    }

    #[test]
    fn test_missing_format_id_is_fatal_only_when_built() {
        let mut broken = make_video_format("137", 1920, None);
        broken.format_id = None;
        let formats = vec![make_audio_format("140", 128.0, None), broken];
        let err = FormatSelector::build_catalog(&formats, &CatalogPolicy::default()).unwrap_err();
        assert!(matches!(err, DownloadError::ParseError(_)));

        // Narrow stream never reaches construction
        let mut narrow = make_video_format("160", 320, None);
        narrow.format_id = None;
        let formats = vec![make_audio_format("140", 128.0, None), narrow];
        assert!(build(&formats).is_empty());
    }
}
