//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use scenecut_media::{validate_threshold, FfmpegToolkit, DEFAULT_THRESHOLD};
use scenecut_models::encoding::THUMBNAIL_SCALE_WIDTH;
use scenecut_models::EncodingConfig;

use crate::error::{EngineError, EngineResult};

/// Candidates shorter than this are discarded.
pub const DEFAULT_MIN_SCENE_MS: u64 = 500;
/// Thumbnails are taken at `start + min(offset, duration / 2)`.
pub const DEFAULT_THUMBNAIL_OFFSET_MS: u64 = 1000;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Scene score threshold in (0, 1]
    pub threshold: f64,
    /// Minimum retained scene length
    pub min_scene_ms: u64,
    /// Preferred thumbnail offset into a scene
    pub thumbnail_offset_ms: u64,
    /// Root directory for clips and thumbnails
    pub output_dir: PathBuf,
    /// URL prefix under which `output_dir` is served
    pub public_base_url: String,
    /// Kill a single FFmpeg invocation after this long
    pub ffmpeg_timeout: Duration,
    /// Thumbnail width in pixels
    pub thumbnail_width: u32,
    /// Clip encoding settings
    pub encoding: EncodingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_scene_ms: DEFAULT_MIN_SCENE_MS,
            thumbnail_offset_ms: DEFAULT_THUMBNAIL_OFFSET_MS,
            output_dir: PathBuf::from("/tmp/scenecut"),
            public_base_url: "/media".to_string(),
            ffmpeg_timeout: Duration::from_secs(1800), // 30 minutes
            thumbnail_width: THUMBNAIL_SCALE_WIDTH,
            encoding: EncodingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            threshold: std::env::var("SCENECUT_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|t| validate_threshold(*t).is_ok())
                .unwrap_or(defaults.threshold),
            min_scene_ms: std::env::var("SCENECUT_MIN_SCENE_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_scene_ms),
            thumbnail_offset_ms: std::env::var("SCENECUT_THUMBNAIL_OFFSET_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.thumbnail_offset_ms),
            output_dir: std::env::var("SCENECUT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            public_base_url: std::env::var("SCENECUT_PUBLIC_BASE_URL")
                .unwrap_or(defaults.public_base_url),
            ffmpeg_timeout: Duration::from_secs(
                std::env::var("SCENECUT_FFMPEG_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1800),
            ),
            thumbnail_width: std::env::var("SCENECUT_THUMBNAIL_WIDTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|w| *w > 0)
                .unwrap_or(defaults.thumbnail_width),
            encoding: defaults.encoding,
        }
    }

    /// FFmpeg-backed toolkit configured from this config.
    pub fn toolkit(&self) -> FfmpegToolkit {
        FfmpegToolkit::new()
            .with_encoding(self.encoding.clone())
            .with_thumbnail_width(self.thumbnail_width)
            .with_timeout(self.ffmpeg_timeout.as_secs())
    }
}

/// Per-run overrides supplied with a start request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingOptions {
    /// Detection threshold for this run only
    pub threshold: Option<f64>,
}

impl ProcessingOptions {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold: Some(threshold),
        }
    }

    /// Effective threshold for a run, rejecting values outside (0, 1].
    pub fn resolve_threshold(&self, config: &EngineConfig) -> EngineResult<f64> {
        match self.threshold {
            Some(t) => validate_threshold(t).map_err(|e| EngineError::invalid_options(e.to_string())),
            None => Ok(config.threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.threshold, 0.4);
        assert_eq!(config.min_scene_ms, 500);
        assert_eq!(config.thumbnail_offset_ms, 1000);
        assert_eq!(config.thumbnail_width, 480);
        assert_eq!(config.ffmpeg_timeout, Duration::from_secs(1800));
    }

    #[test]
    fn test_threshold_override() {
        let config = EngineConfig::default();

        assert_eq!(ProcessingOptions::default().resolve_threshold(&config).unwrap(), 0.4);
        assert_eq!(
            ProcessingOptions::with_threshold(0.25).resolve_threshold(&config).unwrap(),
            0.25
        );
        assert!(matches!(
            ProcessingOptions::with_threshold(0.0).resolve_threshold(&config),
            Err(EngineError::InvalidOptions(_))
        ));
        assert!(ProcessingOptions::with_threshold(1.01).resolve_threshold(&config).is_err());
    }
}
