//! The media primitives the engine depends on.

use async_trait::async_trait;
use std::path::Path;

use crate::clip::extract_clip;
use crate::error::{DetectionError, ExtractionError, ProbeError};
use crate::probe::probe_metadata;
use crate::scene::detect_scenes;
use crate::thumbnail::generate_thumbnail;
use scenecut_models::encoding::THUMBNAIL_SCALE_WIDTH;
use scenecut_models::{EncodingConfig, MediaMetadata, SceneBoundary};

/// Probe, detection and extraction as one swappable capability.
///
/// The engine never shells out itself; it only talks to this trait.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Duration, codec label and resolution of `path`.
    async fn probe(&self, path: &Path) -> Result<MediaMetadata, ProbeError>;

    /// Scene boundaries of `path`, ascending.
    async fn detect(&self, path: &Path, threshold: f64) -> Result<Vec<SceneBoundary>, DetectionError>;

    /// Materialize `[start_ms, end_ms)` of `source` as a playable file at `out`.
    async fn extract_clip(
        &self,
        source: &Path,
        out: &Path,
        start_ms: u64,
        end_ms: u64,
    ) -> Result<(), ExtractionError>;

    /// Write a still frame of `source` at `at_ms` to `out`.
    async fn extract_thumbnail(&self, source: &Path, out: &Path, at_ms: u64) -> Result<(), ExtractionError>;
}

/// [`MediaToolkit`] backed by the `ffmpeg` / `ffprobe` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    encoding: EncodingConfig,
    thumbnail_width: u32,
    timeout_secs: Option<u64>,
}

impl Default for FfmpegToolkit {
    fn default() -> Self {
        Self {
            encoding: EncodingConfig::default(),
            thumbnail_width: THUMBNAIL_SCALE_WIDTH,
            timeout_secs: None,
        }
    }
}

impl FfmpegToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_thumbnail_width(mut self, width: u32) -> Self {
        self.thumbnail_width = width;
        self
    }

    /// Kill any single FFmpeg invocation running longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn encoding(&self) -> &EncodingConfig {
        &self.encoding
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe(&self, path: &Path) -> Result<MediaMetadata, ProbeError> {
        probe_metadata(path).await
    }

    async fn detect(&self, path: &Path, threshold: f64) -> Result<Vec<SceneBoundary>, DetectionError> {
        detect_scenes(path, threshold, self.timeout_secs).await
    }

    async fn extract_clip(
        &self,
        source: &Path,
        out: &Path,
        start_ms: u64,
        end_ms: u64,
    ) -> Result<(), ExtractionError> {
        extract_clip(source, out, start_ms, end_ms, &self.encoding, self.timeout_secs).await
    }

    async fn extract_thumbnail(&self, source: &Path, out: &Path, at_ms: u64) -> Result<(), ExtractionError> {
        generate_thumbnail(source, out, at_ms, self.thumbnail_width, self.timeout_secs).await
    }
}
