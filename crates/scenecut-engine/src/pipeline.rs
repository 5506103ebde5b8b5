//! Probe, detect, then extract every scene.
//!
//! Progress milestones: 5% on entering `Probing`, 15% on `Detecting`, 30% on
//! `Extracting`. The remaining 70 points are spread linearly over the scene
//! candidates and capped at 99, so 100 is only ever reported by the
//! completion event.

use std::sync::Arc;
use tracing::{debug, Instrument};

use scenecut_media::{DetectionError, ExtractionError, MediaToolkit};
use scenecut_models::{ClipDescriptor, JobPhase, ProcessingResult, ProgressEvent, SceneBoundary, VideoSource};

use crate::config::{EngineConfig, DEFAULT_MIN_SCENE_MS, DEFAULT_THUMBNAIL_OFFSET_MS};
use crate::error::PipelineError;
use crate::logging::RunLogger;
use crate::metrics;
use crate::ports::{OutputResolver, ProgressSink, ResultSink};

pub const PROBING_PROGRESS: u8 = 5;
pub const DETECTING_PROGRESS: u8 = 15;
pub const EXTRACTING_PROGRESS: u8 = 30;
const EXTRACTION_SPAN: u64 = 70;
const MAX_RUNNING_PROGRESS: u8 = 99;

/// Time range between two consecutive boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneCandidate {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl SceneCandidate {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

/// Turn detected boundaries into consecutive candidate ranges.
///
/// Time zero is always a boundary and the last range is closed by the probed
/// duration. Boundaries at or past the end of the source are ignored.
pub fn scene_candidates(boundaries: &[SceneBoundary], duration_ms: u64) -> Vec<SceneCandidate> {
    let mut points: Vec<u64> = boundaries
        .iter()
        .map(SceneBoundary::as_ms)
        .filter(|ms| *ms < duration_ms)
        .collect();
    points.push(0);
    points.sort_unstable();
    points.dedup();
    points.push(duration_ms);

    points
        .windows(2)
        .filter(|w| w[1] > w[0])
        .map(|w| SceneCandidate {
            start_ms: w[0],
            end_ms: w[1],
        })
        .collect()
}

/// Progress after `done` of `total` candidates have been handled.
pub fn extraction_progress(done: usize, total: usize) -> u8 {
    if total == 0 {
        return EXTRACTING_PROGRESS;
    }
    let done = done.min(total) as u64;
    let pct = EXTRACTING_PROGRESS as u64 + EXTRACTION_SPAN * done / total as u64;
    pct.min(MAX_RUNNING_PROGRESS as u64) as u8
}

/// Thumbnail position inside a scene.
pub fn thumbnail_at(candidate: &SceneCandidate, offset_ms: u64) -> u64 {
    candidate.start_ms + offset_ms.min(candidate.duration_ms() / 2)
}

/// Tunables of the extraction loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub min_scene_ms: u64,
    pub thumbnail_offset_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            min_scene_ms: DEFAULT_MIN_SCENE_MS,
            thumbnail_offset_ms: DEFAULT_THUMBNAIL_OFFSET_MS,
        }
    }
}

impl From<&EngineConfig> for PipelineSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            min_scene_ms: config.min_scene_ms,
            thumbnail_offset_ms: config.thumbnail_offset_ms,
        }
    }
}

/// Runs one video through probe, detection and extraction.
pub struct ProcessingPipeline {
    toolkit: Arc<dyn MediaToolkit>,
    resolver: Arc<dyn OutputResolver>,
    sink: Arc<dyn ResultSink>,
    settings: PipelineSettings,
}

impl ProcessingPipeline {
    pub fn new(
        toolkit: Arc<dyn MediaToolkit>,
        resolver: Arc<dyn OutputResolver>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            toolkit,
            resolver,
            sink,
            settings: PipelineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Process `source` and report every milestone to `progress`.
    ///
    /// Always ends with exactly one terminal event: `Completed` carrying the
    /// result, or `Failed` carrying the error message. Files written before a
    /// failure are left in place.
    pub async fn run(
        &self,
        source: &VideoSource,
        threshold: f64,
        progress: &dyn ProgressSink,
    ) -> Result<ProcessingResult, PipelineError> {
        let logger = RunLogger::new(&source.id, "scene_pipeline");
        let span = logger.create_span();

        async {
            logger.log_start(&format!(
                "{} ({} bytes, threshold {})",
                source.original_filename, source.size_bytes, threshold
            ));

            match self.execute(source, threshold, progress, &logger).await {
                Ok(result) => {
                    logger.log_completion(&format!("{} clips", result.clips.len()));
                    progress.report(ProgressEvent::completed(result.clone())).await;
                    Ok(result)
                }
                Err(e) => {
                    logger.log_error(&e.to_string());
                    progress.report(ProgressEvent::failed(e.to_string())).await;
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        source: &VideoSource,
        threshold: f64,
        progress: &dyn ProgressSink,
        logger: &RunLogger,
    ) -> Result<ProcessingResult, PipelineError> {
        progress
            .report(ProgressEvent::new(JobPhase::Probing, PROBING_PROGRESS, "Probing video"))
            .await;
        let metadata = self.toolkit.probe(&source.path).await?;
        logger.log_progress(&format!(
            "probed {}ms {} {}",
            metadata.duration_ms, metadata.codec, metadata.resolution
        ));

        progress
            .report(
                ProgressEvent::new(JobPhase::Detecting, DETECTING_PROGRESS, "Detecting scenes")
                    .with_metadata(metadata.clone()),
            )
            .await;
        let boundaries = self.toolkit.detect(&source.path, threshold).await?;
        if boundaries.is_empty() {
            return Err(DetectionError::NoBoundaries.into());
        }

        let candidates = scene_candidates(&boundaries, metadata.duration_ms);
        let total = candidates.len();
        logger.log_progress(&format!(
            "{} boundaries, {} candidate scenes",
            boundaries.len(),
            total
        ));

        progress
            .report(ProgressEvent::new(
                JobPhase::Extracting,
                EXTRACTING_PROGRESS,
                format!("Extracting {} scenes", total),
            ))
            .await;

        let mut clips: Vec<ClipDescriptor> = Vec::with_capacity(total);
        for (i, candidate) in candidates.iter().enumerate() {
            let stage = if candidate.duration_ms() < self.settings.min_scene_ms {
                debug!(
                    start_ms = candidate.start_ms,
                    end_ms = candidate.end_ms,
                    "Discarding short scene"
                );
                metrics::record_scene_discarded();
                format!("Skipped scene {} of {} (too short)", i + 1, total)
            } else {
                let clip = self.extract_scene(source, candidate, clips.len() as u32).await?;
                clips.push(clip);
                format!("Extracted clip {} of {}", clips.len(), total)
            };

            progress
                .report(
                    ProgressEvent::new(JobPhase::Extracting, extraction_progress(i + 1, total), stage)
                        .with_clips(clips.clone()),
                )
                .await;
        }

        if clips.is_empty() {
            logger.log_warning("every scene was shorter than the minimum length");
        }

        let result = ProcessingResult { metadata, clips };
        self.sink.store(&source.id, &result).await?;
        Ok(result)
    }

    async fn extract_scene(
        &self,
        source: &VideoSource,
        candidate: &SceneCandidate,
        scene_index: u32,
    ) -> Result<ClipDescriptor, PipelineError> {
        let clip_path = self.resolver.clip_path(&source.id, scene_index);
        let thumbnail_path = self.resolver.thumbnail_path(&source.id, scene_index);

        self.toolkit
            .extract_clip(&source.path, &clip_path, candidate.start_ms, candidate.end_ms)
            .await?;
        self.toolkit
            .extract_thumbnail(
                &source.path,
                &thumbnail_path,
                thumbnail_at(candidate, self.settings.thumbnail_offset_ms),
            )
            .await?;

        ClipDescriptor::new(
            scene_index,
            candidate.start_ms,
            candidate.end_ms,
            clip_path,
            thumbnail_path,
        )
        .ok_or_else(|| ExtractionError::new("scene range is empty").into())
    }
}
