//! Collaborators the engine calls out to.
//!
//! - [`ProgressSink`] receives every event of a run, in order.
//! - [`OutputResolver`] decides where clips and thumbnails are written and
//!   how they are retrieved.
//! - [`ResultSink`] persists a finished run.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use scenecut_media::fs_utils::{move_file, temp_sibling};
use scenecut_models::{ClipView, MediaMetadata, ProcessingResult, ProgressEvent, VideoId};

use crate::error::SinkError;

/// Receives the progress events of a single run.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, event: ProgressEvent);
}

/// Maps a video identity to its output locations.
pub trait OutputResolver: Send + Sync {
    /// Where the clip with `scene_index` is written.
    fn clip_path(&self, video_id: &VideoId, scene_index: u32) -> PathBuf;

    /// Where the thumbnail for `scene_index` is written.
    fn thumbnail_path(&self, video_id: &VideoId, scene_index: u32) -> PathBuf;

    /// Retrieval URL for a path produced by this resolver.
    fn retrieval_url(&self, path: &Path) -> String;
}

/// Stores the outcome of a completed run.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn store(&self, video_id: &VideoId, result: &ProcessingResult) -> Result<(), SinkError>;
}

/// `<output_dir>/<video_id>/clip_<n>.mp4`, served under `<public_base_url>`.
#[derive(Debug, Clone)]
pub struct LocalOutputLayout {
    output_dir: PathBuf,
    public_base_url: String,
}

impl LocalOutputLayout {
    pub fn new(output_dir: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Directory holding every output of `video_id`.
    pub fn video_dir(&self, video_id: &VideoId) -> PathBuf {
        self.output_dir.join(video_id.as_str())
    }
}

impl OutputResolver for LocalOutputLayout {
    fn clip_path(&self, video_id: &VideoId, scene_index: u32) -> PathBuf {
        self.video_dir(video_id).join(format!("clip_{}.mp4", scene_index))
    }

    fn thumbnail_path(&self, video_id: &VideoId, scene_index: u32) -> PathBuf {
        self.video_dir(video_id).join(format!("thumb_{}.jpg", scene_index))
    }

    fn retrieval_url(&self, path: &Path) -> String {
        let relative = match path.strip_prefix(&self.output_dir) {
            Ok(rel) => rel.to_path_buf(),
            // Not one of ours; expose the file name only
            Err(_) => path.file_name().map(PathBuf::from).unwrap_or_default(),
        };
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        format!("{}/{}", self.public_base_url, segments.join("/"))
    }
}

/// In-memory result repository keyed by video identity.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    results: RwLock<HashMap<VideoId, ProcessingResult>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, video_id: &VideoId) -> Option<ProcessingResult> {
        self.results.read().await.get(video_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.results.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.results.read().await.is_empty()
    }
}

#[async_trait]
impl ResultSink for MemoryResultStore {
    async fn store(&self, video_id: &VideoId, result: &ProcessingResult) -> Result<(), SinkError> {
        self.results
            .write()
            .await
            .insert(video_id.clone(), result.clone());
        Ok(())
    }
}

/// Manifest written next to the clips of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipManifest {
    pub video_id: VideoId,
    pub video_info: MediaMetadata,
    pub clips: Vec<ClipView>,
    pub generated_at: DateTime<Utc>,
}

/// Writes `manifest.json` into the video's output directory.
pub struct JsonManifestSink {
    layout: LocalOutputLayout,
}

impl JsonManifestSink {
    pub const FILE_NAME: &'static str = "manifest.json";

    pub fn new(layout: LocalOutputLayout) -> Self {
        Self { layout }
    }

    pub fn manifest_path(&self, video_id: &VideoId) -> PathBuf {
        self.layout.video_dir(video_id).join(Self::FILE_NAME)
    }
}

#[async_trait]
impl ResultSink for JsonManifestSink {
    async fn store(&self, video_id: &VideoId, result: &ProcessingResult) -> Result<(), SinkError> {
        let locate = |p: &Path| self.layout.retrieval_url(p);
        let manifest = ClipManifest {
            video_id: video_id.clone(),
            video_info: result.metadata.clone(),
            clips: result
                .clips
                .iter()
                .map(|c| ClipView::from_descriptor(c, &locate))
                .collect(),
            generated_at: Utc::now(),
        };

        let path = self.manifest_path(video_id);
        let staged = temp_sibling(&path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&staged, serde_json::to_vec_pretty(&manifest)?).await?;
        move_file(&staged, &path).await?;

        tracing::debug!(video_id = %video_id, path = %path.display(), "Manifest written");
        Ok(())
    }
}
