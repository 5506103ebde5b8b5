//! Run phases and the per-video job record.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ClipDescriptor, MediaMetadata, ProgressEvent, VideoId};

/// Phase of a processing run.
///
/// `Pending -> Probing -> Detecting -> Extracting -> Completed`, with `Failed`
/// reachable from every non-terminal phase.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// Run registered, no work started yet
    #[default]
    Pending,
    /// Reading media metadata
    Probing,
    /// Scanning for scene boundaries
    Detecting,
    /// Materializing clips and thumbnails
    Extracting,
    /// Run finished with a full result
    Completed,
    /// Run aborted with an error
    Failed,
}

impl JobPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Pending => "pending",
            JobPhase::Probing => "probing",
            JobPhase::Detecting => "detecting",
            JobPhase::Extracting => "extracting",
            JobPhase::Completed => "completed",
            JobPhase::Failed => "failed",
        }
    }

    /// Check if this is a terminal phase (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Completed | JobPhase::Failed)
    }

    /// Whether a run may move from `self` to `next`.
    pub fn can_transition_to(&self, next: JobPhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            JobPhase::Failed => true,
            JobPhase::Pending => false,
            // Repeated events within a phase are allowed (per-scene progress).
            _ => next >= *self,
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final output of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProcessingResult {
    pub metadata: MediaMetadata,
    /// Clips ordered by `scene_index`
    pub clips: Vec<ClipDescriptor>,
}

/// Latest known state of the run for one video.
///
/// Written only by that video's run; read by any number of observers.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    pub video_id: VideoId,
    pub phase: JobPhase,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Human-readable stage label, e.g. "Extracting clip 3 of 7"
    pub stage: String,
    /// Clips extracted so far in the current run
    #[serde(default)]
    pub clips: Vec<ClipDescriptor>,
    /// Probed metadata, once known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MediaMetadata>,
    /// Error message if the run failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Full result once completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ProcessingResult>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Number of events applied (monotonically increasing)
    pub event_seq: u64,
}

impl JobRecord {
    /// Create a fresh `Pending` record for a new run.
    pub fn pending(video_id: VideoId) -> Self {
        let now = Utc::now();
        Self {
            video_id,
            phase: JobPhase::Pending,
            progress: 0,
            stage: "Queued".to_string(),
            clips: Vec::new(),
            metadata: None,
            error: None,
            result: None,
            started_at: now,
            updated_at: now,
            event_seq: 0,
        }
    }

    /// Check if the run has reached a terminal phase.
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Fold a progress event into the record.
    ///
    /// Returns `false` (leaving the record untouched) when the event would
    /// move the record backwards or mutate a terminal record.
    pub fn apply(&mut self, event: &ProgressEvent) -> bool {
        if !self.phase.can_transition_to(event.phase) {
            return false;
        }

        self.phase = event.phase;
        self.progress = event.progress.max(self.progress).min(100);
        self.stage = event.stage.clone();
        if let Some(clips) = &event.clips {
            self.clips = clips.clone();
        }
        if let Some(metadata) = &event.metadata {
            self.metadata = Some(metadata.clone());
        }

        match event.phase {
            JobPhase::Completed => {
                self.progress = 100;
                if let Some(metadata) = self.metadata.clone() {
                    self.result = Some(ProcessingResult {
                        metadata,
                        clips: self.clips.clone(),
                    });
                }
            }
            JobPhase::Failed => {
                // Failed runs never expose partial clips.
                self.clips.clear();
                self.error = event.error.clone();
            }
            _ => {}
        }

        self.updated_at = Utc::now();
        self.event_seq += 1;
        true
    }
}
