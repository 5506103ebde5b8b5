//! Progress events emitted at each pipeline milestone.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{ClipDescriptor, JobPhase, MediaMetadata, ProcessingResult};

/// Snapshot of a run at one milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressEvent {
    pub phase: JobPhase,
    /// Progress percentage (0-100)
    pub progress: u8,
    pub stage: String,
    /// Clips extracted so far (full list on completion)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clips: Option<Vec<ClipDescriptor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MediaMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(phase: JobPhase, progress: u8, stage: impl Into<String>) -> Self {
        Self {
            phase,
            progress: progress.min(100),
            stage: stage.into(),
            clips: None,
            metadata: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_clips(mut self, clips: Vec<ClipDescriptor>) -> Self {
        self.clips = Some(clips);
        self
    }

    pub fn with_metadata(mut self, metadata: MediaMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Terminal success event carrying the full result.
    pub fn completed(result: ProcessingResult) -> Self {
        let stage = format!("Completed: {} clips", result.clips.len());
        Self::new(JobPhase::Completed, 100, stage)
            .with_metadata(result.metadata)
            .with_clips(result.clips)
    }

    /// Terminal failure event. Never carries clips.
    pub fn failed(message: impl Into<String>) -> Self {
        let mut event = Self::new(JobPhase::Failed, 0, "Failed");
        event.error = Some(message.into());
        event
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_clamped() {
        let event = ProgressEvent::new(JobPhase::Extracting, 250, "x");
        assert_eq!(event.progress, 100);
    }

    #[test]
    fn test_failed_event_has_no_clips() {
        let event = ProgressEvent::failed("Probe failed: no video stream");
        assert!(event.is_terminal());
        assert!(event.clips.is_none());
        assert_eq!(event.error.as_deref(), Some("Probe failed: no video stream"));
    }

    #[test]
    fn test_completed_event_carries_result() {
        let clip = ClipDescriptor::new(0, 0, 2000, "a.mp4", "a.jpg").unwrap();
        let event = ProgressEvent::completed(ProcessingResult {
            metadata: MediaMetadata::new(2000, "h264", 320, 240),
            clips: vec![clip],
        });
        assert_eq!(event.progress, 100);
        assert_eq!(event.clips.as_ref().map(Vec::len), Some(1));
        assert!(event.metadata.is_some());
    }
}
