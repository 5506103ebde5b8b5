//! Outbound status messages pushed to observers.
//!
//! These are the payloads a boundary layer forwards over WebSocket / SSE.
//! Field names are camelCase to match the browser client.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{ClipDescriptor, JobPhase, JobRecord, MediaMetadata, ProgressEvent, VideoId};

/// Coarse status exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Pending,
    Processing,
    Completed,
    Error,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Pending => "pending",
            StatusKind::Processing => "processing",
            StatusKind::Completed => "completed",
            StatusKind::Error => "error",
        }
    }
}

impl From<JobPhase> for StatusKind {
    fn from(phase: JobPhase) -> Self {
        match phase {
            JobPhase::Pending => StatusKind::Pending,
            JobPhase::Probing | JobPhase::Detecting | JobPhase::Extracting => StatusKind::Processing,
            JobPhase::Completed => StatusKind::Completed,
            JobPhase::Failed => StatusKind::Error,
        }
    }
}

/// Clip entry as seen by clients. Times are milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClipView {
    pub scene_index: u32,
    pub start_time: u64,
    pub end_time: u64,
    pub duration: u64,
    pub clip_url: String,
    pub thumbnail_url: String,
}

impl ClipView {
    pub fn from_descriptor<F>(clip: &ClipDescriptor, locate: &F) -> Self
    where
        F: Fn(&Path) -> String,
    {
        Self {
            scene_index: clip.scene_index,
            start_time: clip.start_ms,
            end_time: clip.end_ms,
            duration: clip.duration_ms(),
            clip_url: locate(&clip.clip_path),
            thumbnail_url: locate(&clip.thumbnail_path),
        }
    }
}

/// Media information as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfoView {
    /// Duration in milliseconds
    pub duration: u64,
    pub codec: String,
    pub width: u32,
    pub height: u32,
}

impl From<&MediaMetadata> for VideoInfoView {
    fn from(meta: &MediaMetadata) -> Self {
        Self {
            duration: meta.duration_ms,
            codec: meta.codec.clone(),
            width: meta.resolution.width,
            height: meta.resolution.height,
        }
    }
}

/// One push per progress milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    pub video_id: VideoId,
    pub status: StatusKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clips: Option<Vec<ClipView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_info: Option<VideoInfoView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusMessage {
    /// Build the push payload for a live event.
    ///
    /// `locate` maps an on-disk clip / thumbnail path to its retrieval URL.
    pub fn from_event<F>(video_id: &VideoId, event: &ProgressEvent, locate: F) -> Self
    where
        F: Fn(&Path) -> String,
    {
        let status = StatusKind::from(event.phase);
        if status == StatusKind::Error {
            return Self::error(video_id, event.error.clone().unwrap_or_default());
        }

        Self {
            video_id: video_id.clone(),
            status,
            progress: Some(event.progress),
            stage: Some(event.stage.clone()),
            clips: event
                .clips
                .as_ref()
                .map(|clips| clips.iter().map(|c| ClipView::from_descriptor(c, &locate)).collect()),
            video_info: event.metadata.as_ref().map(VideoInfoView::from),
            error: None,
        }
    }

    /// Build the same payload shape from a polled record.
    pub fn from_record<F>(record: &JobRecord, locate: F) -> Self
    where
        F: Fn(&Path) -> String,
    {
        let status = StatusKind::from(record.phase);
        if status == StatusKind::Error {
            return Self::error(&record.video_id, record.error.clone().unwrap_or_default());
        }

        let clips = match &record.result {
            Some(result) => &result.clips,
            None => &record.clips,
        };

        Self {
            video_id: record.video_id.clone(),
            status,
            progress: Some(record.progress),
            stage: Some(record.stage.clone()),
            clips: (!clips.is_empty() || status == StatusKind::Completed)
                .then(|| clips.iter().map(|c| ClipView::from_descriptor(c, &locate)).collect()),
            video_info: record.metadata.as_ref().map(VideoInfoView::from),
            error: None,
        }
    }

    /// Terminal error payload. Carries no clips.
    pub fn error(video_id: &VideoId, message: impl Into<String>) -> Self {
        Self {
            video_id: video_id.clone(),
            status: StatusKind::Error,
            progress: None,
            stage: None,
            clips: None,
            video_info: None,
            error: Some(message.into()),
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProcessingResult;

    fn locate(path: &Path) -> String {
        format!("/media/{}", path.display())
    }

    #[test]
    fn test_completed_message_shape() {
        let video_id = VideoId::from("v1");
        let event = ProgressEvent::completed(ProcessingResult {
            metadata: MediaMetadata::new(10_000, "h264", 1280, 720),
            clips: vec![
                ClipDescriptor::new(0, 0, 2000, "clip_0.mp4", "thumb_0.jpg").unwrap(),
                ClipDescriptor::new(1, 2300, 7000, "clip_1.mp4", "thumb_1.jpg").unwrap(),
            ],
        });

        let msg = StatusMessage::from_event(&video_id, &event, locate);
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();

        assert_eq!(json["videoId"], "v1");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["progress"], 100);
        assert_eq!(json["videoInfo"]["duration"], 10_000);
        assert_eq!(json["clips"][1]["sceneIndex"], 1);
        assert_eq!(json["clips"][1]["startTime"], 2300);
        assert_eq!(json["clips"][1]["endTime"], 7000);
        assert_eq!(json["clips"][1]["duration"], 4700);
        assert_eq!(json["clips"][1]["clipUrl"], "/media/clip_1.mp4");
        assert_eq!(json["clips"][1]["thumbnailUrl"], "/media/thumb_1.jpg");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_error_message_has_no_clips() {
        let video_id = VideoId::from("v1");
        let msg = StatusMessage::from_event(&video_id, &ProgressEvent::failed("No scenes detected"), locate);
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "No scenes detected");
        assert!(json.get("clips").is_none());
    }

    #[test]
    fn test_phase_to_status_mapping() {
        assert_eq!(StatusKind::from(JobPhase::Pending), StatusKind::Pending);
        assert_eq!(StatusKind::from(JobPhase::Detecting), StatusKind::Processing);
        assert_eq!(StatusKind::from(JobPhase::Failed), StatusKind::Error);
    }

    #[test]
    fn test_from_pending_record() {
        let record = JobRecord::pending(VideoId::from("v2"));
        let msg = StatusMessage::from_record(&record, locate);
        assert_eq!(msg.status, StatusKind::Pending);
        assert_eq!(msg.progress, Some(0));
        assert!(msg.clips.is_none());
    }
}
