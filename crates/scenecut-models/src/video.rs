//! Source video and probed media models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Opaque identity of an uploaded video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An uploaded video as handed over by the storage layer.
///
/// Immutable once created; a run only borrows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VideoSource {
    /// Video identity
    pub id: VideoId,
    /// Location of the uploaded file on disk
    pub path: PathBuf,
    /// Declared size in bytes
    pub size_bytes: u64,
    /// Filename as uploaded by the user
    pub original_filename: String,
}

impl VideoSource {
    pub fn new(
        id: impl Into<VideoId>,
        path: impl Into<PathBuf>,
        size_bytes: u64,
        original_filename: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            size_bytes,
            original_filename: original_filename.into(),
        }
    }
}

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Media information produced once per run by the probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MediaMetadata {
    /// Total duration in milliseconds
    pub duration_ms: u64,
    /// Container / codec label, first container name then codec (e.g. "mov/h264")
    pub codec: String,
    /// Video resolution
    pub resolution: Resolution,
}

impl MediaMetadata {
    pub fn new(duration_ms: u64, codec: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            duration_ms,
            codec: codec.into(),
            resolution: Resolution { width, height },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_roundtrip() {
        let id = VideoId::from("abc-123");
        assert_eq!(id.as_str(), "abc-123");
        assert_eq!(id.to_string(), "abc-123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc-123\"");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(VideoId::new(), VideoId::new());
    }

    #[test]
    fn test_resolution_display() {
        let meta = MediaMetadata::new(10_000, "h264", 1920, 1080);
        assert_eq!(meta.resolution.to_string(), "1920x1080");
    }
}
