//! Scene boundaries and extracted clip descriptors.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Timestamp (milliseconds) where one scene ends and the next begins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct SceneBoundary(pub u64);

impl SceneBoundary {
    pub fn at_ms(ms: u64) -> Self {
        Self(ms)
    }

    pub fn as_ms(&self) -> u64 {
        self.0
    }
}

impl From<u64> for SceneBoundary {
    fn from(ms: u64) -> Self {
        Self(ms)
    }
}

/// A retained scene materialized as a clip and thumbnail.
///
/// `scene_index` counts retained clips only, so it stays contiguous even when
/// short candidates are discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClipDescriptor {
    /// Zero-based index among retained clips
    pub scene_index: u32,
    /// Start time in milliseconds (inclusive)
    pub start_ms: u64,
    /// End time in milliseconds (exclusive)
    pub end_ms: u64,
    /// Clip file on disk
    pub clip_path: PathBuf,
    /// Thumbnail file on disk
    pub thumbnail_path: PathBuf,
}

impl ClipDescriptor {
    /// Build a descriptor for `[start_ms, end_ms)`.
    ///
    /// Returns `None` when the range is empty or inverted.
    pub fn new(
        scene_index: u32,
        start_ms: u64,
        end_ms: u64,
        clip_path: impl Into<PathBuf>,
        thumbnail_path: impl Into<PathBuf>,
    ) -> Option<Self> {
        if end_ms <= start_ms {
            return None;
        }
        Some(Self {
            scene_index,
            start_ms,
            end_ms,
            clip_path: clip_path.into(),
            thumbnail_path: thumbnail_path.into(),
        })
    }

    /// Clip duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_duration() {
        let clip = ClipDescriptor::new(0, 2300, 7000, "c.mp4", "t.jpg").unwrap();
        assert_eq!(clip.duration_ms(), 4700);
    }

    #[test]
    fn test_rejects_empty_range() {
        assert!(ClipDescriptor::new(0, 500, 500, "c.mp4", "t.jpg").is_none());
        assert!(ClipDescriptor::new(0, 900, 500, "c.mp4", "t.jpg").is_none());
    }

    #[test]
    fn test_boundaries_order_by_time() {
        let mut b = vec![SceneBoundary(7000), SceneBoundary(0), SceneBoundary(2300)];
        b.sort();
        assert_eq!(b, vec![SceneBoundary(0), SceneBoundary(2300), SceneBoundary(7000)]);
    }
}
