//! Shared data models for the SceneCut engine.
//!
//! This crate provides Serde-serializable types for:
//! - Source videos and probed media metadata
//! - Scene boundaries and clip descriptors
//! - Run phases, job records and progress events
//! - Clip encoding configuration
//! - Outbound status message schemas

pub mod clip;
pub mod encoding;
pub mod job;
pub mod progress;
pub mod video;
pub mod ws;

// Re-export common types
pub use clip::{ClipDescriptor, SceneBoundary};
pub use encoding::EncodingConfig;
pub use job::{JobPhase, JobRecord, ProcessingResult};
pub use progress::ProgressEvent;
pub use video::{MediaMetadata, Resolution, VideoId, VideoSource};
pub use ws::{ClipView, StatusKind, StatusMessage, VideoInfoView};
