//! FFmpeg CLI wrapper for scene detection and clip extraction.
//!
//! This crate provides:
//! - Source probing via `ffprobe`
//! - Threshold scene detection via FFmpeg's scene score
//! - Re-encoded clip extraction and thumbnail capture
//! - The [`MediaToolkit`] trait the engine is written against

pub mod clip;
pub mod command;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod scene;
pub mod thumbnail;
pub mod toolkit;

pub use clip::extract_clip;
pub use command::{FfmpegCommand, FfmpegRunner};
pub use error::{DetectionError, ExtractionError, MediaError, MediaResult, ProbeError};
pub use probe::probe_metadata;
pub use progress::FfmpegProgress;
pub use scene::{detect_scenes, validate_threshold, DEFAULT_THRESHOLD};
pub use thumbnail::generate_thumbnail;
pub use toolkit::{FfmpegToolkit, MediaToolkit};
