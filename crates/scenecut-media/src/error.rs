//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for low-level media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors raised while driving FFmpeg / FFprobe.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an invalid video error.
    pub fn invalid_video(message: impl Into<String>) -> Self {
        Self::InvalidVideo(message.into())
    }
}

/// Source could not be read or its metadata could not be parsed.
#[derive(Debug, Clone, Error)]
#[error("Probe failed: {message}")]
pub struct ProbeError {
    pub message: String,
}

impl ProbeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<MediaError> for ProbeError {
    fn from(err: MediaError) -> Self {
        Self::new(err.to_string())
    }
}

/// Scene scan failed or found nothing.
#[derive(Debug, Clone, Error)]
pub enum DetectionError {
    #[error("Scene detection failed: {0}")]
    Scan(String),

    #[error("Scene detection found no scene boundaries")]
    NoBoundaries,

    #[error("Invalid detection threshold {0}: must be in (0, 1]")]
    InvalidThreshold(f64),
}

impl From<MediaError> for DetectionError {
    fn from(err: MediaError) -> Self {
        Self::Scan(err.to_string())
    }
}

/// A clip or thumbnail could not be produced.
#[derive(Debug, Clone, Error)]
#[error("Extraction failed: {message}")]
pub struct ExtractionError {
    pub message: String,
}

impl ExtractionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<MediaError> for ExtractionError {
    fn from(err: MediaError) -> Self {
        Self::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_errors_keep_media_message() {
        let probe: ProbeError = MediaError::invalid_video("No video stream found").into();
        assert_eq!(probe.to_string(), "Probe failed: Invalid video file: No video stream found");

        let detect: DetectionError = MediaError::Timeout(30).into();
        assert_eq!(
            detect.to_string(),
            "Scene detection failed: Operation timed out after 30 seconds"
        );

        let extract: ExtractionError = MediaError::ffmpeg_failed("exit 1", None, Some(1)).into();
        assert_eq!(extract.to_string(), "Extraction failed: FFmpeg command failed: exit 1");
    }
}
