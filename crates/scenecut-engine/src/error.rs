//! Engine error types.

use thiserror::Error;

use scenecut_media::{DetectionError, ExtractionError, MediaError, ProbeError};
use scenecut_models::VideoId;

pub type EngineResult<T> = Result<T, EngineError>;

/// A result sink refused or failed to store a finished run.
#[derive(Debug, Clone, Error)]
#[error("Result sink failed: {message}")]
pub struct SinkError {
    pub message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<MediaError> for SinkError {
    fn from(err: MediaError) -> Self {
        Self::new(err.to_string())
    }
}

/// Anything that ends a run in `Failed`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl PipelineError {
    /// Short stage name for metrics labels.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Probe(_) => "probe",
            PipelineError::Detection(_) => "detection",
            PipelineError::Extraction(_) => "extraction",
            PipelineError::Sink(_) => "sink",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("A run for video {0} is already in progress")]
    AlreadyRunning(VideoId),

    #[error("No run recorded for video {0}")]
    NotFound(VideoId),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Invalid processing options: {0}")]
    InvalidOptions(String),
}

impl EngineError {
    pub fn invalid_options(msg: impl Into<String>) -> Self {
        Self::InvalidOptions(msg.into())
    }

    /// Whether the start was refused because a run is active.
    pub fn is_already_running(&self) -> bool {
        matches!(self, EngineError::Registry(RegistryError::AlreadyRunning(_)))
    }
}
