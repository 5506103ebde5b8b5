//! Run-scoped structured logging.

use tracing::{error, info, warn, Span};

use scenecut_models::VideoId;

/// Logger carrying the video identity and operation of one run.
#[derive(Debug, Clone)]
pub struct RunLogger {
    video_id: String,
    operation: String,
}

impl RunLogger {
    pub fn new(video_id: &VideoId, operation: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Run started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Run progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Run warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Run failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Run completed: {}", message
        );
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span that every log line of the run is recorded under.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "run",
            video_id = %self.video_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_logger() {
        let logger = RunLogger::new(&VideoId::from("video-123"), "scene_pipeline");
        assert_eq!(logger.video_id(), "video-123");
        assert_eq!(logger.operation(), "scene_pipeline");

        // No subscriber installed; logging must still be a no-op rather than panic
        logger.log_progress("Detecting scenes");
        let _guard = logger.create_span().entered();
    }
}
