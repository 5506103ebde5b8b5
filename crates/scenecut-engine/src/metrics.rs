//! Engine metrics.
//!
//! Recorded through the `metrics` facade; installing an exporter is left to
//! the embedding process. Without one every call is a no-op.

use metrics::{counter, gauge};

/// Metric names as constants for consistency.
pub mod names {
    pub const RUNS_STARTED_TOTAL: &str = "scenecut_runs_started_total";
    pub const RUNS_COMPLETED_TOTAL: &str = "scenecut_runs_completed_total";
    pub const RUNS_FAILED_TOTAL: &str = "scenecut_runs_failed_total";
    pub const RUNS_ACTIVE: &str = "scenecut_runs_active";
    pub const START_REJECTIONS_TOTAL: &str = "scenecut_start_rejections_total";

    pub const CLIPS_EXTRACTED_TOTAL: &str = "scenecut_clips_extracted_total";
    pub const SCENES_DISCARDED_TOTAL: &str = "scenecut_scenes_discarded_total";
}

/// A run was accepted.
pub fn record_run_started() {
    counter!(names::RUNS_STARTED_TOTAL).increment(1);
    gauge!(names::RUNS_ACTIVE).increment(1.0);
}

/// A run task exited, whatever its outcome.
pub fn record_run_finished() {
    gauge!(names::RUNS_ACTIVE).decrement(1.0);
}

/// A run reached `Completed`.
pub fn record_run_completed(clip_count: usize) {
    counter!(names::RUNS_COMPLETED_TOTAL).increment(1);
    counter!(names::CLIPS_EXTRACTED_TOTAL).increment(clip_count as u64);
}

/// A run reached `Failed` during `stage`.
pub fn record_run_failed(stage: &'static str) {
    counter!(names::RUNS_FAILED_TOTAL, "stage" => stage).increment(1);
}

/// A start was refused because a run for the identity is active.
pub fn record_start_rejected() {
    counter!(names::START_REJECTIONS_TOTAL).increment(1);
}

/// A candidate scene was shorter than the minimum and dropped.
pub fn record_scene_discarded() {
    counter!(names::SCENES_DISCARDED_TOTAL).increment(1);
}
