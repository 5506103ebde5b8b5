//! Single-flight run registry.
//!
//! Each video identity owns a `watch` channel holding its [`JobRecord`]. The
//! run task is the only writer; any number of readers take snapshots. The map
//! lock is held only to look up or insert a slot, never while a run works.
//!
//! An identity stays busy until its run task has exited, not merely until the
//! record turns terminal. The terminal event is published after it is applied
//! to the record, so releasing the identity earlier would let a restarted run
//! publish ahead of the previous run's final message.

use std::collections::HashMap;
use std::future::Future;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, warn};

use scenecut_models::{JobRecord, ProgressEvent, VideoId};

use crate::error::RegistryError;
use crate::metrics;

/// Write half of a run's record, handed to the run task.
#[derive(Debug, Clone)]
pub struct JobUpdater {
    video_id: VideoId,
    tx: watch::Sender<JobRecord>,
}

impl JobUpdater {
    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    /// Fold `event` into the record. Returns `false` if the record rejected it.
    pub fn apply(&self, event: &ProgressEvent) -> bool {
        self.tx.send_if_modified(|record| record.apply(event))
    }

    pub fn snapshot(&self) -> JobRecord {
        self.tx.borrow().clone()
    }
}

/// Read half returned to the caller of [`JobRegistry::start`].
#[derive(Debug, Clone)]
pub struct JobHandle {
    video_id: VideoId,
    rx: watch::Receiver<JobRecord>,
    finished: watch::Receiver<bool>,
}

impl JobHandle {
    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    /// Current state of the run.
    pub fn snapshot(&self) -> JobRecord {
        self.rx.borrow().clone()
    }

    /// Wait until the run task has exited and return its final record.
    ///
    /// Every message of the run has been published by then, and the identity
    /// accepts a new start.
    pub async fn wait(&mut self) -> JobRecord {
        // An Err means the registry dropped the slot; the record is final either way
        let _ = self.finished.wait_for(|done| *done).await;
        self.rx.borrow().clone()
    }
}

#[derive(Debug)]
struct RunSlot {
    record: watch::Sender<JobRecord>,
    finished: watch::Sender<bool>,
}

impl RunSlot {
    fn is_busy(&self) -> bool {
        !*self.finished.borrow()
    }
}

/// At most one active run per video identity.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<VideoId, RunSlot>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run for `video_id` unless one is already active.
    ///
    /// On acceptance the previous record is replaced by a fresh `Pending`
    /// record and `runner` is spawned with the record's write half. A rejected
    /// start has no side effects.
    ///
    /// If the runner returns or panics without reaching a terminal phase, the
    /// record is marked `Failed` so the identity never stays locked.
    pub async fn start<F, Fut>(&self, video_id: VideoId, runner: F) -> Result<JobHandle, RegistryError>
    where
        F: FnOnce(JobUpdater) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (record, finished) = {
            let mut jobs = self.jobs.write().await;
            if jobs.get(&video_id).is_some_and(RunSlot::is_busy) {
                return Err(RegistryError::AlreadyRunning(video_id));
            }
            let (record, _) = watch::channel(JobRecord::pending(video_id.clone()));
            let (finished, _) = watch::channel(false);
            jobs.insert(
                video_id.clone(),
                RunSlot {
                    record: record.clone(),
                    finished: finished.clone(),
                },
            );
            (record, finished)
        };

        let handle = JobHandle {
            video_id: video_id.clone(),
            rx: record.subscribe(),
            finished: finished.subscribe(),
        };
        let updater = JobUpdater {
            video_id: video_id.clone(),
            tx: record,
        };

        // Counted before the task exists so the gauge never dips below zero
        metrics::record_run_started();

        let run = tokio::spawn(runner(updater.clone()));
        tokio::spawn(async move {
            let outcome = run.await;
            if !updater.snapshot().is_terminal() {
                let message = match outcome {
                    Ok(()) => "Run ended without reaching a terminal state".to_string(),
                    Err(e) => {
                        error!(video_id = %updater.video_id(), "Run task aborted: {}", e);
                        "Run aborted unexpectedly".to_string()
                    }
                };
                warn!(video_id = %updater.video_id(), "{}", message);
                updater.apply(&ProgressEvent::failed(message));
                metrics::record_run_failed("aborted");
            }
            metrics::record_run_finished();
            finished.send_replace(true);
        });

        debug!(video_id = %video_id, "Run accepted");
        Ok(handle)
    }

    /// Snapshot of the latest record for `video_id`.
    pub async fn get(&self, video_id: &VideoId) -> Result<JobRecord, RegistryError> {
        let jobs = self.jobs.read().await;
        jobs.get(video_id)
            .map(|slot| slot.record.borrow().clone())
            .ok_or_else(|| RegistryError::NotFound(video_id.clone()))
    }

    /// Whether a run for `video_id` is still in flight.
    pub async fn is_active(&self, video_id: &VideoId) -> bool {
        self.jobs
            .read()
            .await
            .get(video_id)
            .is_some_and(RunSlot::is_busy)
    }

    /// Number of runs still in flight.
    pub async fn active_count(&self) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|slot| slot.is_busy())
            .count()
    }
}
