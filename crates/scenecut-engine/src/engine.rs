//! Engine facade owning the registry, the broadcaster and the pipeline.

use async_trait::async_trait;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use scenecut_media::MediaToolkit;
use scenecut_models::{JobRecord, ProgressEvent, StatusMessage, VideoId, VideoSource};

use crate::broadcaster::{StatusBroadcaster, Subscription, SubscriptionHandle};
use crate::config::{EngineConfig, ProcessingOptions};
use crate::error::EngineResult;
use crate::metrics;
use crate::pipeline::{PipelineSettings, ProcessingPipeline};
use crate::ports::{JsonManifestSink, LocalOutputLayout, OutputResolver, ProgressSink, ResultSink};
use crate::registry::{JobHandle, JobRegistry, JobUpdater};

/// Entry point for boundary layers (HTTP handlers, CLIs).
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct ProcessingEngine {
    config: EngineConfig,
    registry: Arc<JobRegistry>,
    broadcaster: Arc<StatusBroadcaster>,
    pipeline: Arc<ProcessingPipeline>,
    resolver: Arc<dyn OutputResolver>,
}

impl ProcessingEngine {
    pub fn new(
        config: EngineConfig,
        toolkit: Arc<dyn MediaToolkit>,
        resolver: Arc<dyn OutputResolver>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        let pipeline = ProcessingPipeline::new(toolkit, resolver.clone(), sink)
            .with_settings(PipelineSettings::from(&config));
        Self {
            config,
            registry: Arc::new(JobRegistry::new()),
            broadcaster: Arc::new(StatusBroadcaster::new()),
            pipeline: Arc::new(pipeline),
            resolver,
        }
    }

    /// FFmpeg toolkit, local output layout and a JSON manifest per run.
    pub fn from_config(config: EngineConfig) -> Self {
        let layout = LocalOutputLayout::new(&config.output_dir, config.public_base_url.clone());
        let toolkit = Arc::new(config.toolkit());
        let sink = Arc::new(JsonManifestSink::new(layout.clone()));
        Self::new(config, toolkit, Arc::new(layout), sink)
    }

    /// Start processing `source`.
    ///
    /// Rejected with `AlreadyRunning` while a run for the same identity is
    /// active, and with `InvalidOptions` for a threshold outside (0, 1].
    pub async fn start_processing(
        &self,
        source: VideoSource,
        options: ProcessingOptions,
    ) -> EngineResult<JobHandle> {
        let threshold = options.resolve_threshold(&self.config)?;
        let video_id = source.id.clone();

        let pipeline = self.pipeline.clone();
        let broadcaster = self.broadcaster.clone();
        let resolver = self.resolver.clone();

        let started = self
            .registry
            .start(video_id.clone(), move |updater| async move {
                let reporter = RunReporter {
                    updater,
                    broadcaster,
                    resolver,
                };
                reporter.announce().await;

                let outcome = AssertUnwindSafe(pipeline.run(&source, threshold, &reporter))
                    .catch_unwind()
                    .await;
                match outcome {
                    Ok(Ok(result)) => metrics::record_run_completed(result.clips.len()),
                    Ok(Err(e)) => metrics::record_run_failed(e.stage()),
                    Err(_) => {
                        error!(video_id = %source.id, "Pipeline panicked");
                        reporter
                            .report(ProgressEvent::failed("Run aborted unexpectedly"))
                            .await;
                        metrics::record_run_failed("panic");
                    }
                }
            })
            .await;

        match started {
            Ok(handle) => {
                info!(video_id = %video_id, threshold, "Processing started");
                Ok(handle)
            }
            Err(e) => {
                metrics::record_start_rejected();
                warn!(video_id = %video_id, "Start rejected: {}", e);
                Err(e.into())
            }
        }
    }

    /// Latest record for `video_id`.
    pub async fn get_status(&self, video_id: &VideoId) -> EngineResult<JobRecord> {
        Ok(self.registry.get(video_id).await?)
    }

    /// Latest record for `video_id` in the outbound message shape.
    pub async fn status_message(&self, video_id: &VideoId) -> EngineResult<StatusMessage> {
        let record = self.get_status(video_id).await?;
        Ok(StatusMessage::from_record(&record, |p| self.retrieval_url(p)))
    }

    /// Receive every status message published for `video_id` from now on.
    pub async fn subscribe(&self, video_id: &VideoId) -> Subscription {
        self.broadcaster.subscribe(video_id).await
    }

    pub async fn unsubscribe(&self, handle: &SubscriptionHandle) {
        self.broadcaster.unsubscribe(handle).await;
    }

    pub fn retrieval_url(&self, path: &Path) -> String {
        self.resolver.retrieval_url(path)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn broadcaster(&self) -> &Arc<StatusBroadcaster> {
        &self.broadcaster
    }
}

/// Progress sink of one run: update the record, then notify subscribers.
struct RunReporter {
    updater: JobUpdater,
    broadcaster: Arc<StatusBroadcaster>,
    resolver: Arc<dyn OutputResolver>,
}

impl RunReporter {
    /// Publish the initial `pending` state.
    async fn announce(&self) {
        let record = self.updater.snapshot();
        let message = StatusMessage::from_record(&record, |p| self.resolver.retrieval_url(p));
        self.broadcaster.publish(self.updater.video_id(), message).await;
    }
}

#[async_trait]
impl ProgressSink for RunReporter {
    async fn report(&self, event: ProgressEvent) {
        let video_id = self.updater.video_id();

        // Subscribers must never see an event the record refused
        if !self.updater.apply(&event) {
            warn!(
                video_id = %video_id,
                phase = event.phase.as_str(),
                "Ignoring out-of-order progress event"
            );
            return;
        }

        let message = StatusMessage::from_event(video_id, &event, |p| self.resolver.retrieval_url(p));
        self.broadcaster.publish(video_id, message).await;
    }
}
