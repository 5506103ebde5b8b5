//! Scene detection and clip extraction orchestration.
//!
//! A [`ProcessingEngine`] accepts uploaded videos, runs each through the
//! probe / detect / extract [`pipeline`], keeps one [`JobRecord`] per video
//! identity in the [`registry`] and fans status messages out through the
//! [`broadcaster`].
//!
//! [`JobRecord`]: scenecut_models::JobRecord

pub mod broadcaster;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod ports;
pub mod registry;

pub use broadcaster::{StatusBroadcaster, Subscription, SubscriptionHandle};
pub use config::{EngineConfig, ProcessingOptions};
pub use engine::ProcessingEngine;
pub use error::{EngineError, EngineResult, PipelineError, RegistryError, SinkError};
pub use logging::RunLogger;
pub use pipeline::{PipelineSettings, ProcessingPipeline};
pub use ports::{
    JsonManifestSink, LocalOutputLayout, MemoryResultStore, OutputResolver, ProgressSink, ResultSink,
};
pub use registry::{JobHandle, JobRegistry, JobUpdater};
