//! Process a single video end to end and print every status message as a
//! JSON line.
//!
//! Usage: `scenecut <video> [threshold]`

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use scenecut_engine::{EngineConfig, ProcessingEngine, ProcessingOptions};
use scenecut_models::{JobPhase, StatusKind, VideoId, VideoSource};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    match run().await {
        Ok(JobPhase::Completed) => {}
        Ok(phase) => {
            error!("Run ended in phase {}", phase.as_str());
            std::process::exit(1);
        }
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(2);
        }
    }
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`. Logs go to stderr so
/// stdout carries only status messages.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("scenecut_engine=info,scenecut_media=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true),
            )
            .with(env_filter)
            .init();
    }
}

async fn run() -> Result<JobPhase> {
    let mut args = std::env::args().skip(1);
    let Some(path) = args.next().map(PathBuf::from) else {
        bail!("usage: scenecut <video> [threshold]");
    };
    let options = match args.next() {
        Some(raw) => ProcessingOptions::with_threshold(
            raw.parse()
                .with_context(|| format!("threshold must be a number, got {:?}", raw))?,
        ),
        None => ProcessingOptions::default(),
    };

    let metadata = tokio::fs::metadata(&path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let source = VideoSource::new(VideoId::new(), path.clone(), metadata.len(), filename);

    let config = EngineConfig::from_env();
    info!(output_dir = %config.output_dir.display(), "Starting scenecut");
    let engine = ProcessingEngine::from_config(config);

    // Subscribe first so no milestone is missed
    let mut subscription = engine.subscribe(&source.id).await;
    let video_id = source.id.clone();
    engine
        .start_processing(source, options)
        .await
        .context("failed to start processing")?;

    while let Some(message) = subscription.recv().await {
        println!("{}", message.to_json()?);
        if matches!(message.status, StatusKind::Completed | StatusKind::Error) {
            break;
        }
    }
    engine.unsubscribe(&subscription.handle()).await;

    let record = engine.get_status(&video_id).await?;
    Ok(record.phase)
}
