//! Clip extraction.
//!
//! Clips are always re-encoded. Stream copy would cut on the nearest
//! preceding keyframe, so a copied clip could start with frames from the
//! previous scene or with a frozen picture.

use std::path::Path;
use tracing::{debug, info, trace};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{ExtractionError, MediaError, MediaResult};
use crate::fs_utils::{ensure_parent, move_file, remove_if_exists, temp_sibling};
use scenecut_models::EncodingConfig;

/// Extract `[start_ms, end_ms)` of `input` into a standalone file at `output`.
///
/// FFmpeg writes into a temporary sibling of `output`, which is renamed into
/// place only on success. On failure nothing is left under `output`.
pub async fn extract_clip(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    start_ms: u64,
    end_ms: u64,
    encoding: &EncodingConfig,
    timeout_secs: Option<u64>,
) -> Result<(), ExtractionError> {
    let input = input.as_ref();
    let output = output.as_ref();

    if end_ms <= start_ms {
        return Err(MediaError::InvalidArgument(format!(
            "clip end {}ms must be after start {}ms",
            end_ms, start_ms
        ))
        .into());
    }
    let duration_ms = end_ms - start_ms;

    info!(
        "Extracting clip: {} -> {} ({}ms..{}ms)",
        input.display(),
        output.display(),
        start_ms,
        end_ms
    );

    let runner = runner_with_timeout(timeout_secs);
    let build = |target: &Path| clip_command(input, target, start_ms, duration_ms, encoding);

    render_atomically(output, build, |cmd| async move {
        runner
            .run_with_progress(&cmd, move |p| {
                trace!(percent = p.percentage(duration_ms), speed = p.speed, "Clip encode progress");
            })
            .await
    })
    .await?;

    debug!("Clip written: {}", output.display());
    Ok(())
}

/// Build the re-encoding command for one clip.
pub fn clip_command(
    input: &Path,
    output: &Path,
    start_ms: u64,
    duration_ms: u64,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .seek_ms(start_ms)
        .duration_ms(duration_ms)
        .video_codec(&encoding.codec)
        .preset(&encoding.preset)
        .crf(encoding.crf)
        .audio_codec(&encoding.audio_codec)
        .audio_bitrate(&encoding.audio_bitrate)
        .output_args(["-avoid_negative_ts", "make_zero", "-movflags", "+faststart"])
}

pub(crate) fn runner_with_timeout(timeout_secs: Option<u64>) -> FfmpegRunner {
    match timeout_secs {
        Some(secs) => FfmpegRunner::new().with_timeout(secs),
        None => FfmpegRunner::new(),
    }
}

/// Run the command produced by `build` against a temporary sibling of
/// `output`, then move the result into place.
pub(crate) async fn render_atomically<B, R, Fut>(output: &Path, build: B, run: R) -> MediaResult<()>
where
    B: FnOnce(&Path) -> FfmpegCommand,
    R: FnOnce(FfmpegCommand) -> Fut,
    Fut: std::future::Future<Output = MediaResult<()>>,
{
    ensure_parent(output).await?;

    let tmp = temp_sibling(output);
    let cmd = build(&tmp);

    if let Err(e) = run(cmd).await {
        remove_if_exists(&tmp).await;
        return Err(e);
    }

    if !tmp.exists() {
        return Err(MediaError::ffmpeg_failed(
            "FFmpeg exited cleanly but produced no output",
            None,
            Some(0),
        ));
    }

    if let Err(e) = move_file(&tmp, output).await {
        remove_if_exists(&tmp).await;
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_clip_command_reencodes() {
        let cmd = clip_command(
            Path::new("in.mp4"),
            Path::new(".clip_0.partial.mp4"),
            2300,
            4700,
            &EncodingConfig::default(),
        );
        let args = cmd.build_args();

        assert!(args.windows(2).any(|w| w == ["-ss", "2.300"]));
        assert!(args.windows(2).any(|w| w == ["-t", "4.700"]));
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert!(!args.iter().any(|a| a == "copy"));
        assert_eq!(args.last().unwrap(), ".clip_0.partial.mp4");
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected() {
        let err = extract_clip("in.mp4", "out.mp4", 5000, 5000, &EncodingConfig::default(), None)
            .await
            .unwrap_err();
        assert!(err.message.contains("must be after start"));
    }

    #[tokio::test]
    async fn test_render_atomically_publishes_on_success() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("v1").join("clip_0.mp4");

        render_atomically(
            &output,
            |tmp| FfmpegCommand::new("in.mp4", tmp),
            |_cmd| {
                let tmp = temp_sibling(&output);
                async move {
                    tokio::fs::write(&tmp, b"encoded").await.map_err(MediaError::from)?;
                    Ok::<(), MediaError>(())
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(tokio::fs::read(&output).await.unwrap(), b"encoded");
        assert!(!temp_sibling(&output).exists());
    }

    #[tokio::test]
    async fn test_render_atomically_leaves_nothing_on_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let output: PathBuf = dir.path().join("clip_0.mp4");

        let result = render_atomically(
            &output,
            |tmp| FfmpegCommand::new("in.mp4", tmp),
            |_cmd| {
                let tmp = temp_sibling(&output);
                async move {
                    // Half-written file, then a crash
                    tokio::fs::write(&tmp, b"trunc").await.map_err(MediaError::from)?;
                    Err::<(), _>(MediaError::ffmpeg_failed("killed", None, Some(137)))
                }
            },
        )
        .await;

        assert!(result.is_err());
        assert!(!output.exists());
        assert!(!temp_sibling(&output).exists());
    }
}
