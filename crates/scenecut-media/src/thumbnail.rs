//! Thumbnail generation.

use std::path::Path;
use tracing::debug;

use crate::clip::{render_atomically, runner_with_timeout};
use crate::command::FfmpegCommand;
use crate::error::ExtractionError;

/// Grab a single frame of `input` at `at_ms` and write it to `output`,
/// scaled to `width` pixels wide with the aspect ratio kept.
pub async fn generate_thumbnail(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    at_ms: u64,
    width: u32,
    timeout_secs: Option<u64>,
) -> Result<(), ExtractionError> {
    let input = input.as_ref();
    let output = output.as_ref();

    let runner = runner_with_timeout(timeout_secs);
    render_atomically(
        output,
        |target| thumbnail_command(input, target, at_ms, width),
        |cmd| async move { runner.run(&cmd).await },
    )
    .await?;

    debug!("Thumbnail written: {} (at {}ms)", output.display(), at_ms);
    Ok(())
}

/// Build the single-frame command.
pub fn thumbnail_command(input: &Path, output: &Path, at_ms: u64, width: u32) -> FfmpegCommand {
    // -2 keeps the height even, which most encoders require
    FfmpegCommand::new(input, output)
        .seek_ms(at_ms)
        .single_frame()
        .video_filter(format!("scale={}:-2", width))
        .output_arg("-q:v")
        .output_arg("3")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_command() {
        let args = thumbnail_command(Path::new("in.mp4"), Path::new("t.jpg"), 1000, 480).build_args();
        assert!(args.windows(2).any(|w| w == ["-ss", "1.000"]));
        assert!(args.windows(2).any(|w| w == ["-vf", "scale=480:-2"]));
        assert!(args.windows(2).any(|w| w == ["-vframes", "1"]));
    }
}
