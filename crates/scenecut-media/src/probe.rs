//! FFprobe metadata extraction.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult, ProbeError};
use scenecut_models::MediaMetadata;

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// Probe a source file for duration, codec label and resolution.
///
/// A missing file, a file without a video stream or output FFprobe cannot
/// describe all surface as [`ProbeError`]. Nothing is retried.
pub async fn probe_metadata(path: impl AsRef<Path>) -> Result<MediaMetadata, ProbeError> {
    let path = path.as_ref();
    let metadata = run_ffprobe(path).await?;
    debug!(
        path = %path.display(),
        duration_ms = metadata.duration_ms,
        codec = %metadata.codec,
        resolution = %metadata.resolution,
        "Probed source"
    );
    Ok(metadata)
}

async fn run_ffprobe(path: &Path) -> MediaResult<MediaMetadata> {
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            stderr: None,
        });
    }

    parse_probe_output(&output.stdout)
}

/// Turn FFprobe's JSON report into [`MediaMetadata`].
pub fn parse_probe_output(json: &[u8]) -> MediaResult<MediaMetadata> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| MediaError::invalid_video("No video stream found"))?;

    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(MediaError::invalid_video("Video stream has no resolution")),
    };

    // Container duration first, stream duration as fallback
    let duration_secs = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| MediaError::invalid_video("Duration missing or unparsable"))?;

    let codec = video
        .codec_name
        .clone()
        .ok_or_else(|| MediaError::invalid_video("Video codec unknown"))?;

    let label = match probe
        .format
        .as_ref()
        .and_then(|f| f.format_name.as_deref())
        .and_then(|n| n.split(',').next())
    {
        Some(container) if !container.is_empty() => format!("{}/{}", container, codec),
        _ => codec,
    };

    Ok(MediaMetadata::new(
        (duration_secs * 1000.0).round() as u64,
        label,
        width,
        height,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MP4_REPORT: &str = r#"{
        "streams": [
            {"codec_type": "audio", "codec_name": "aac"},
            {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080}
        ],
        "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "10.000000"}
    }"#;

    #[test]
    fn test_parse_probe_output() {
        let meta = parse_probe_output(MP4_REPORT.as_bytes()).unwrap();
        assert_eq!(meta.duration_ms, 10_000);
        assert_eq!(meta.codec, "mov/h264");
        assert_eq!(meta.resolution.width, 1920);
        assert_eq!(meta.resolution.height, 1080);
    }

    #[test]
    fn test_stream_duration_fallback() {
        let json = r#"{
            "streams": [{"codec_type": "video", "codec_name": "vp9", "width": 640, "height": 360, "duration": "2.5"}],
            "format": {"format_name": "matroska,webm"}
        }"#;
        let meta = parse_probe_output(json.as_bytes()).unwrap();
        assert_eq!(meta.duration_ms, 2500);
        assert_eq!(meta.codec, "matroska/vp9");
    }

    #[test]
    fn test_audio_only_is_rejected() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "3.0"}}"#;
        let err = parse_probe_output(json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("No video stream"));
    }

    #[test]
    fn test_missing_duration_is_rejected() {
        let json = r#"{"streams": [{"codec_type": "video", "codec_name": "h264", "width": 2, "height": 2}], "format": {"duration": "N/A"}}"#;
        assert!(parse_probe_output(json.as_bytes()).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            parse_probe_output(b"not json"),
            Err(MediaError::JsonParse(_))
        ));
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let err = probe_metadata("/definitely/not/here.mp4").await.unwrap_err();
        assert!(err.message.contains("File not found"));
    }
}
