//! End-to-end checks against real `ffmpeg` / `ffprobe` binaries.
//!
//! Run with `cargo test -p scenecut-media -- --ignored`.

use std::path::Path;
use std::process::Command;

use scenecut_media::{FfmpegToolkit, MediaToolkit};
use tempfile::TempDir;

/// Render a 4 second test video: 2s red, then 2s blue.
fn render_two_scene_video(path: &Path) {
    let status = Command::new("ffmpeg")
        .args([
            "-y", "-v", "error",
            "-f", "lavfi", "-i", "color=c=red:s=320x240:d=2:r=25",
            "-f", "lavfi", "-i", "color=c=blue:s=320x240:d=2:r=25",
            "-filter_complex", "[0:v][1:v]concat=n=2:v=1:a=0",
            "-c:v", "libx264", "-pix_fmt", "yuv420p",
        ])
        .arg(path)
        .status()
        .expect("ffmpeg should run");
    assert!(status.success());
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_probe_detect_extract() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("source.mp4");
    render_two_scene_video(&source);

    let toolkit = FfmpegToolkit::new().with_timeout(120);

    let meta = toolkit.probe(&source).await.unwrap();
    assert!((3900..=4100).contains(&meta.duration_ms));
    assert_eq!(meta.resolution.width, 320);
    assert!(meta.codec.ends_with("h264"));

    let boundaries = toolkit.detect(&source, 0.4).await.unwrap();
    assert_eq!(boundaries.len(), 1);
    assert!((1900..=2100).contains(&boundaries[0].as_ms()));

    let clip = dir.path().join("out").join("clip_0.mp4");
    toolkit.extract_clip(&source, &clip, 0, 2000).await.unwrap();
    assert!(clip.exists());

    let thumb = dir.path().join("out").join("thumb_0.jpg");
    toolkit.extract_thumbnail(&source, &thumb, 1000).await.unwrap();
    assert!(thumb.exists());
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_single_scene_has_no_boundaries() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("flat.mp4");
    let status = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-f", "lavfi", "-i", "color=c=gray:s=160x120:d=2"])
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
        .arg(&source)
        .status()
        .unwrap();
    assert!(status.success());

    let err = FfmpegToolkit::new().detect(&source, 0.4).await.unwrap_err();
    assert!(err.to_string().contains("no scene boundaries"));
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_failed_extraction_leaves_no_file() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("clip_0.mp4");

    let result = FfmpegToolkit::new()
        .extract_clip(&dir.path().join("missing.mp4"), &out, 0, 1000)
        .await;

    assert!(result.is_err());
    assert!(!out.exists());
}
