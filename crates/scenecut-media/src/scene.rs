//! Threshold scene detection.
//!
//! FFmpeg computes a per-frame scene score (0..1, difference from the previous
//! frame). `select='gt(scene,T)'` keeps frames scoring above the threshold and
//! `showinfo` logs each kept frame with its `pts_time`, which becomes a
//! boundary. The scan is a single linear decode pass.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::DetectionError;
use scenecut_models::SceneBoundary;

static PTS_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pts_time:\s*([0-9]+(?:\.[0-9]+)?)").unwrap());

/// Default detection threshold.
pub const DEFAULT_THRESHOLD: f64 = 0.4;

/// Check that `threshold` lies in (0, 1].
pub fn validate_threshold(threshold: f64) -> Result<f64, DetectionError> {
    if threshold > 0.0 && threshold <= 1.0 {
        Ok(threshold)
    } else {
        Err(DetectionError::InvalidThreshold(threshold))
    }
}

/// Detect scene boundaries in `path`.
///
/// Returns boundaries sorted ascending without duplicates. A scan that finds
/// no boundary at all is reported as [`DetectionError::NoBoundaries`].
pub async fn detect_scenes(
    path: impl AsRef<Path>,
    threshold: f64,
    timeout_secs: Option<u64>,
) -> Result<Vec<SceneBoundary>, DetectionError> {
    let path = path.as_ref();
    let threshold = validate_threshold(threshold)?;

    let cmd = FfmpegCommand::null_output(path)
        .video_only()
        .video_filter(scene_filter(threshold))
        .log_level("info");

    let mut runner = FfmpegRunner::new();
    if let Some(secs) = timeout_secs {
        runner = runner.with_timeout(secs);
    }

    let log = runner.run_capture(&cmd).await?;
    let boundaries = parse_scene_output(&log);

    debug!(
        path = %path.display(),
        threshold,
        count = boundaries.len(),
        "Scene scan finished"
    );

    if boundaries.is_empty() {
        return Err(DetectionError::NoBoundaries);
    }
    Ok(boundaries)
}

/// Filter graph selecting frames whose scene score exceeds `threshold`.
pub fn scene_filter(threshold: f64) -> String {
    format!("select='gt(scene,{})',showinfo", threshold)
}

/// Extract boundaries from `showinfo` log lines.
///
/// Lines look like
/// `[Parsed_showinfo_1 @ 0x5581] n:   2 pts:  86016 pts_time:3.36 duration:512 ...`.
pub fn parse_scene_output(output: &str) -> Vec<SceneBoundary> {
    let mut boundaries: Vec<SceneBoundary> = output
        .lines()
        .filter(|line| line.contains("showinfo"))
        .filter_map(|line| PTS_TIME.captures(line))
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| SceneBoundary::at_ms((secs * 1000.0).round() as u64))
        .collect();

    boundaries.sort();
    boundaries.dedup();
    boundaries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scene_output() {
        let output = "\
[Parsed_showinfo_1 @ 0x5581] config in time_base: 1/25600, frame_rate: 25/1
[Parsed_showinfo_1 @ 0x5581] n:   0 pts:  51200 pts_time:2       duration:  512 fmt:yuv420p
[Parsed_showinfo_1 @ 0x5581] n:   1 pts: 179200 pts_time:7       duration:  512 fmt:yuv420p
[Parsed_showinfo_1 @ 0x5581] n:   2 pts:  58880 pts_time:2.3     duration:  512 fmt:yuv420p
";
        let boundaries = parse_scene_output(output);
        let ms: Vec<u64> = boundaries.iter().map(|b| b.as_ms()).collect();
        assert_eq!(ms, vec![2000, 2300, 7000]);
    }

    #[test]
    fn test_parse_ignores_other_lines() {
        let output = "\
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'in.mp4':
frame=  250 fps=0.0 q=-0.0 Lsize=N/A time=00:00:10.00 bitrate=N/A speed= 201x
[Parsed_showinfo_1 @ 0x1] n:   0 pts: 110 pts_time:4.400 duration:1
[Parsed_showinfo_1 @ 0x1] n:   1 pts: 110 pts_time:4.400 duration:1
";
        let boundaries = parse_scene_output(output);
        assert_eq!(boundaries, vec![SceneBoundary::at_ms(4400)]);
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_scene_output("").is_empty());
    }

    #[test]
    fn test_validate_threshold() {
        assert!(validate_threshold(DEFAULT_THRESHOLD).is_ok());
        assert!(validate_threshold(1.0).is_ok());
        assert!(matches!(
            validate_threshold(0.0),
            Err(DetectionError::InvalidThreshold(_))
        ));
        assert!(validate_threshold(1.5).is_err());
        assert!(validate_threshold(f64::NAN).is_err());
    }

    #[test]
    fn test_scene_filter() {
        assert_eq!(scene_filter(0.4), "select='gt(scene,0.4)',showinfo");
    }
}
