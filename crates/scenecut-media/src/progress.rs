//! FFmpeg `-progress` snapshots.

/// Progress snapshot reported by a running FFmpeg process.
#[derive(Debug, Clone, Default)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Output time as string (HH:MM:SS.microseconds)
    pub out_time: String,
    /// Encoding speed (1.5 = 1.5x realtime)
    pub speed: f64,
    /// Set once FFmpeg reports `progress=end`
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Percentage of `total_duration_ms` already written, clamped to 100.
    pub fn percentage(&self, total_duration_ms: u64) -> f64 {
        if total_duration_ms == 0 {
            return 0.0;
        }
        let done = self.out_time_ms.max(0) as f64;
        ((done / total_duration_ms as f64) * 100.0).min(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percentage() {
        let progress = FfmpegProgress {
            out_time_ms: 5000,
            ..Default::default()
        };

        assert!((progress.percentage(10_000) - 50.0).abs() < 0.01);
        assert!((progress.percentage(4000) - 100.0).abs() < 0.01);
        assert_eq!(progress.percentage(0), 0.0);
    }

    #[test]
    fn test_negative_out_time_is_zero() {
        // FFmpeg reports a negative out_time before the first packet
        let progress = FfmpegProgress {
            out_time_ms: -23,
            ..Default::default()
        };
        assert_eq!(progress.percentage(1000), 0.0);
    }
}
