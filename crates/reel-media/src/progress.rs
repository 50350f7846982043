//! FFmpeg progress parsing and band mapping.

use reel_models::ProgressBand;

/// Encoder position parsed from FFmpeg's `-progress` output.
#[derive(Debug, Clone, Default)]
pub struct FfmpegProgress {
    /// Output time written so far, in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed relative to realtime (0 when not yet reported)
    pub speed: f64,
    /// FFmpeg reported `progress=end`
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Percent of `total_duration_ms` written, clamped to 0-100.
    pub fn percentage(&self, total_duration_ms: i64) -> f64 {
        if self.is_complete {
            return 100.0;
        }
        if total_duration_ms <= 0 {
            return 0.0;
        }
        ((self.out_time_ms as f64 / total_duration_ms as f64) * 100.0).clamp(0.0, 100.0)
    }

    /// Wall-clock seconds left at the current speed, if speed is known.
    pub fn remaining_secs(&self, total_duration_ms: i64) -> Option<f64> {
        if self.is_complete {
            return Some(0.0);
        }
        (self.speed > 0.0).then(|| {
            let left_ms = (total_duration_ms - self.out_time_ms).max(0);
            left_ms as f64 / 1000.0 / self.speed
        })
    }
}

/// Maps native percentages into a band and suppresses repeats.
///
/// A value is only yielded when it is strictly greater than the last one
/// yielded, so observers never see the same or a lower percent twice.
#[derive(Debug, Clone)]
pub struct BandMapper {
    band: ProgressBand,
    last: Option<u8>,
}

impl BandMapper {
    pub fn new(band: ProgressBand) -> Self {
        Self { band, last: None }
    }

    /// Feed a native percent; returns the mapped value if it should be forwarded.
    pub fn observe(&mut self, native_percent: f64) -> Option<u8> {
        let mapped = self.band.map(native_percent);
        match self.last {
            Some(last) if mapped <= last => None,
            _ => {
                self.last = Some(mapped);
                Some(mapped)
            }
        }
    }
}
