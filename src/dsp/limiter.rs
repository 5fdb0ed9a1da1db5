//! Output Limiter
//!
//! Brickwall peak limiter. Attack is instantaneous, so no sample leaves the
//! pedal above the ceiling (`threshold_db`); recovery follows `release_ms`.
//! Channels are linked through the frame peak.

use crate::dsp::utils::{db_to_lin, lin_to_db, time_constant_coeff};
use crate::dsp::Pedal;
use crate::error::{AudioError, Result};

pub struct Limiter {
    ceiling: f32,
    release: f32,

    // Smoothed applied gain
    gain_smooth: f32,
}

impl Limiter {
    pub fn new(threshold_db: f32, release_ms: f32, sample_rate: f32) -> Result<Self> {
        if !threshold_db.is_finite() {
            return Err(AudioError::pedal("Limiter", "threshold must be finite"));
        }
        if !(release_ms >= 0.0) {
            return Err(AudioError::pedal(
                "Limiter",
                format!("release must be >= 0 ms, got {release_ms}"),
            ));
        }
        Ok(Self {
            ceiling: db_to_lin(threshold_db),
            release: time_constant_coeff(release_ms, sample_rate),
            gain_smooth: 1.0,
        })
    }

    pub fn compute_gain(&mut self, frame: &[f32]) -> f32 {
        let peak = frame.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        let target_gain = if peak > self.ceiling {
            self.ceiling / peak
        } else {
            1.0
        };

        if target_gain < self.gain_smooth {
            self.gain_smooth = target_gain;
        } else {
            self.gain_smooth = self.release * self.gain_smooth + (1.0 - self.release) * target_gain;
        }
        self.gain_smooth
    }

    /// Current gain reduction in dB.
    pub fn get_gain_reduction_db(&self) -> f32 {
        lin_to_db(self.gain_smooth).abs()
    }
}

impl Pedal for Limiter {
    fn name(&self) -> &'static str {
        "Limiter"
    }

    fn process(&mut self, samples: &mut [f32], channels: usize) {
        for frame in samples.chunks_exact_mut(channels) {
            let gain = self.compute_gain(frame);
            for s in frame {
                *s *= gain;
            }
        }
    }
}
