//! Noise Gate
//!
//! Downward expander on an RMS detector. Below the threshold the gain is
//! `(env / threshold)^(ratio - 1)`, so every dB under the threshold becomes
//! `ratio` dB at the output. Ratio 1 leaves the signal alone.

use crate::dsp::utils::{db_to_lin, time_constant_coeff, update_env_sq, DB_EPS};
use crate::dsp::Pedal;
use crate::error::{AudioError, Result};

// Detector attack (ms). Fast enough to open on consonants.
const GATE_ATTACK_MS: f32 = 1.0;
// Detector release (ms). Slow enough to avoid chatter in word gaps.
const GATE_RELEASE_MS: f32 = 100.0;

pub struct NoiseGate {
    threshold: f32,
    ratio: f32,
    attack: f32,
    release: f32,

    // RMS envelope (squared), linked across channels
    env_sq: f32,
}

impl NoiseGate {
    pub fn new(threshold_db: f32, ratio: f32, sample_rate: f32) -> Result<Self> {
        if !threshold_db.is_finite() {
            return Err(AudioError::pedal("NoiseGate", "threshold must be finite"));
        }
        if !(ratio >= 1.0) {
            return Err(AudioError::pedal(
                "NoiseGate",
                format!("ratio must be >= 1.0, got {ratio}"),
            ));
        }
        Ok(Self {
            threshold: db_to_lin(threshold_db),
            ratio,
            attack: time_constant_coeff(GATE_ATTACK_MS, sample_rate),
            release: time_constant_coeff(GATE_RELEASE_MS, sample_rate),
            env_sq: 0.0,
        })
    }

    pub fn compute_gain(&mut self, frame: &[f32]) -> f32 {
        let sq = frame.iter().fold(0.0f32, |acc, s| acc.max(s * s));
        self.env_sq = update_env_sq(self.env_sq, sq, self.attack, self.release);

        let env = self.env_sq.sqrt().max(DB_EPS);
        if env >= self.threshold {
            return 1.0;
        }
        (env / self.threshold).powf(self.ratio - 1.0).clamp(0.0, 1.0)
    }
}

impl Pedal for NoiseGate {
    fn name(&self) -> &'static str {
        "NoiseGate"
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
