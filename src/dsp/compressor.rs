//! Linked Compressor
//!
//! Downward compressor with a hard knee. The detector follows the peak of the
//! loudest channel in each frame, so every channel receives the same gain and
//! the stereo image does not shift under reduction.
//!
//! # Gain computer
//! `over = env_db - threshold_db`; reduction is `over * (1 - 1/ratio)` for
//! positive `over`, zero otherwise. There is no makeup gain: a compressor with
//! its threshold at 0 dBFS never touches material that does not clip.

use crate::dsp::utils::{db_to_lin, lin_to_db, time_constant_coeff, update_env, DB_EPS};
use crate::dsp::Pedal;
use crate::error::{AudioError, Result};

pub struct Compressor {
    threshold_db: f32,
    ratio: f32,
    attack: f32,
    release: f32,

    // Peak envelope (linear), shared by all channels
    env: f32,

    // Metering
    peak_gain_reduction_db: f32,
}

impl Compressor {
    pub fn new(
        threshold_db: f32,
        ratio: f32,
        attack_ms: f32,
        release_ms: f32,
        sample_rate: f32,
    ) -> Result<Self> {
        if !threshold_db.is_finite() {
            return Err(AudioError::pedal("Compressor", "threshold must be finite"));
        }
        if !(ratio >= 1.0) {
            return Err(AudioError::pedal(
                "Compressor",
                format!("ratio must be >= 1.0, got {ratio}"),
            ));
        }
        if !(attack_ms >= 0.0) || !(release_ms >= 0.0) {
            return Err(AudioError::pedal(
                "Compressor",
                format!("attack and release must be >= 0 ms, got {attack_ms}/{release_ms}"),
            ));
        }

        Ok(Self {
            threshold_db,
            ratio,
            attack: time_constant_coeff(attack_ms, sample_rate),
            release: time_constant_coeff(release_ms, sample_rate),
            env: 0.0,
            peak_gain_reduction_db: 0.0,
        })
    }

    /// Gain for one frame of input.
    pub fn compute_gain(&mut self, frame: &[f32]) -> f32 {
        let level = frame.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        self.env = update_env(self.env, level, self.attack, self.release);

        let over_db = lin_to_db(self.env.max(DB_EPS)) - self.threshold_db;
        if over_db <= 0.0 {
            return 1.0;
        }

        let reduction_db = over_db * (1.0 - 1.0 / self.ratio);
        if reduction_db > self.peak_gain_reduction_db {
            self.peak_gain_reduction_db = reduction_db;
        }
        db_to_lin(-reduction_db)
    }

    /// Largest reduction applied so far, in dB.
    pub fn get_gain_reduction_db(&self) -> f32 {
        self.peak_gain_reduction_db
    }
}

impl Pedal for Compressor {
    fn name(&self) -> &'static str {
        "Compressor"
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_ratio_below_one() {
        let err = Compressor::new(-20.0, 0.5, 5.0, 50.0, 44_100.0)
            .err()
            .unwrap();
        assert!(err.to_string().contains("Compressor"));
    }

    #[test]
    fn test_rejects_negative_times() {
        assert!(Compressor::new(-20.0, 2.0, -1.0, 50.0, 44_100.0).is_err());
        assert!(Compressor::new(-20.0, 2.0, 1.0, f32::NAN, 44_100.0).is_err());
    }

    #[test]
    fn test_below_threshold_untouched() {
        let mut comp = Compressor::new(-6.0, 4.0, 1.0, 50.0, 44_100.0).unwrap();
        let mut samples = vec![0.1f32; 4410];
        comp.process(&mut samples, 1);
        assert!(samples.iter().all(|&s| (s - 0.1).abs() < 1e-7));
        assert_eq!(comp.get_gain_reduction_db(), 0.0);
    }

    #[test]
    fn test_steady_state_reduction_matches_ratio() {
        // 0.5 is about -6 dBFS; 14 dB over a -20 dB threshold at 2:1 is 7 dB down
        let mut comp = Compressor::new(-20.0, 2.0, 1.0, 50.0, 44_100.0).unwrap();
        let mut samples = vec![0.5f32; 44_100];
        comp.process(&mut samples, 1);
        let out_db = lin_to_db(samples[44_099]);
        let expected = lin_to_db(0.5) - (lin_to_db(0.5) + 20.0) * 0.5;
        assert!((out_db - expected).abs() < 0.1, "out {out_db} expected {expected}");
    }

    #[test]
    fn test_channels_are_linked() {
        let mut comp = Compressor::new(-20.0, 4.0, 0.0, 50.0, 44_100.0).unwrap();
        let mut samples = vec![0.8, 0.1, 0.8, 0.1];
        comp.process(&mut samples, 2);
        let ratio_l = samples[2] / 0.8;
        let ratio_r = samples[3] / 0.1;
        assert!((ratio_l - ratio_r).abs() < 1e-6);
        assert!(ratio_l < 1.0);
    }
}
