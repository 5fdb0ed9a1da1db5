//! Reverb
//!
//! Schroeder/Moorer network in the Freeverb layout: eight damped comb filters
//! in parallel feeding four allpass filters in series, per side. The right
//! side uses slightly longer delay lines for decorrelation. Delay lengths are
//! tuned at 44.1 kHz and scaled to the running rate.
//!
//! Parameter mapping:
//! - feedback = `room_size * 0.28 + 0.7`
//! - damping  = `damping * 0.4`
//! - wet gain = `wet_level * 3`, dry gain = `dry_level * 2`
//!
//! so `wet_level = 0, dry_level = 0.5` is exactly transparent.

use crate::dsp::Pedal;
use crate::error::{AudioError, Result};

const COMB_TUNINGS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNINGS: [usize; 4] = [556, 441, 341, 225];
const STEREO_SPREAD: usize = 23;

const FIXED_GAIN: f32 = 0.015;
const ROOM_SCALE: f32 = 0.28;
const ROOM_OFFSET: f32 = 0.7;
const DAMP_SCALE: f32 = 0.4;
const WET_SCALE: f32 = 3.0;
const DRY_SCALE: f32 = 2.0;
const ALLPASS_FEEDBACK: f32 = 0.5;

struct Comb {
    buf: Vec<f32>,
    idx: usize,
    filter_store: f32,
}

impl Comb {
    fn new(len: usize) -> Self {
        Self {
            buf: vec![0.0; len.max(1)],
            idx: 0,
            filter_store: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> f32 {
        let out = self.buf[self.idx];
        self.filter_store = out * (1.0 - damp) + self.filter_store * damp;
        self.buf[self.idx] = input + self.filter_store * feedback;
        self.idx = (self.idx + 1) % self.buf.len();
        out
    }
}

struct Allpass {
    buf: Vec<f32>,
    idx: usize,
}

impl Allpass {
    fn new(len: usize) -> Self {
        Self {
            buf: vec![0.0; len.max(1)],
            idx: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buf[self.idx];
        self.buf[self.idx] = input + delayed * ALLPASS_FEEDBACK;
        self.idx = (self.idx + 1) % self.buf.len();
        delayed - input
    }
}

struct Side {
    combs: Vec<Comb>,
    allpasses: Vec<Allpass>,
}

impl Side {
    fn new(spread: usize, scale: f32) -> Self {
        let len = |n: usize| ((n + spread) as f32 * scale).round() as usize;
        Self {
            combs: COMB_TUNINGS.iter().map(|&n| Comb::new(len(n))).collect(),
            allpasses: ALLPASS_TUNINGS.iter().map(|&n| Allpass::new(len(n))).collect(),
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> f32 {
        let mut out = 0.0;
        for comb in &mut self.combs {
            out += comb.process(input, feedback, damp);
        }
        for ap in &mut self.allpasses {
            out = ap.process(out);
        }
        out
    }
}

pub struct Reverb {
    feedback: f32,
    damp: f32,
    wet: f32,
    dry: f32,
    left: Side,
    right: Side,
}

impl Reverb {
    pub fn new(
        room_size: f32,
        damping: f32,
        wet_level: f32,
        dry_level: f32,
        sample_rate: f32,
    ) -> Result<Self> {
        for (label, value) in [
            ("room size", room_size),
            ("damping", damping),
            ("wet level", wet_level),
            ("dry level", dry_level),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AudioError::pedal(
                    "Reverb",
                    format!("{label} must be in [0, 1], got {value}"),
                ));
            }
        }
        if !(sample_rate > 0.0) {
            return Err(AudioError::pedal("Reverb", "sample rate must be > 0"));
        }

        let scale = sample_rate / 44_100.0;
        Ok(Self {
            feedback: room_size * ROOM_SCALE + ROOM_OFFSET,
            damp: damping * DAMP_SCALE,
            wet: wet_level * WET_SCALE,
            dry: dry_level * DRY_SCALE,
            left: Side::new(0, scale),
            right: Side::new(STEREO_SPREAD, scale),
        })
    }
}

impl Pedal for Reverb {
    fn name(&self) -> &'static str {
        "Reverb"
    }

    fn process(&mut self, samples: &mut [f32], channels: usize) {
        for frame in samples.chunks_exact_mut(channels) {
            if channels == 1 {
                let input = frame[0] * FIXED_GAIN;
                let wet = self.left.process(input, self.feedback, self.damp);
                frame[0] = wet * self.wet + frame[0] * self.dry;
                continue;
            }

            let input = (frame[0] + frame[1]) * FIXED_GAIN;
            let wet_l = self.left.process(input, self.feedback, self.damp);
            let wet_r = self.right.process(input, self.feedback, self.damp);
            frame[0] = wet_l * self.wet + frame[0] * self.dry;
            frame[1] = wet_r * self.wet + frame[1] * self.dry;
            for s in &mut frame[2..] {
                *s *= self.dry;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_only_is_transparent() {
        let mut reverb = Reverb::new(0.8, 0.5, 0.0, 0.5, 44_100.0).unwrap();
        let input: Vec<f32> = (0..2000).map(|i| (i as f32 * 0.1).sin() * 0.5).collect();
        let mut samples = input.clone();
        reverb.process(&mut samples, 2);
        for (a, b) in samples.iter().zip(&input) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_impulse_produces_tail() {
        let mut reverb = Reverb::new(0.5, 0.5, 0.33, 0.0, 44_100.0).unwrap();
        let mut samples = vec![0.0f32; 44_100];
        samples[0] = 1.0;
        reverb.process(&mut samples, 1);
        let tail: f32 = samples[2000..].iter().map(|s| s.abs()).sum();
        assert!(tail > 0.0);
        assert!(samples.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = Reverb::new(1.5, 0.5, 0.33, 0.4, 44_100.0).err().unwrap();
        assert!(err.to_string().contains("room size"));
        assert!(Reverb::new(0.5, -0.1, 0.33, 0.4, 44_100.0).is_err());
    }
}
