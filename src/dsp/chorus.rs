//! Chorus
//!
//! Modulated fractional delay per channel, mixed 50/50 with the dry signal.
//! The delay sweeps between `centre_delay_ms` and `centre_delay_ms + depth *
//! MAX_MOD_MS` with a sine LFO; odd channels run the LFO a quarter cycle
//! ahead to widen the image.

use std::f32::consts::{FRAC_PI_2, TAU};

use crate::dsp::Pedal;
use crate::error::{AudioError, Result};

// Maximum sweep (ms) at depth 1.0.
const MAX_MOD_MS: f32 = 20.0;
// Dry/wet balance.
const MIX: f32 = 0.5;

pub struct Chorus {
    rate_hz: f32,
    depth: f32,
    centre_delay_ms: f32,
    feedback: f32,
    sample_rate: f32,

    phase: f32,
    // One circular delay line per channel, allocated on first use
    lines: Vec<Vec<f32>>,
    write_idx: usize,
}

impl Chorus {
    pub fn new(
        rate_hz: f32,
        depth: f32,
        centre_delay_ms: f32,
        feedback: f32,
        sample_rate: f32,
    ) -> Result<Self> {
        if !(0.0..100.0).contains(&rate_hz) {
            return Err(AudioError::pedal(
                "Chorus",
                format!("rate must be in [0, 100) Hz, got {rate_hz}"),
            ));
        }
        if !(0.0..=1.0).contains(&depth) {
            return Err(AudioError::pedal(
                "Chorus",
                format!("depth must be in [0, 1], got {depth}"),
            ));
        }
        if !(0.0..100.0).contains(&centre_delay_ms) {
            return Err(AudioError::pedal(
                "Chorus",
                format!("centre delay must be in [0, 100) ms, got {centre_delay_ms}"),
            ));
        }
        if !(-1.0..=1.0).contains(&feedback) {
            return Err(AudioError::pedal(
                "Chorus",
                format!("feedback must be in [-1, 1], got {feedback}"),
            ));
        }
        if !(sample_rate > 0.0) {
            return Err(AudioError::pedal("Chorus", "sample rate must be > 0"));
        }

        Ok(Self {
            rate_hz,
            depth,
            centre_delay_ms,
            feedback,
            sample_rate,
            phase: 0.0,
            lines: Vec::new(),
            write_idx: 0,
        })
    }

    fn line_len(&self) -> usize {
        let max_ms = self.centre_delay_ms + MAX_MOD_MS;
        (max_ms * 0.001 * self.sample_rate).ceil() as usize + 2
    }

    fn delay_samples(&self, channel: usize) -> f32 {
        let offset = if channel % 2 == 1 { FRAC_PI_2 } else { 0.0 };
        let lfo = 0.5 * (1.0 + (self.phase + offset).sin());
        let delay_ms = self.centre_delay_ms + self.depth * MAX_MOD_MS * lfo;
        (delay_ms * 0.001 * self.sample_rate).max(0.0)
    }

    fn read(line: &[f32], write_idx: usize, delay: f32) -> f32 {
        let len = line.len();
        let whole = delay.floor() as usize;
        let frac = delay - whole as f32;
        let a = line[(write_idx + len - whole % len) % len];
        let b = line[(write_idx + 2 * len - (whole + 1) % len) % len];
        a + (b - a) * frac
    }
}

impl Pedal for Chorus {
    fn name(&self) -> &'static str {
        "Chorus"
    }

    fn process(&mut self, samples: &mut [f32], channels: usize) {
        if self.lines.len() != channels {
            let len = self.line_len();
            self.lines = vec![vec![0.0; len]; channels];
            self.write_idx = 0;
        }
        let len = self.lines[0].len();
        let phase_step = TAU * self.rate_hz / self.sample_rate;

        for frame in samples.chunks_exact_mut(channels) {
            for (c, s) in frame.iter_mut().enumerate() {
                let delay = self.delay_samples(c);
                let line = &mut self.lines[c];
                // A zero delay reads the sample being written this frame
                let wet = if delay < 1.0 {
                    let prev = line[(self.write_idx + len - 1) % len];
                    *s + (prev - *s) * delay
                } else {
                    Self::read(line, self.write_idx, delay)
                };
                line[self.write_idx] = *s + self.feedback * wet;
                *s = *s * (1.0 - MIX) + wet * MIX;
            }
            self.write_idx = (self.write_idx + 1) % len;
            self.phase = (self.phase + phase_step) % TAU;
        }
    }
}
