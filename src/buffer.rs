//! Decoded PCM audio and the time-domain primitives every engine builds on.
//!
//! Samples are interleaved `f32` in the nominal range -1..1. All time
//! arguments are milliseconds and are converted to whole frames with
//! [`AudioBuffer::ms_to_frames`], so two buffers at the same rate always agree
//! on how many frames a given duration covers.
//!
//! Operations that combine two buffers (append, overlay) first conform the
//! incoming buffer to the receiving buffer's sample rate and channel count.

use crate::dsp::utils::{db_to_lin, lin_to_db};
use crate::error::Result;
use crate::resample::resample_interleaved;

/// Peak reported for a silent or empty buffer.
pub const SILENCE_DBFS: f32 = -120.0;

#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioBuffer {
    /// Wraps interleaved samples. A trailing partial frame is dropped.
    pub fn new(mut samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let whole = samples.len() - samples.len() % channels as usize;
        samples.truncate(whole);
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn silent_frames(frames: usize, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        Self {
            samples: vec![0.0; frames * channels as usize],
            sample_rate,
            channels,
        }
    }

    pub fn silent(duration_ms: u32, sample_rate: u32, channels: u16) -> Self {
        let frames = frames_for(duration_ms as f64, sample_rate);
        Self::silent_frames(frames, sample_rate, channels)
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[inline]
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 * 1000.0 / self.sample_rate as f64
    }

    #[inline]
    pub fn ms_to_frames(&self, ms: f64) -> usize {
        frames_for(ms, self.sample_rate)
    }

    /// Absolute peak over all channels.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    pub fn peak_dbfs(&self) -> f32 {
        let peak = self.peak();
        if peak <= 0.0 {
            SILENCE_DBFS
        } else {
            lin_to_db(peak)
        }
    }

    // -------------------------------------------------------------------------
    // Cutting
    // -------------------------------------------------------------------------

    /// Copy of frames `start..end`, clamped to the buffer.
    pub fn slice_frames(&self, start: usize, end: usize) -> AudioBuffer {
        let total = self.frames();
        let end = end.min(total);
        let start = start.min(end);
        let ch = self.channels as usize;
        AudioBuffer {
            samples: self.samples[start * ch..end * ch].to_vec(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    pub fn slice_ms(&self, start_ms: f64, end_ms: f64) -> AudioBuffer {
        self.slice_frames(
            self.ms_to_frames(start_ms.max(0.0)),
            self.ms_to_frames(end_ms.max(0.0)),
        )
    }

    pub fn truncate_frames(&mut self, frames: usize) {
        let len = frames.saturating_mul(self.channels as usize);
        self.samples.truncate(len);
    }

    // -------------------------------------------------------------------------
    // Level and envelopes
    // -------------------------------------------------------------------------

    pub fn apply_gain_db(&mut self, gain_db: f32) {
        if gain_db == 0.0 {
            return;
        }
        let gain = db_to_lin(gain_db);
        for s in &mut self.samples {
            *s *= gain;
        }
    }

    /// Linear ramp from silence to unity over the first `duration_ms`.
    pub fn fade_in(&mut self, duration_ms: u32) {
        let n = self.ms_to_frames(duration_ms as f64).min(self.frames());
        if n == 0 {
            return;
        }
        let ch = self.channels as usize;
        for (i, frame) in self.samples.chunks_exact_mut(ch).take(n).enumerate() {
            let gain = i as f32 / n as f32;
            for s in frame {
                *s *= gain;
            }
        }
    }

    /// Linear ramp from unity to silence over the last `duration_ms`.
    pub fn fade_out(&mut self, duration_ms: u32) {
        let total = self.frames();
        let n = self.ms_to_frames(duration_ms as f64).min(total);
        if n == 0 {
            return;
        }
        let ch = self.channels as usize;
        let start = total - n;
        for (i, frame) in self.samples[start * ch..].chunks_exact_mut(ch).enumerate() {
            let gain = 1.0 - (i + 1) as f32 / n as f32;
            for s in frame {
                *s *= gain;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Combining
    // -------------------------------------------------------------------------

    pub fn prepend_silence(&mut self, duration_ms: u32) {
        let n = self.ms_to_frames(duration_ms as f64) * self.channels as usize;
        if n == 0 {
            return;
        }
        let mut samples = vec![0.0; n];
        samples.extend_from_slice(&self.samples);
        self.samples = samples;
    }

    pub fn append_silence(&mut self, duration_ms: u32) {
        let n = self.ms_to_frames(duration_ms as f64) * self.channels as usize;
        self.samples.resize(self.samples.len() + n, 0.0);
    }

    /// Appends `other` after conforming it to this buffer's format.
    pub fn append(&mut self, other: &AudioBuffer) -> Result<()> {
        let other = other.conformed(self.sample_rate, self.channels)?;
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    /// Mixes `other` into this buffer starting at `position_ms`. The result
    /// keeps this buffer's length; whatever of `other` runs past the end is
    /// dropped.
    pub fn overlay(&mut self, other: &AudioBuffer, position_ms: f64) -> Result<()> {
        let start = self.ms_to_frames(position_ms.max(0.0));
        if start >= self.frames() || other.is_empty() {
            return Ok(());
        }
        let other = other.conformed(self.sample_rate, self.channels)?;
        let ch = self.channels as usize;
        let dst = &mut self.samples[start * ch..];
        for (d, s) in dst.iter_mut().zip(other.samples.iter()) {
            *d = (*d + *s).clamp(-1.0, 1.0);
        }
        Ok(())
    }

    /// The buffer tiled `times` times back to back. Zero behaves like one.
    pub fn repeated(&self, times: u32) -> AudioBuffer {
        let times = times.max(1) as usize;
        AudioBuffer {
            samples: self.samples.repeat(times),
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    /// A copy converted to `sample_rate` and `channels`.
    pub fn conformed(&self, sample_rate: u32, channels: u16) -> Result<AudioBuffer> {
        let remixed = self.remixed(channels);
        if remixed.sample_rate == sample_rate {
            return Ok(remixed);
        }
        let samples = resample_interleaved(
            &remixed.samples,
            remixed.channels as usize,
            remixed.sample_rate,
            sample_rate,
        )?;
        Ok(AudioBuffer::new(samples, sample_rate, remixed.channels))
    }

    /// Channel count conversion: down to mono averages, up from fewer channels
    /// repeats the source channels in order, down to more than one keeps the
    /// leading channels.
    pub fn remixed(&self, channels: u16) -> AudioBuffer {
        let channels = channels.max(1);
        if channels == self.channels {
            return self.clone();
        }
        let src_ch = self.channels as usize;
        let dst_ch = channels as usize;
        let mut samples = Vec::with_capacity(self.frames() * dst_ch);
        for frame in self.samples.chunks_exact(src_ch) {
            if dst_ch == 1 {
                samples.push(frame.iter().sum::<f32>() / src_ch as f32);
            } else {
                for c in 0..dst_ch {
                    samples.push(frame[c % src_ch]);
                }
            }
        }
        AudioBuffer {
            samples,
            sample_rate: self.sample_rate,
            channels,
        }
    }
}

#[inline]
fn frames_for(ms: f64, sample_rate: u32) -> usize {
    (ms * sample_rate as f64 / 1000.0).round().max(0.0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ones(frames: usize, rate: u32, channels: u16) -> AudioBuffer {
        AudioBuffer::new(vec![0.5; frames * channels as usize], rate, channels)
    }

    #[test]
    fn test_duration_and_frames() {
        let buf = AudioBuffer::silent(1500, 8000, 2);
        assert_eq!(buf.frames(), 12_000);
        assert_eq!(buf.samples().len(), 24_000);
        assert!((buf.duration_ms() - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_frame_dropped() {
        let buf = AudioBuffer::new(vec![0.1, 0.2, 0.3], 8000, 2);
        assert_eq!(buf.frames(), 1);
    }

    #[test]
    fn test_slice_clamps() {
        let buf = ones(1000, 1000, 1);
        assert_eq!(buf.slice_ms(200.0, 5000.0).frames(), 800);
        assert_eq!(buf.slice_ms(900.0, 100.0).frames(), 0);
    }

    #[test]
    fn test_fade_in_starts_silent_and_reaches_unity() {
        let mut buf = ones(1000, 1000, 1);
        buf.fade_in(100);
        assert_eq!(buf.samples()[0], 0.0);
        assert!(buf.samples()[50] > 0.2 && buf.samples()[50] < 0.3);
        assert_eq!(buf.samples()[100], 0.5);
    }

    #[test]
    fn test_fade_out_ends_silent() {
        let mut buf = ones(1000, 1000, 2);
        buf.fade_out(100);
        let s = buf.samples();
        assert_eq!(s[s.len() - 1], 0.0);
        assert_eq!(s[2 * 899], 0.5);
        assert!(s[2 * 950] < 0.5);
    }

    #[test]
    fn test_fade_longer_than_buffer_is_clamped() {
        let mut buf = ones(10, 1000, 1);
        buf.fade_out(5000);
        assert_eq!(buf.frames(), 10);
        assert_eq!(buf.samples()[9], 0.0);
    }

    #[test]
    fn test_overlay_keeps_length_and_mixes() {
        let mut base = AudioBuffer::silent(1000, 1000, 1);
        let effect = ones(500, 1000, 1);
        base.overlay(&effect, 800.0).unwrap();
        assert_eq!(base.frames(), 1000);
        assert_eq!(base.samples()[799], 0.0);
        assert_eq!(base.samples()[800], 0.5);
        assert_eq!(base.samples()[999], 0.5);
    }

    #[test]
    fn test_overlay_past_end_is_noop() {
        let mut base = ones(100, 1000, 1);
        let before = base.clone();
        base.overlay(&ones(100, 1000, 1), 250.0).unwrap();
        assert_eq!(base, before);
    }

    #[test]
    fn test_overlay_clips() {
        let mut base = AudioBuffer::new(vec![0.9; 10], 1000, 1);
        base.overlay(&AudioBuffer::new(vec![0.9; 10], 1000, 1), 0.0)
            .unwrap();
        assert!(base.samples().iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_append_conforms_channels() {
        let mut stereo = ones(10, 1000, 2);
        let mono = AudioBuffer::new(vec![0.25; 10], 1000, 1);
        stereo.append(&mono).unwrap();
        assert_eq!(stereo.frames(), 20);
        assert_eq!(stereo.samples()[20], 0.25);
        assert_eq!(stereo.samples()[21], 0.25);
    }

    #[test]
    fn test_remix_to_mono_averages() {
        let stereo = AudioBuffer::new(vec![1.0, 0.0, 0.5, 0.5], 1000, 2);
        let mono = stereo.remixed(1);
        assert_eq!(mono.samples(), &[0.5, 0.5]);
    }

    #[test]
    fn test_repeated_tiles() {
        let buf = AudioBuffer::new(vec![0.1, 0.2], 1000, 1);
        assert_eq!(buf.repeated(3).samples(), &[0.1, 0.2, 0.1, 0.2, 0.1, 0.2]);
        assert_eq!(buf.repeated(0).frames(), 2);
    }

    #[test]
    fn test_silence_extension() {
        let mut buf = ones(100, 1000, 1);
        buf.prepend_silence(50);
        buf.append_silence(25);
        assert_eq!(buf.frames(), 175);
        assert_eq!(buf.samples()[49], 0.0);
        assert_eq!(buf.samples()[50], 0.5);
        assert_eq!(buf.samples()[174], 0.0);
    }

    #[test]
    fn test_peak_dbfs() {
        assert_eq!(AudioBuffer::silent(10, 1000, 1).peak_dbfs(), SILENCE_DBFS);
        let buf = AudioBuffer::new(vec![0.5, -1.0], 1000, 1);
        assert!(buf.peak_dbfs().abs() < 1e-4);
    }
}
