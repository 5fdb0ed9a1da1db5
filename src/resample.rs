//! Offline sample-rate conversion.
//!
//! Wraps a rubato sinc resampler for whole-buffer conversion. The resampler's
//! output delay is trimmed and the tail flushed, so the result always holds
//! exactly `round(frames * to / from)` frames and lines up with the input in
//! time.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::{AudioError, Result};

const SINC_LEN: usize = 256;
const F_CUTOFF: f32 = 0.95;
const OVERSAMPLING_FACTOR: usize = 256;
const CHUNK_FRAMES: usize = 1024;

/// Resample interleaved samples from `from_rate` to `to_rate`.
pub fn resample_interleaved(
    input: &[f32],
    channels: usize,
    from_rate: u32,
    to_rate: u32,
) -> Result<Vec<f32>> {
    if channels == 0 {
        return Err(AudioError::Resample("channel count must be > 0".into()));
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(AudioError::Resample(format!(
            "invalid rates {from_rate} -> {to_rate}"
        )));
    }
    if from_rate == to_rate || input.is_empty() {
        return Ok(input.to_vec());
    }

    let frames = input.len() / channels;
    let ratio = to_rate as f64 / from_rate as f64;
    let expected = (frames as f64 * ratio).round() as usize;

    let params = SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: F_CUTOFF,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: OVERSAMPLING_FACTOR,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_FRAMES, channels)
        .map_err(|e| AudioError::Resample(format!("failed to create resampler: {e}")))?;

    let planar = deinterleave(input, channels);
    let delay = resampler.output_delay();
    let mut out: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay); channels];

    let mut pos = 0;
    while pos + CHUNK_FRAMES <= frames {
        let chunk: Vec<&[f32]> = planar
            .iter()
            .map(|c| &c[pos..pos + CHUNK_FRAMES])
            .collect();
        let produced = resampler
            .process(chunk.as_slice(), None)
            .map_err(|e| AudioError::Resample(format!("resample error: {e}")))?;
        append_planar(&mut out, produced);
        pos += CHUNK_FRAMES;
    }

    if pos < frames {
        let chunk: Vec<&[f32]> = planar.iter().map(|c| &c[pos..]).collect();
        let produced = resampler
            .process_partial(Some(chunk.as_slice()), None)
            .map_err(|e| AudioError::Resample(format!("resample error: {e}")))?;
        append_planar(&mut out, produced);
    }

    // Flush the filter tail until the delayed signal is fully out
    while out[0].len() < expected + delay {
        let produced = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| AudioError::Resample(format!("resample flush error: {e}")))?;
        if produced[0].is_empty() {
            break;
        }
        append_planar(&mut out, produced);
    }

    let mut interleaved = Vec::with_capacity(expected * channels);
    for i in delay..delay + expected {
        for channel in &out {
            interleaved.push(channel.get(i).copied().unwrap_or(0.0));
        }
    }
    Ok(interleaved)
}

fn deinterleave(input: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = input.len() / channels;
    let mut planar = vec![Vec::with_capacity(frames); channels];
    for frame in input.chunks_exact(channels) {
        for (c, &s) in frame.iter().enumerate() {
            planar[c].push(s);
        }
    }
    planar
}

fn append_planar(out: &mut [Vec<f32>], produced: Vec<Vec<f32>>) {
    for (dst, src) in out.iter_mut().zip(produced) {
        dst.extend_from_slice(&src);
    }
}
