//! EBU R128 measurement of a finished timeline.

use ebur128::{EbuR128, Mode};
use serde::Serialize;

use crate::buffer::AudioBuffer;
use crate::error::{AudioError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LoudnessReport {
    /// Integrated loudness (LUFS). Negative infinity for silence.
    pub integrated_lufs: f64,
    /// Maximum true peak over all channels (dBTP).
    pub true_peak_db: f64,
    /// Sample peak (dBFS).
    pub peak_dbfs: f32,
    pub duration_ms: f64,
}

pub fn measure(buffer: &AudioBuffer) -> Result<LoudnessReport> {
    let channels = buffer.channels() as u32;
    let mut meter = EbuR128::new(channels, buffer.sample_rate(), Mode::I | Mode::TRUE_PEAK)
        .map_err(|e| AudioError::Decode(format!("loudness meter init failed: {e:?}")))?;
    meter
        .add_frames_f32(buffer.samples())
        .map_err(|e| AudioError::Decode(format!("loudness analysis failed: {e:?}")))?;

    let integrated_lufs = meter
        .loudness_global()
        .map_err(|e| AudioError::Decode(format!("loudness analysis failed: {e:?}")))?;

    let mut true_peak = 0.0f64;
    for ch in 0..channels {
        let peak = meter
            .true_peak(ch)
            .map_err(|e| AudioError::Decode(format!("true peak analysis failed: {e:?}")))?;
        true_peak = true_peak.max(peak);
    }
    let true_peak_db = if true_peak > 0.0 {
        20.0 * true_peak.log10()
    } else {
        f64::NEG_INFINITY
    };

    Ok(LoudnessReport {
        integrated_lufs,
        true_peak_db,
        peak_dbfs: buffer.peak_dbfs(),
        duration_ms: buffer.duration_ms(),
    })
}
