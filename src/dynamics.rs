//! Dynamics Engine
//!
//! Runs the enabled pedals of a soundboard over a buffer, in the fixed chain
//! order distortion, chorus, reverb, noise gate, limiter, compressor.
//!
//! # Lifecycle
//! 1. Build every pedal. If any rejects its parameters the call fails with
//!    that pedal's name and the input is dropped untouched.
//! 2. Empty chain: the input is returned as is, without resampling.
//! 3. Otherwise the buffer is conformed to [`DSP_SAMPLE_RATE`], processed
//!    in memory, and returned at that rate.

use log::{debug, info};

use crate::buffer::AudioBuffer;
use crate::dsp::{Pedal, PedalChain};
use crate::error::Result;
use crate::soundboard::Soundboard;

/// Rate all pedals run at.
pub const DSP_SAMPLE_RATE: u32 = 44_100;

/// Instantiate the chain for `soundboard` without processing anything.
pub fn build_chain(soundboard: &Soundboard, sample_rate: u32) -> Result<PedalChain> {
    let pedals = soundboard
        .enabled_pedals()
        .into_iter()
        .map(|(_, edit)| edit.build(sample_rate as f32))
        .collect::<Result<Vec<Box<dyn Pedal>>>>()?;
    Ok(PedalChain::new(pedals))
}

pub fn apply_dynamics(buffer: AudioBuffer, soundboard: &Soundboard) -> Result<AudioBuffer> {
    let mut chain = build_chain(soundboard, DSP_SAMPLE_RATE)?;
    if chain.is_empty() {
        return Ok(buffer);
    }
    info!("Applying dynamics chain: {}", chain.names().join(" -> "));

    let mut working = buffer.conformed(DSP_SAMPLE_RATE, buffer.channels())?;
    let channels = working.channels() as usize;
    chain.process(working.samples_mut(), channels);

    debug!(
        "Dynamics done: {} frames, peak {:.1} dBFS",
        working.frames(),
        working.peak_dbfs()
    );
    Ok(working)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::utils::db_to_lin;
    use crate::edits::{
        BackgroundEdit, BasicEdit, ChorusEdit, CompressorEdit, DistortionEdit, LimiterEdit,
        ReverbEdit,
    };
    use crate::error::AudioError;

    fn sine(rate: u32, secs: f32, amp: f32) -> AudioBuffer {
        let frames = (rate as f32 * secs) as usize;
        let samples = (0..frames)
            .map(|i| (2.0 * std::f32::consts::PI * 220.0 * i as f32 / rate as f32).sin() * amp)
            .collect();
        AudioBuffer::new(samples, rate, 1)
    }

    #[test]
    fn test_inert_board_is_identity() {
        let input = sine(22_050, 0.5, 0.5);
        let board = Soundboard::new()
            .with(CompressorEdit::default())
            .with(ReverbEdit::default())
            .with(BasicEdit {
                volume_db: 6.0,
                ..Default::default()
            })
            .with(BackgroundEdit {
                track_name: "rain".into(),
                ..Default::default()
            });
        let out = apply_dynamics(input.clone(), &board).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_output_is_at_dsp_rate() {
        let input = sine(22_050, 0.5, 0.5);
        let board = Soundboard::new().with(DistortionEdit { drive_db: 3.0 });
        let out = apply_dynamics(input, &board).unwrap();
        assert_eq!(out.sample_rate(), DSP_SAMPLE_RATE);
        assert_eq!(out.frames(), 22_050);
    }

    #[test]
    fn test_limiter_caps_peak() {
        let input = sine(DSP_SAMPLE_RATE, 1.0, 0.9);
        let board = Soundboard::new().with(LimiterEdit {
            threshold_db: -6.0,
            release_ms: 100.0,
        });
        let out = apply_dynamics(input, &board).unwrap();
        assert!(out.peak() <= db_to_lin(-6.0) + 1e-5);
    }

    #[test]
    fn test_invalid_pedal_fails_with_name() {
        let board = Soundboard::new()
            .with(DistortionEdit { drive_db: 3.0 })
            .with(ChorusEdit {
                rate_hz: 1.0,
                depth: 3.0,
                centre_delay_ms: 7.0,
                feedback: 0.0,
            });
        let err = apply_dynamics(sine(DSP_SAMPLE_RATE, 0.1, 0.5), &board)
            .err()
            .unwrap();
        match err {
            AudioError::PedalInit { pedal, .. } => assert_eq!(pedal, "Chorus"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_chain_order_is_canonical() {
        let board = Soundboard::new()
            .with(CompressorEdit {
                threshold_db: -20.0,
                ratio: 2.0,
                attack_ms: 1.0,
                release_ms: 50.0,
            })
            .with(DistortionEdit { drive_db: 3.0 });
        let chain = build_chain(&board, DSP_SAMPLE_RATE).unwrap();
        assert_eq!(chain.names(), vec!["Distortion", "Compressor"]);
    }
}
