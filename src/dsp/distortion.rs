//! Distortion: `tanh` waveshaper after `drive_db` of input gain.

use crate::dsp::utils::db_to_lin;
use crate::dsp::Pedal;
use crate::error::{AudioError, Result};

pub struct Distortion {
    drive: f32,
}

impl Distortion {
    pub fn new(drive_db: f32) -> Result<Self> {
        if !drive_db.is_finite() {
            return Err(AudioError::pedal("Distortion", "drive must be finite"));
        }
        Ok(Self {
            drive: db_to_lin(drive_db),
        })
    }
}

impl Pedal for Distortion {
    fn name(&self) -> &'static str {
        "Distortion"
    }

    fn process(&mut self, samples: &mut [f32], _channels: usize) {
        for s in samples {
            *s = (*s * self.drive).tanh();
        }
    }
}
