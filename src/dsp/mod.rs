//! Offline pedals. Each one processes interleaved `f32` in place at a fixed
//! sample rate chosen at construction; all constructors validate their
//! parameters and return [`crate::error::AudioError::PedalInit`] on rejection.

pub mod chorus;
pub mod compressor;
pub mod distortion;
pub mod limiter;
pub mod noise_gate;
pub mod reverb;
pub mod utils;

pub use chorus::Chorus;
pub use compressor::Compressor;
pub use distortion::Distortion;
pub use limiter::Limiter;
pub use noise_gate::NoiseGate;
pub use reverb::Reverb;

/// A single effect in a processing chain.
pub trait Pedal: Send {
    fn name(&self) -> &'static str;

    /// Process interleaved samples in place. `channels` is never zero.
    fn process(&mut self, samples: &mut [f32], channels: usize);
}

/// Pedals run one after another over the whole buffer.
#[derive(Default)]
pub struct PedalChain {
    pedals: Vec<Box<dyn Pedal>>,
}

impl PedalChain {
    pub fn new(pedals: Vec<Box<dyn Pedal>>) -> Self {
        Self { pedals }
    }

    pub fn is_empty(&self) -> bool {
        self.pedals.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.pedals.iter().map(|p| p.name()).collect()
    }

    pub fn process(&mut self, samples: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for pedal in &mut self.pedals {
            pedal.process(samples, channels);
        }
    }
}
