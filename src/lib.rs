//! Post-production for multi-character spoken audio.
//!
//! Per-line recordings are edited ([`line_editor`]), joined into one timeline
//! ([`join`]) and mastered ([`mastering`]), with every processing step
//! described by a [`Soundboard`] of [`EditDescriptor`]s.

pub mod assets;
pub mod buffer;
pub mod codec;
pub mod config;
pub mod dialogue;
pub mod dsp;
pub mod dynamics;
pub mod edits;
pub mod error;
pub mod generate;
pub mod join;
pub mod line_editor;
pub mod loudness;
pub mod mastering;
pub mod presets;
pub mod progress;
mod resample;
pub mod session;
pub mod soundboard;

pub use crate::assets::AssetCatalog;
pub use crate::buffer::AudioBuffer;
pub use crate::config::RenderJob;
pub use crate::dialogue::{Character, Dialogue, DialogueLine, Selection};
pub use crate::dynamics::{apply_dynamics, DSP_SAMPLE_RATE};
pub use crate::edits::{
    BackgroundEdit, BasicEdit, ChorusEdit, CompressorEdit, DistortionEdit, EditDescriptor,
    EditKind, LimiterEdit, NoiseGateEdit, NormalizationEdit, ReverbEdit, SpecialEffectEdit,
};
pub use crate::error::{AudioError, Result};
pub use crate::generate::{SpeechSynthesizer, VoiceSettings};
pub use crate::join::{JoinSummary, DEFAULT_GAP_MS};
pub use crate::line_editor::LineEdit;
pub use crate::loudness::LoudnessReport;
pub use crate::mastering::{AudioPart, MasteringOutcome, MasteringRequest};
pub use crate::progress::{NoProgress, ProgressSink};
pub use crate::session::Session;
pub use crate::soundboard::Soundboard;
