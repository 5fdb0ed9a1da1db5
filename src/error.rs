//! Crate-wide error type.
//!
//! Engines return [`AudioError`] with enough context to render a message for
//! the person driving the session. Recoverable conditions (a missing line
//! file, an unknown asset name) never surface here: they are logged and
//! skipped by the engine that meets them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("No audio track found in {0}")]
    NoAudioTrack(String),

    #[error("Resampler error: {0}")]
    Resample(String),

    /// A pedal rejected its parameters. Nothing of the chain was applied.
    #[error("{pedal} could not be initialized: {reason}")]
    PedalInit { pedal: &'static str, reason: String },

    /// None of the requested sources existed on disk.
    #[error("Nothing to join: none of the requested audio files exist")]
    EmptyJoin,

    #[error("Speech synthesis failed for line {line} ({character}, voice {voice_id}): {message}")]
    Synthesis {
        line: u32,
        character: String,
        voice_id: String,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to replace {path}: {reason}")]
    Persist { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, AudioError>;

impl AudioError {
    pub(crate) fn pedal(pedal: &'static str, reason: impl Into<String>) -> Self {
        AudioError::PedalInit {
            pedal,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for AudioError {
    fn from(err: serde_json::Error) -> Self {
        AudioError::Config(err.to_string())
    }
}
