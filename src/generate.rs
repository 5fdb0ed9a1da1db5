//! Line generation through an external speech service.
//!
//! The service is an opaque `(text, voice_id, settings) -> bytes` call behind
//! [`SpeechSynthesizer`]. Each returned blob is decoded and stored as
//! `line{N}.wav`. The batch stops at the first line that fails, and the error
//! names the line, the character and the voice.

use std::path::PathBuf;

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::codec::{self, WavEncoding};
use crate::dialogue::{Dialogue, DialogueLine};
use crate::error::{AudioError, Result};
use crate::progress::ProgressSink;
use crate::session::Session;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub model_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            model_id: String::new(),
            stability: 0.35,
            similarity_boost: 0.80,
            style: 0.0,
        }
    }
}

pub trait SpeechSynthesizer {
    /// Encoded audio (any format the codec layer can decode) for `text`.
    fn synthesize(
        &mut self,
        text: &str,
        voice_id: &str,
        settings: &VoiceSettings,
    ) -> anyhow::Result<Vec<u8>>;
}

fn synthesize_line(
    session: &Session,
    dialogue: &Dialogue,
    line: &DialogueLine,
    synth: &mut dyn SpeechSynthesizer,
    settings: &VoiceSettings,
) -> Result<PathBuf> {
    let voice_id = dialogue
        .character(&line.character)
        .map(|c| c.voice_id.clone())
        .unwrap_or_default();
    let fail = |message: String| AudioError::Synthesis {
        line: line.line,
        character: line.character.clone(),
        voice_id: voice_id.clone(),
        message,
    };

    let bytes = synth
        .synthesize(&line.text, &voice_id, settings)
        .map_err(|e| fail(format!("{e:#}")))?;
    let buffer = codec::decode_bytes(&bytes).map_err(|e| fail(e.to_string()))?;

    let path = session.line_path(line.line);
    codec::write_atomic(&buffer, &path, WavEncoding::Pcm16)?;
    Ok(path)
}

/// Generate every line of `dialogue` from scratch. Existing audio in the
/// session is cleared first.
pub fn generate_lines(
    session: &mut Session,
    dialogue: &Dialogue,
    synth: &mut dyn SpeechSynthesizer,
    settings: &VoiceSettings,
    progress: &mut dyn ProgressSink,
) -> Result<Vec<PathBuf>> {
    session.clear_audio_files()?;
    let total = dialogue.lines().len();
    info!("Generating {} lines", total);

    let mut written = Vec::with_capacity(total);
    for (i, line) in dialogue.lines().iter().enumerate() {
        match synthesize_line(session, dialogue, line, synth, settings) {
            Ok(path) => written.push(path),
            Err(e) => {
                error!("Generation stopped: {}", e);
                return Err(e);
            }
        }
        progress.report("generate", i + 1, total);
    }
    Ok(written)
}

/// Regenerate a single line in place.
pub fn regenerate_line(
    session: &mut Session,
    dialogue: &Dialogue,
    line: u32,
    synth: &mut dyn SpeechSynthesizer,
    settings: &VoiceSettings,
) -> Result<PathBuf> {
    let entry = dialogue
        .lines()
        .iter()
        .find(|l| l.line == line)
        .ok_or_else(|| AudioError::Config(format!("no dialogue line {line}")))?;
    info!("Regenerating line {}", line);
    synthesize_line(session, dialogue, entry, synth, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::AudioBuffer;
    use crate::dialogue::Character;
    use crate::progress::NoProgress;

    /// Returns a short WAV per call and fails on the configured call.
    struct FakeService {
        calls: Vec<String>,
        fail_on: Option<usize>,
    }

    impl SpeechSynthesizer for FakeService {
        fn synthesize(
            &mut self,
            text: &str,
            _voice_id: &str,
            _settings: &VoiceSettings,
        ) -> anyhow::Result<Vec<u8>> {
            self.calls.push(text.to_string());
            if self.fail_on == Some(self.calls.len()) {
                anyhow::bail!("quota exceeded");
            }
            let clip = AudioBuffer::silent(250, 16_000, 1);
            Ok(codec::encode_bytes(&clip, WavEncoding::Pcm16)?)
        }
    }

    fn dialogue() -> Dialogue {
        let line = |c: &str, n: u32| DialogueLine {
            character: c.into(),
            line: n,
            text: format!("text {n}"),
        };
        Dialogue::new(
            vec![
                Character::new("Narrator", "Brian", "v-narr"),
                Character::new("Mira", "Rachel", "v-mira"),
            ],
            vec![line("Narrator", 1), line("Mira", 2), line("Narrator", 3)],
        )
        .unwrap()
    }

    #[test]
    fn test_generates_every_line() {
        let root = tempfile::tempdir().unwrap();
        let mut session = Session::open(root.path(), "s").unwrap();
        let mut service = FakeService {
            calls: Vec::new(),
            fail_on: None,
        };
        let paths = generate_lines(
            &mut session,
            &dialogue(),
            &mut service,
            &VoiceSettings::default(),
            &mut NoProgress,
        )
        .unwrap();
        assert_eq!(paths.len(), 3);
        assert!(session.line_path(2).is_file());
        assert!((codec::decode(&paths[0]).unwrap().duration_ms() - 250.0).abs() < 1e-6);
    }

    #[test]
    fn test_stops_at_first_failure() {
        let root = tempfile::tempdir().unwrap();
        let mut session = Session::open(root.path(), "s").unwrap();
        let mut service = FakeService {
            calls: Vec::new(),
            fail_on: Some(2),
        };
        let err = generate_lines(
            &mut session,
            &dialogue(),
            &mut service,
            &VoiceSettings::default(),
            &mut NoProgress,
        )
        .err()
        .unwrap();

        match err {
            AudioError::Synthesis {
                line,
                character,
                voice_id,
                message,
            } => {
                assert_eq!(line, 2);
                assert_eq!(character, "Mira");
                assert_eq!(voice_id, "v-mira");
                assert!(message.contains("quota"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(service.calls.len(), 2);
        assert!(session.line_path(1).is_file());
        assert!(!session.line_path(3).exists());
    }

    #[test]
    fn test_regenerate_single_line() {
        let root = tempfile::tempdir().unwrap();
        let mut session = Session::open(root.path(), "s").unwrap();
        let mut service = FakeService {
            calls: Vec::new(),
            fail_on: None,
        };
        let d = dialogue();
        let path =
            regenerate_line(&mut session, &d, 3, &mut service, &VoiceSettings::default()).unwrap();
        assert_eq!(path, session.line_path(3));
        assert_eq!(service.calls, vec!["text 3"]);
        assert!(regenerate_line(&mut session, &d, 9, &mut service, &VoiceSettings::default()).is_err());
    }

    #[test]
    fn test_voice_settings_defaults() {
        let s = VoiceSettings::default();
        assert_eq!(s.stability, 0.35);
        assert_eq!(s.similarity_boost, 0.80);
        assert_eq!(s.style, 0.0);
    }
}
