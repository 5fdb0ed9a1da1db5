//! Render job documents.
//!
//! A job names a session, the dialogue it holds, optional per-line edits and
//! an optional mastering pass. Every field except the session and the
//! dialogue has a default.
//!
//! ```json
//! {
//!   "session_id": "demo",
//!   "characters": [{ "name": "Narrator", "voice": "Brian", "voice_id": "v1" }],
//!   "lines": [{ "character": "Narrator", "line": 1, "text": "Hello." }],
//!   "line_edits": { "1": [{ "kind": "basic", "volume_db": -3.0 }] },
//!   "mastering": {
//!     "selection": { "mode": "groups", "groups": [2] },
//!     "soundboard": [{ "kind": "compressor", "threshold_db": -20.0, "ratio": 4.0 }]
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dialogue::{Character, Dialogue, DialogueLine, Selection};
use crate::error::{AudioError, Result};
use crate::join::DEFAULT_GAP_MS;
use crate::mastering::MasteringRequest;
use crate::session::Session;
use crate::soundboard::Soundboard;

fn default_sessions_root() -> PathBuf {
    PathBuf::from("sessions")
}

fn default_effects_dir() -> PathBuf {
    PathBuf::from("effects")
}

fn default_backgrounds_dir() -> PathBuf {
    PathBuf::from("backgrounds")
}

fn default_gap_ms() -> u32 {
    DEFAULT_GAP_MS
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MasteringJob {
    #[serde(default)]
    pub selection: Selection,
    #[serde(default)]
    pub soundboard: Soundboard,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    #[serde(default = "default_sessions_root")]
    pub sessions_root: PathBuf,
    pub session_id: String,
    /// Shared effect folder, searched after the session's own.
    #[serde(default = "default_effects_dir")]
    pub effects_dir: PathBuf,
    /// Shared background folder, searched after the session's own.
    #[serde(default = "default_backgrounds_dir")]
    pub backgrounds_dir: PathBuf,
    #[serde(default = "default_gap_ms")]
    pub gap_ms: u32,
    pub characters: Vec<Character>,
    pub lines: Vec<DialogueLine>,
    /// Soundboard per line number.
    #[serde(default)]
    pub line_edits: BTreeMap<u32, Soundboard>,
    #[serde(default)]
    pub mastering: Option<MasteringJob>,
}

impl RenderJob {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        text.parse()
    }

    /// Validated dialogue of the job.
    pub fn dialogue(&self) -> Result<Dialogue> {
        Dialogue::new(self.characters.clone(), self.lines.clone())
    }

    pub fn open_session(&self) -> Result<Session> {
        if self.session_id.is_empty() {
            return Err(AudioError::Config("session_id must not be empty".into()));
        }
        Ok(Session::open(&self.sessions_root, &self.session_id)?
            .with_shared_assets(&self.effects_dir, &self.backgrounds_dir))
    }

    /// The mastering pass as an engine request, if the job has one.
    pub fn mastering_request(&self) -> Result<Option<MasteringRequest>> {
        let Some(job) = &self.mastering else {
            return Ok(None);
        };
        let dialogue = self.dialogue()?;
        Ok(Some(MasteringRequest {
            lines: dialogue.line_numbers(),
            affected: dialogue.affected_lines(&job.selection),
            soundboard: job.soundboard.clone(),
            gap_ms: self.gap_ms,
        }))
    }
}

impl std::str::FromStr for RenderJob {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self> {
        let job: RenderJob = serde_json::from_str(s)?;
        if let Some(line) = job.line_edits.keys().find(|n| !job.lines.iter().any(|l| l.line == **n)) {
            return Err(AudioError::Config(format!(
                "edits given for line {line}, which is not in the dialogue"
            )));
        }
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edits::EditKind;

    const JOB: &str = r#"{
        "session_id": "demo",
        "characters": [
            { "name": "Narrator", "voice": "Brian", "voice_id": "v1" },
            { "name": "Mira", "voice": "Rachel", "voice_id": "v2", "group": 2 }
        ],
        "lines": [
            { "character": "Narrator", "line": 1, "text": "Once." },
            { "character": "Mira", "line": 2, "text": "Twice." },
            { "character": "Narrator", "line": 3, "text": "Thrice." }
        ],
        "line_edits": { "2": [{ "kind": "basic", "volume_db": -3.0 }] },
        "mastering": {
            "selection": { "mode": "groups", "groups": [2] },
            "soundboard": [
                { "kind": "compressor", "threshold_db": -20.0, "ratio": 4.0 },
                { "kind": "normalization", "enabled": true }
            ]
        }
    }"#;

    #[test]
    fn test_parse_job_with_defaults() {
        let job: RenderJob = JOB.parse().unwrap();
        assert_eq!(job.gap_ms, DEFAULT_GAP_MS);
        assert_eq!(job.sessions_root, PathBuf::from("sessions"));
        assert_eq!(job.characters[0].group, 1);
        assert!(job.line_edits[&2].basic().is_some());
    }

    #[test]
    fn test_mastering_request_from_groups() {
        let job: RenderJob = JOB.parse().unwrap();
        let request = job.mastering_request().unwrap().unwrap();
        assert_eq!(request.lines, vec![1, 2, 3]);
        assert_eq!(request.affected, vec![2]);
        assert!(request.soundboard.get(EditKind::Compressor).is_some());
        assert!(request.soundboard.normalization().unwrap().enabled);
    }

    #[test]
    fn test_no_mastering_section() {
        let mut job: RenderJob = JOB.parse().unwrap();
        job.mastering = None;
        assert!(job.mastering_request().unwrap().is_none());
    }

    #[test]
    fn test_edits_for_unknown_line_rejected() {
        let bad = JOB.replace(r#""line_edits": { "2""#, r#""line_edits": { "9""#);
        assert!(matches!(bad.parse::<RenderJob>(), Err(AudioError::Config(_))));
    }

    #[test]
    fn test_unknown_character_rejected() {
        let bad = JOB.replace(r#""character": "Mira""#, r#""character": "Ghost""#);
        let job: RenderJob = bad.parse().unwrap();
        assert!(job.dialogue().is_err());
    }

    #[test]
    fn test_from_path_and_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        let root = dir.path().join("sessions");
        let json = JOB.replacen(
            "{",
            &format!("{{ \"sessions_root\": {:?},", root.display().to_string()),
            1,
        );
        fs::write(&path, json).unwrap();

        let job = RenderJob::from_path(&path).unwrap();
        let session = job.open_session().unwrap();
        assert_eq!(session.dir(), root.join("demo"));
        assert!(session.audio_dir().is_dir());
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        assert!(matches!("{ nope".parse::<RenderJob>(), Err(AudioError::Config(_))));
    }
}
