//! Per-session working state.
//!
//! A session owns one directory tree:
//!
//! ```text
//! <root>/<id>/audio/line{N}.wav          per-line recordings
//! <root>/<id>/audio/dialogue.wav         joined timeline
//! <root>/<id>/audio/dialogue_org.wav     copy taken before a mastering apply
//! <root>/<id>/effects/                   uploaded effects
//! <root>/<id>/backgrounds/               session background beds
//! <root>/<id>/temp/                      scratch renders
//! ```
//!
//! Operations that replace a line, the timeline or the backup take
//! `&mut Session`, so one session value is only ever driven by one of them at
//! a time. Previews only write below `temp/` and take `&Session`.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::assets::AssetCatalog;
use crate::codec::AUDIO_EXT;
use crate::error::Result;
use crate::join::{self, line_file_name, JoinSummary};
use crate::progress::ProgressSink;

pub const DIALOGUE_STEM: &str = "dialogue";

#[derive(Debug)]
pub struct Session {
    id: String,
    dir: PathBuf,
    shared_effects: PathBuf,
    shared_backgrounds: PathBuf,
    /// Adjustment labels of the last mastering apply; `None` while the live
    /// timeline is a plain join.
    background_added: Option<String>,
}

impl Session {
    /// Open (creating if needed) the session `id` under `sessions_root`.
    pub fn open(sessions_root: impl AsRef<Path>, id: &str) -> Result<Self> {
        let dir = sessions_root.as_ref().join(id);
        let session = Self {
            id: id.to_string(),
            shared_effects: PathBuf::from("effects"),
            shared_backgrounds: PathBuf::from("backgrounds"),
            dir,
            background_added: None,
        };
        fs::create_dir_all(session.audio_dir())?;
        fs::create_dir_all(session.scratch_dir())?;
        info!("Opened session '{}' at {:?}", id, session.dir);
        Ok(session)
    }

    /// Point the shared asset locations somewhere other than `./effects` and
    /// `./backgrounds`.
    pub fn with_shared_assets(
        mut self,
        effects: impl Into<PathBuf>,
        backgrounds: impl Into<PathBuf>,
    ) -> Self {
        self.shared_effects = effects.into();
        self.shared_backgrounds = backgrounds.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.dir.join("audio")
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.dir.join("temp")
    }

    pub fn line_path(&self, line: u32) -> PathBuf {
        self.audio_dir().join(line_file_name(line))
    }

    pub fn dialogue_path(&self) -> PathBuf {
        self.audio_dir().join(format!("{DIALOGUE_STEM}.{AUDIO_EXT}"))
    }

    pub fn dialogue_backup_path(&self) -> PathBuf {
        self.audio_dir().join(format!("{DIALOGUE_STEM}_org.{AUDIO_EXT}"))
    }

    pub fn effects(&self) -> AssetCatalog {
        AssetCatalog::new(self.dir.join("effects"), &self.shared_effects)
    }

    pub fn backgrounds(&self) -> AssetCatalog {
        AssetCatalog::new(self.dir.join("backgrounds"), &self.shared_backgrounds)
    }

    pub fn background_added(&self) -> Option<&str> {
        self.background_added.as_deref()
    }

    pub(crate) fn set_background_added(&mut self, labels: String) {
        self.background_added = Some(labels);
    }

    /// Rebuild the live timeline from line files. Any mastering marker is
    /// dropped since the new timeline carries no background.
    pub fn join_dialogue(
        &mut self,
        lines: &[u32],
        gap_ms: u32,
        progress: &mut dyn ProgressSink,
    ) -> Result<JoinSummary> {
        let summary = join::join(
            lines,
            gap_ms,
            &self.audio_dir(),
            &self.dialogue_path(),
            progress,
        )?;
        self.background_added = None;
        Ok(summary)
    }

    /// Remove every audio artifact of the session and start with an empty
    /// audio folder.
    pub fn clear_audio_files(&mut self) -> Result<()> {
        let audio = self.audio_dir();
        if audio.exists() {
            fs::remove_dir_all(&audio)?;
        }
        let scratch = self.scratch_dir();
        if scratch.exists() {
            fs::remove_dir_all(&scratch)?;
        }
        fs::create_dir_all(&audio)?;
        fs::create_dir_all(&scratch)?;
        self.background_added = None;
        info!("Cleared audio files of session '{}'", self.id);
        Ok(())
    }
}
