//! Name-based lookup of effect and background files.
//!
//! An asset's display name is its file stem with underscores shown as spaces.
//! Lookup turns spaces back into underscores and matches the stem exactly
//! (case preserved), searching the session folder before the shared one. An
//! unknown name is not an error: callers get `None` and skip the edit.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::codec::{self, WavEncoding, AUDIO_EXT};
use crate::error::{AudioError, Result};

#[derive(Clone, Debug)]
pub struct AssetCatalog {
    session_dir: PathBuf,
    shared_dir: PathBuf,
}

impl AssetCatalog {
    pub fn new(session_dir: impl Into<PathBuf>, shared_dir: impl Into<PathBuf>) -> Self {
        Self {
            session_dir: session_dir.into(),
            shared_dir: shared_dir.into(),
        }
    }

    /// Resolve a display name to a file.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        let stem = file_stem_for(name);
        if stem.is_empty() {
            return None;
        }
        let found = [&self.session_dir, &self.shared_dir]
            .into_iter()
            .find_map(|dir| find_in(dir, &stem));
        if found.is_none() {
            warn!("No asset named '{}' in {:?} or {:?}", name, self.session_dir, self.shared_dir);
        }
        found
    }

    /// Sorted display names across both locations.
    pub fn names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        for dir in [&self.session_dir, &self.shared_dir] {
            for path in audio_files(dir) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.insert(stem.replace('_', " "));
                }
            }
        }
        names.into_iter().collect()
    }

    /// Store an uploaded file in the session folder under the upload's stem.
    /// The bytes are decoded first, so unreadable uploads are rejected.
    pub fn import(&self, bytes: &[u8], upload_name: &str) -> Result<PathBuf> {
        let stem = Path::new(upload_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .map(file_stem_for)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AudioError::Config(format!("invalid asset name '{upload_name}'")))?;

        let buffer = codec::decode_bytes(bytes)?;
        let dest = self.session_dir.join(format!("{stem}.{AUDIO_EXT}"));
        codec::write_atomic(&buffer, &dest, WavEncoding::Pcm16)?;
        info!("Imported asset '{}' to {:?}", upload_name, dest);
        Ok(dest)
    }
}

fn file_stem_for(name: &str) -> String {
    name.trim().replace(' ', "_")
}

fn audio_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| !n.starts_with('.'))
        })
        .collect();
    files.sort();
    files
}

fn find_in(dir: &Path, stem: &str) -> Option<PathBuf> {
    audio_files(dir)
        .into_iter()
        .find(|p| p.file_stem().and_then(|s| s.to_str()) == Some(stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::AudioBuffer;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn test_session_location_wins() {
        let root = tempfile::tempdir().unwrap();
        let session = root.path().join("session");
        let shared = root.path().join("shared");
        touch(&shared, "door_slam.mp3");
        let local = touch(&session, "door_slam.wav");

        let catalog = AssetCatalog::new(&session, &shared);
        assert_eq!(catalog.find("door slam"), Some(local));
    }

    #[test]
    fn test_falls_back_to_shared_and_preserves_case() {
        let root = tempfile::tempdir().unwrap();
        let shared = root.path().join("shared");
        let thunder = touch(&shared, "Thunder_Clap.mp3");

        let catalog = AssetCatalog::new(root.path().join("missing"), &shared);
        assert_eq!(catalog.find("Thunder Clap"), Some(thunder));
        assert_eq!(catalog.find("thunder clap"), None);
        assert_eq!(catalog.find(""), None);
    }

    #[test]
    fn test_names_are_sorted_and_deduplicated() {
        let root = tempfile::tempdir().unwrap();
        let session = root.path().join("session");
        let shared = root.path().join("shared");
        touch(&shared, "rain.mp3");
        touch(&shared, "birds_morning.mp3");
        touch(&session, "rain.wav");

        let catalog = AssetCatalog::new(&session, &shared);
        assert_eq!(catalog.names(), vec!["birds morning", "rain"]);
    }

    #[test]
    fn test_import_decodes_and_stores() {
        let root = tempfile::tempdir().unwrap();
        let session = root.path().join("session");
        let catalog = AssetCatalog::new(&session, root.path().join("shared"));

        let clip = AudioBuffer::silent(100, 8000, 1);
        let bytes = codec::encode_bytes(&clip, WavEncoding::Pcm16).unwrap();
        let path = catalog.import(&bytes, "glass break.wav").unwrap();

        assert_eq!(path, session.join("glass_break.wav"));
        assert_eq!(catalog.find("glass break"), Some(path));
        assert!(catalog.import(b"junk", "bad.mp3").is_err());
    }
}
