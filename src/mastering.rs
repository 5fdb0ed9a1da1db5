//! Mastering Engine
//!
//! Re-renders the full timeline with a soundboard applied to a selection of
//! lines only.
//!
//! # Pipeline
//! 1. Split the timeline into parts: maximal runs of consecutive lines that
//!    are all affected or all unaffected.
//! 2. Render each part into `part{N}.wav` by joining its lines. Affected parts
//!    also go through the dynamics chain and get the background bed. Part
//!    files are cached under a fingerprint of everything that shapes them, so
//!    an unchanged part is never rendered twice.
//! 3. Join the parts, in order, into one timeline.
//! 4. If normalization is on, run the audiobook preset over the whole
//!    timeline once and measure the result.
//!
//! # Failure
//! Missing line files are skipped. A pedal that fails to initialize aborts
//! the pass at the part that needed it; parts already written stay valid.
//! Every file is written to a temp sibling and renamed into place, and
//! [`apply`] only touches the live timeline after the new one is complete and
//! the old one has been copied to the backup.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::buffer::AudioBuffer;
use crate::codec::{self, WavEncoding};
use crate::dynamics::apply_dynamics;
use crate::edits::BackgroundEdit;
use crate::error::{AudioError, Result};
use crate::join::{self, part_file_name, JoinSummary};
use crate::loudness::{self, LoudnessReport};
use crate::presets::PRESETS;
use crate::progress::ProgressSink;
use crate::session::Session;
use crate::soundboard::Soundboard;

// =============================================================================
// Constants
// =============================================================================

/// Background bed fade-in when the edit asks for one.
pub const BACKGROUND_FADE_IN_MS: u32 = 1500;
/// Background bed fade-out when the edit asks for one.
pub const BACKGROUND_FADE_OUT_MS: u32 = 1000;

const PARTS_DIR: &str = "parts";
const PREVIEW_DIR: &str = "preview";
const MASTER_DIR: &str = "master";

// =============================================================================
// Parts
// =============================================================================

/// A maximal run of consecutive timeline lines with the same status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPart {
    pub line_numbers: Vec<u32>,
    pub is_affected: bool,
}

/// Split `lines` (timeline order) into runs by membership in `affected`.
pub fn get_contiguous_lines(lines: &[u32], affected: &[u32]) -> Vec<AudioPart> {
    let mut parts: Vec<AudioPart> = Vec::new();
    for &line in lines {
        let is_affected = affected.contains(&line);
        match parts.last_mut() {
            Some(part) if part.is_affected == is_affected => part.line_numbers.push(line),
            _ => parts.push(AudioPart {
                line_numbers: vec![line],
                is_affected,
            }),
        }
    }
    parts
}

// =============================================================================
// Background
// =============================================================================

/// Fit `bed` to exactly `target_frames` at the given format. A short bed is
/// looped `ceil(excess / len) + 1` times and cut. A positive `lower_db`
/// attenuates the bed; zero or negative values leave its level alone.
pub fn prepare_background(
    bed: &AudioBuffer,
    sample_rate: u32,
    channels: u16,
    target_frames: usize,
    edit: &BackgroundEdit,
) -> Result<AudioBuffer> {
    let bed = bed.conformed(sample_rate, channels)?;
    if bed.is_empty() {
        return Ok(AudioBuffer::silent_frames(target_frames, sample_rate, channels));
    }

    let mut fitted = if bed.frames() >= target_frames {
        let mut b = bed;
        b.truncate_frames(target_frames);
        b
    } else {
        let excess = target_frames - bed.frames();
        let loops = excess.div_ceil(bed.frames()) + 1;
        let mut b = bed.repeated(loops as u32);
        b.truncate_frames(target_frames);
        b
    };

    if edit.lower_db > 0.0 {
        fitted.apply_gain_db(-edit.lower_db);
    }
    if edit.fade_in {
        fitted.fade_in(BACKGROUND_FADE_IN_MS);
    }
    if edit.fade_out {
        fitted.fade_out(BACKGROUND_FADE_OUT_MS);
    }
    Ok(fitted)
}

fn overlay_background(session: &Session, part: &mut AudioBuffer, edit: &BackgroundEdit) -> Result<()> {
    let Some(path) = session.backgrounds().find(&edit.track_name) else {
        return Ok(());
    };
    let bed = codec::decode(&path)?;
    let fitted = prepare_background(
        &bed,
        part.sample_rate(),
        part.channels(),
        part.frames(),
        edit,
    )?;
    part.overlay(&fitted, 0.0)?;
    debug!("Background '{}' mixed under part", edit.track_name);
    Ok(())
}

// =============================================================================
// Request / outcome
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MasteringRequest {
    /// Every line of the timeline, in order.
    pub lines: Vec<u32>,
    /// Lines the soundboard applies to.
    pub affected: Vec<u32>,
    pub soundboard: Soundboard,
    pub gap_ms: u32,
}

#[derive(Clone, Debug)]
pub struct MasteringOutcome {
    /// Timeline before this pass.
    pub original: PathBuf,
    /// Timeline produced by this pass.
    pub updated: PathBuf,
    pub parts: Vec<AudioPart>,
    pub summary: JoinSummary,
    /// Present when normalization ran.
    pub loudness: Option<LoudnessReport>,
}

struct Rendered {
    parts: Vec<AudioPart>,
    summary: JoinSummary,
    loudness: Option<LoudnessReport>,
}

// =============================================================================
// Rendering
// =============================================================================

fn hash_file_state(path: &Path, hasher: &mut DefaultHasher) {
    path.hash(hasher);
    if let Ok(meta) = fs::metadata(path) {
        meta.len().hash(hasher);
        if let Ok(modified) = meta.modified() {
            if let Ok(since) = modified.duration_since(UNIX_EPOCH) {
                since.as_nanos().hash(hasher);
            }
        }
    }
}

/// Fingerprint of a request plus the state of every file it reads: the line
/// files and the resolved background bed.
fn fingerprint(session: &Session, request: &MasteringRequest) -> Result<String> {
    let mut hasher = DefaultHasher::new();
    serde_json::to_string(request)?.hash(&mut hasher);
    for &line in &request.lines {
        hash_file_state(&session.line_path(line), &mut hasher);
    }
    let bed = request
        .soundboard
        .background()
        .filter(|b| b.is_enabled())
        .and_then(|b| session.backgrounds().find(&b.track_name));
    if let Some(path) = bed {
        hash_file_state(&path, &mut hasher);
    }
    Ok(format!("{:016x}", hasher.finish()))
}

/// Cache directory for `key`, with every other cached render removed.
fn parts_cache(session: &Session, key: &str) -> Result<PathBuf> {
    let root = session.scratch_dir().join(PARTS_DIR);
    fs::create_dir_all(&root)?;
    for entry in fs::read_dir(&root)? {
        let entry = entry?;
        if entry.file_name().to_str() != Some(key) && entry.path().is_dir() {
            debug!("Dropping stale part cache {:?}", entry.path());
            fs::remove_dir_all(entry.path())?;
        }
    }
    let dir = root.join(key);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn render_part(
    session: &Session,
    part: &AudioPart,
    request: &MasteringRequest,
    dest: &Path,
) -> Result<()> {
    let paths: Vec<PathBuf> = part
        .line_numbers
        .iter()
        .map(|&n| session.line_path(n))
        .collect();
    let mut silent = crate::progress::NoProgress;
    let (mut audio, _) = join::join_files(&paths, request.gap_ms, &mut silent)?;

    if part.is_affected {
        audio = apply_dynamics(audio, &request.soundboard)?;
        if let Some(bg) = request.soundboard.background().filter(|b| b.is_enabled()) {
            overlay_background(session, &mut audio, bg)?;
        }
    }
    codec::write_atomic(&audio, dest, WavEncoding::Float32)
}

fn render(
    session: &Session,
    request: &MasteringRequest,
    dest: &Path,
    progress: &mut dyn ProgressSink,
) -> Result<Rendered> {
    let parts = get_contiguous_lines(&request.lines, &request.affected);
    info!(
        "Mastering {} lines in {} parts ({})",
        request.lines.len(),
        parts.len(),
        request.soundboard.adjustments().join(", ")
    );

    let key = fingerprint(session, request)?;
    let cache = parts_cache(session, &key)?;

    for (i, part) in parts.iter().enumerate() {
        let path = cache.join(part_file_name(i + 1));
        if path.is_file() {
            debug!("Part {} cached at {:?}", i + 1, path);
        } else {
            match render_part(session, part, request, &path) {
                Ok(()) => debug!("Rendered part {} {:?}", i + 1, part.line_numbers),
                Err(AudioError::EmptyJoin) => {
                    warn!("Part {} has no audio ({:?}), skipping", i + 1, part.line_numbers)
                }
                Err(e) => return Err(e),
            }
        }
        progress.report("master", i + 1, parts.len());
    }

    let part_files = join::discover_parts(&cache)?;
    let mut silent = crate::progress::NoProgress;
    let (mut timeline, summary) = join::join_files(&part_files, request.gap_ms, &mut silent)?;

    let normalize = request
        .soundboard
        .normalization()
        .map_or(false, |n| n.enabled);
    let loudness = if normalize {
        let preset = PRESETS.audiobook();
        info!("Applying audiobook normalization");
        timeline = apply_dynamics(timeline, &preset.soundboard())?;
        let report = loudness::measure(&timeline)?;
        if preset.loudness_in_range(report.integrated_lufs) {
            info!(
                "Normalized to {:.1} LUFS, true peak {:.1} dBTP",
                report.integrated_lufs, report.true_peak_db
            );
        } else {
            warn!(
                "Normalized loudness {:.1} LUFS is outside {:.0}..{:.0} LUFS",
                report.integrated_lufs, preset.integrated_loudness_min, preset.integrated_loudness_max
            );
        }
        if !preset.true_peak_in_range(report.true_peak_db) {
            warn!(
                "True peak {:.1} dBTP is above the {:.0} dBTP ceiling",
                report.true_peak_db, preset.true_peak_ceiling
            );
        }
        Some(report)
    } else {
        None
    };

    codec::write_atomic(&timeline, dest, WavEncoding::Pcm16)?;
    Ok(Rendered {
        parts,
        summary: JoinSummary {
            duration_ms: timeline.duration_ms(),
            ..summary
        },
        loudness,
    })
}

/// Render the pass into the scratch area. The live timeline is not touched.
pub fn preview(
    session: &Session,
    request: &MasteringRequest,
    progress: &mut dyn ProgressSink,
) -> Result<MasteringOutcome> {
    let updated = session
        .scratch_dir()
        .join(PREVIEW_DIR)
        .join(session.dialogue_path().file_name().unwrap_or_default());
    let rendered = render(session, request, &updated, progress)?;
    Ok(MasteringOutcome {
        original: session.dialogue_path(),
        updated,
        parts: rendered.parts,
        summary: rendered.summary,
        loudness: rendered.loudness,
    })
}

/// Render the pass and make it the live timeline. The previous timeline is
/// kept as the backup.
pub fn apply(
    session: &mut Session,
    request: &MasteringRequest,
    progress: &mut dyn ProgressSink,
) -> Result<MasteringOutcome> {
    let live = session.dialogue_path();
    let staged = session
        .scratch_dir()
        .join(MASTER_DIR)
        .join(live.file_name().unwrap_or_default());
    let rendered = render(session, request, &staged, progress)?;

    let backup = session.dialogue_backup_path();
    if live.is_file() {
        codec::copy_atomic(&live, &backup)?;
    }
    fs::rename(&staged, &live).map_err(|e| AudioError::Persist {
        path: live.display().to_string(),
        reason: e.to_string(),
    })?;

    session.set_background_added(request.soundboard.adjustments().join(" "));
    info!("Mastered timeline written to {:?}", live);
    Ok(MasteringOutcome {
        original: backup,
        updated: live,
        parts: rendered.parts,
        summary: rendered.summary,
        loudness: rendered.loudness,
    })
}
