//! Timeline Assembler
//!
//! Joins recordings into one timeline with a fixed silence gap between
//! consecutive segments. Every segment after the first gets a short fade-out
//! before it is spliced in.
//!
//! Joining is best effort: a requested file that does not exist is logged and
//! skipped, and the gap is only inserted between segments that are actually
//! present. For `k` present segments of durations `d_i` the result lasts
//! `sum(d_i) + (k - 1) * gap`.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::buffer::AudioBuffer;
use crate::codec::{self, WavEncoding, AUDIO_EXT};
use crate::error::{AudioError, Result};
use crate::progress::ProgressSink;

/// Fade applied to each spliced segment after the first.
pub const JOIN_FADE_OUT_MS: u32 = 300;

/// Silence between lines unless the caller asks otherwise.
pub const DEFAULT_GAP_MS: u32 = 200;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct JoinSummary {
    pub joined: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub duration_ms: f64,
}

pub fn line_file_name(line: u32) -> String {
    format!("line{line}.{AUDIO_EXT}")
}

pub fn part_file_name(part: usize) -> String {
    format!("part{part}.{AUDIO_EXT}")
}

/// Splice already loaded segments.
pub fn join_segments(segments: Vec<AudioBuffer>, gap_ms: u32) -> Result<AudioBuffer> {
    let mut iter = segments.into_iter();
    let mut timeline = iter.next().ok_or(AudioError::EmptyJoin)?;
    for mut segment in iter {
        segment.fade_out(JOIN_FADE_OUT_MS);
        timeline.append_silence(gap_ms);
        timeline.append(&segment)?;
    }
    Ok(timeline)
}

/// Load and splice `paths` in order, skipping missing files.
pub fn join_files(
    paths: &[PathBuf],
    gap_ms: u32,
    progress: &mut dyn ProgressSink,
) -> Result<(AudioBuffer, JoinSummary)> {
    let mut summary = JoinSummary::default();
    let mut segments = Vec::with_capacity(paths.len());

    for (i, path) in paths.iter().enumerate() {
        if path.is_file() {
            segments.push(codec::decode(path)?);
            summary.joined.push(path.clone());
        } else {
            warn!("Skipping missing audio file {:?}", path);
            summary.skipped.push(path.clone());
        }
        progress.report("join", i + 1, paths.len());
    }

    let timeline = join_segments(segments, gap_ms)?;
    summary.duration_ms = timeline.duration_ms();
    Ok((timeline, summary))
}

/// Join `line{N}` files from `source_dir` into `dest`.
pub fn join(
    lines: &[u32],
    gap_ms: u32,
    source_dir: &Path,
    dest: &Path,
    progress: &mut dyn ProgressSink,
) -> Result<JoinSummary> {
    join_with_encoding(lines, gap_ms, source_dir, dest, WavEncoding::Pcm16, progress)
}

pub(crate) fn join_with_encoding(
    lines: &[u32],
    gap_ms: u32,
    source_dir: &Path,
    dest: &Path,
    encoding: WavEncoding,
    progress: &mut dyn ProgressSink,
) -> Result<JoinSummary> {
    info!("Joining {} lines: {:?}", lines.len(), lines);
    let paths: Vec<PathBuf> = lines
        .iter()
        .map(|&n| source_dir.join(line_file_name(n)))
        .collect();
    let (timeline, summary) = join_files(&paths, gap_ms, progress)?;
    codec::write_atomic(&timeline, dest, encoding)?;
    info!("Joined audio written to {:?} ({:.0} ms)", dest, summary.duration_ms);
    Ok(summary)
}

/// Numeric suffix of a `part{N}.wav` file name.
fn part_index(path: &Path) -> Option<u64> {
    if path.extension().and_then(|e| e.to_str()) != Some(AUDIO_EXT) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.strip_prefix("part")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Part files in `dir`, ordered by their number (`part10` after `part2`).
pub fn discover_parts(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut parts: Vec<(u64, PathBuf)> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter_map(|p| part_index(&p).map(|n| (n, p)))
        .collect();
    parts.sort_by_key(|(n, _)| *n);
    Ok(parts.into_iter().map(|(_, p)| p).collect())
}

/// Join every part file in `parts_dir` into `dest`.
pub fn join_parts(
    parts_dir: &Path,
    gap_ms: u32,
    dest: &Path,
    progress: &mut dyn ProgressSink,
) -> Result<JoinSummary> {
    let parts = discover_parts(parts_dir)?;
    info!("Joining {} parts from {:?}", parts.len(), parts_dir);
    let (timeline, summary) = join_files(&parts, gap_ms, progress)?;
    codec::write_atomic(&timeline, dest, WavEncoding::Pcm16)?;
    Ok(summary)
}
