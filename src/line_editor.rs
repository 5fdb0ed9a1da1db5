//! Line Editor
//!
//! Edits a single voice line: basic edits, then the dynamics chain, then the
//! special-effect overlay, always in that order.
//!
//! # Basic edit order
//! gain → trim start → trim end → extend start → extend end → fade in →
//! fade out. Trim end is measured from the end of the already trimmed audio,
//! and fades run over the extended buffer, so a fade-in can cover prepended
//! silence.
//!
//! # Effect timing
//! The effect's volume and repeat count are applied before any timing is
//! computed. An effect that would run past the end of the line is cut at the
//! line's end and always faded out ([`DEFAULT_EFFECT_FADE_OUT_MS`] unless the
//! edit asks for a different length), so it never stops with a hard edge.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::assets::AssetCatalog;
use crate::buffer::AudioBuffer;
use crate::codec::{self, WavEncoding};
use crate::dynamics::apply_dynamics;
use crate::edits::{BasicEdit, SpecialEffectEdit};
use crate::error::Result;
use crate::session::Session;
use crate::soundboard::Soundboard;

/// Fade applied to an effect that has to be cut short.
pub const DEFAULT_EFFECT_FADE_OUT_MS: u32 = 1000;

/// Result of editing one line.
#[derive(Clone, Debug)]
pub struct LineEdit {
    /// The effect exactly as it was laid over the line, if any.
    pub effect: Option<AudioBuffer>,
    pub audio: AudioBuffer,
}

pub fn apply_basic(buffer: AudioBuffer, basic: &BasicEdit) -> AudioBuffer {
    if !basic.is_enabled() {
        return buffer;
    }
    debug!("Applying basic edits: {}", basic.adjustments().join(", "));

    let mut audio = buffer;
    audio.apply_gain_db(basic.volume_db);

    if basic.trim_in_ms != 0 {
        let start = audio.ms_to_frames(basic.trim_in_ms as f64);
        audio = audio.slice_frames(start, audio.frames());
    }
    if basic.trim_out_ms != 0 {
        let cut = audio.ms_to_frames(basic.trim_out_ms as f64);
        let end = audio.frames().saturating_sub(cut);
        audio.truncate_frames(end);
    }

    audio.prepend_silence(basic.extend_in_ms);
    audio.append_silence(basic.extend_out_ms);
    audio.fade_in(basic.fade_in_ms);
    audio.fade_out(basic.fade_out_ms);
    audio
}

/// Shape `effect` for `line` and mix it in. Returns the shaped effect and
/// the mixed line.
pub fn apply_special_effect(
    line: AudioBuffer,
    effect: &AudioBuffer,
    edit: &SpecialEffectEdit,
) -> Result<(AudioBuffer, AudioBuffer)> {
    let mut fx = effect.conformed(line.sample_rate(), line.channels())?;
    fx.apply_gain_db(edit.volume_db);
    if edit.repeat_count > 1 {
        fx = fx.repeated(edit.repeat_count);
    }

    let start_ms = edit.start_s.max(0.0) as f64 * 1000.0;
    let line_ms = line.duration_ms();
    if start_ms + fx.duration_ms() > line_ms {
        let keep_ms = (line_ms - start_ms).max(0.0);
        fx = fx.slice_ms(0.0, keep_ms);
        let fade = if edit.fade_out_ms > 0 {
            edit.fade_out_ms
        } else {
            DEFAULT_EFFECT_FADE_OUT_MS
        };
        fx.fade_out(fade);
        debug!("Effect cut to {:.0} ms with {} ms fade", fx.duration_ms(), fade);
    } else if edit.fade_out_ms > 0 {
        fx.fade_out(edit.fade_out_ms);
    }

    let mut audio = line;
    audio.overlay(&fx, start_ms)?;
    Ok((fx, audio))
}

/// The file an effect edit points at, if it can be found.
pub fn resolve_effect(edit: &SpecialEffectEdit, catalog: &AssetCatalog) -> Option<PathBuf> {
    match &edit.source_path {
        Some(path) if path.exists() => Some(path.clone()),
        Some(path) => {
            warn!("Effect file {:?} does not exist, skipping", path);
            None
        }
        None => catalog.find(&edit.name),
    }
}

/// Full per-line edit on an in-memory buffer.
pub fn edit_line(
    buffer: AudioBuffer,
    soundboard: &Soundboard,
    catalog: &AssetCatalog,
) -> Result<LineEdit> {
    let mut audio = match soundboard.basic() {
        Some(basic) => apply_basic(buffer, basic),
        None => buffer,
    };
    audio = apply_dynamics(audio, soundboard)?;

    let Some(edit) = soundboard.special_effect().filter(|e| e.is_enabled()) else {
        return Ok(LineEdit {
            effect: None,
            audio,
        });
    };
    let Some(path) = resolve_effect(edit, catalog) else {
        return Ok(LineEdit {
            effect: None,
            audio,
        });
    };

    info!("Applying effect '{}' from {:?}", edit.name, path);
    let source = codec::decode(&path)?;
    let (fx, audio) = apply_special_effect(audio, &source, edit)?;
    Ok(LineEdit {
        effect: Some(fx),
        audio,
    })
}

fn edit_line_file(path: &Path, soundboard: &Soundboard, catalog: &AssetCatalog) -> Result<LineEdit> {
    let buffer = codec::decode(path)?;
    edit_line(buffer, soundboard, catalog)
}

/// Edit `line{line}` in memory. Nothing is written.
pub fn preview_line(session: &Session, line: u32, soundboard: &Soundboard) -> Result<LineEdit> {
    edit_line_file(&session.line_path(line), soundboard, &session.effects())
}

/// Edit `line{line}` and replace the file with the result.
pub fn apply_line(session: &mut Session, line: u32, soundboard: &Soundboard) -> Result<LineEdit> {
    let path = session.line_path(line);
    let edit = edit_line_file(&path, soundboard, &session.effects())?;
    codec::write_atomic(&edit.audio, &path, WavEncoding::Pcm16)?;
    info!("Line {} updated ({})", line, soundboard.adjustments().join(", "));
    Ok(edit)
}
