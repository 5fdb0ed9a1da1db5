//! Edit descriptors.
//!
//! Each descriptor is a plain parameter record. There is no per-effect on/off
//! switch: a descriptor is enabled exactly when its parameters differ from the
//! inert default, and an inert descriptor is a no-op wherever it is applied.
//! Parameters are stored verbatim; range checks happen when a pedal is built.
//!
//! Descriptors serialize with an internal `kind` tag so a soundboard can be
//! written in a render job as a plain JSON list.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dsp::{Chorus, Compressor, Distortion, Limiter, NoiseGate, Pedal, Reverb};
use crate::error::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    Basic,
    Compressor,
    Limiter,
    NoiseGate,
    Distortion,
    Chorus,
    Reverb,
    SpecialEffect,
    Background,
    Normalization,
}

impl EditKind {
    /// Position in the fixed processing order, `None` for kinds that are not
    /// pedals.
    pub fn chain_rank(self) -> Option<usize> {
        match self {
            EditKind::Distortion => Some(0),
            EditKind::Chorus => Some(1),
            EditKind::Reverb => Some(2),
            EditKind::NoiseGate => Some(3),
            EditKind::Limiter => Some(4),
            EditKind::Compressor => Some(5),
            EditKind::Basic
            | EditKind::SpecialEffect
            | EditKind::Background
            | EditKind::Normalization => None,
        }
    }

    pub fn is_pedal(self) -> bool {
        self.chain_rank().is_some()
    }
}

/// Descriptors that map onto one DSP pedal instance.
pub trait PedalEdit {
    fn pedal_name(&self) -> &'static str;

    /// Instantiate the pedal for `sample_rate`. Fails if the parameters are
    /// outside what the pedal accepts.
    fn build(&self, sample_rate: f32) -> Result<Box<dyn Pedal>>;
}

// =============================================================================
// Basic
// =============================================================================

/// Volume, trims, fades and silence extension for one line.
///
/// `fade_out_ms` and `trim_out_ms` count back from the end of the audio they
/// are applied to. `duration_ms` records the length of the source the ranges
/// were chosen against and has no effect on processing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicEdit {
    pub duration_ms: u32,
    pub volume_db: f32,
    pub fade_in_ms: u32,
    pub fade_out_ms: u32,
    pub trim_in_ms: u32,
    pub trim_out_ms: u32,
    pub extend_in_ms: u32,
    pub extend_out_ms: u32,
}

impl BasicEdit {
    /// Build from absolute slider ranges over a source of `duration_ms`.
    /// `fade` and `trim` are `(start, end)` positions; the end positions are
    /// converted to offsets from the end of the source.
    pub fn from_ranges(
        duration_ms: u32,
        volume_db: f32,
        fade: (u32, u32),
        trim: (u32, u32),
        extend: (u32, u32),
    ) -> Self {
        Self {
            duration_ms,
            volume_db,
            fade_in_ms: fade.0,
            fade_out_ms: duration_ms.saturating_sub(fade.1),
            trim_in_ms: trim.0,
            trim_out_ms: duration_ms.saturating_sub(trim.1),
            extend_in_ms: extend.0,
            extend_out_ms: extend.1,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.volume_db != 0.0
            || self.fade_in_ms != 0
            || self.fade_out_ms != 0
            || self.trim_in_ms != 0
            || self.trim_out_ms != 0
            || self.extend_in_ms != 0
            || self.extend_out_ms != 0
    }

    pub fn adjustments(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.volume_db != 0.0 {
            out.push(format!("Volume:{}dB", self.volume_db));
        }
        if self.fade_in_ms != 0 {
            out.push(format!("Fade In:{}ms", self.fade_in_ms));
        }
        if self.fade_out_ms != 0 {
            out.push(format!("Fade Out:{}ms", self.fade_out_ms));
        }
        if self.trim_in_ms != 0 {
            out.push(format!("Trim Start:{}ms", self.trim_in_ms));
        }
        if self.trim_out_ms != 0 {
            out.push(format!("Trim End:{}ms", self.trim_out_ms));
        }
        if self.extend_in_ms != 0 {
            out.push(format!("Extend In:{}ms", self.extend_in_ms));
        }
        if self.extend_out_ms != 0 {
            out.push(format!("Extend Out:{}ms", self.extend_out_ms));
        }
        out
    }
}

// =============================================================================
// Pedals
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorEdit {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
}

impl CompressorEdit {
    pub fn is_enabled(&self) -> bool {
        self.threshold_db != 0.0
    }
}

impl PedalEdit for CompressorEdit {
    fn pedal_name(&self) -> &'static str {
        "Compressor"
    }

    fn build(&self, sample_rate: f32) -> Result<Box<dyn Pedal>> {
        Ok(Box::new(Compressor::new(
            self.threshold_db,
            self.ratio,
            self.attack_ms,
            self.release_ms,
            sample_rate,
        )?))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterEdit {
    pub threshold_db: f32,
    pub release_ms: f32,
}

impl LimiterEdit {
    pub fn is_enabled(&self) -> bool {
        self.threshold_db != 0.0
    }
}

impl PedalEdit for LimiterEdit {
    fn pedal_name(&self) -> &'static str {
        "Limiter"
    }

    fn build(&self, sample_rate: f32) -> Result<Box<dyn Pedal>> {
        Ok(Box::new(Limiter::new(
            self.threshold_db,
            self.release_ms,
            sample_rate,
        )?))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseGateEdit {
    pub threshold_db: f32,
    pub ratio: f32,
}

impl NoiseGateEdit {
    pub fn is_enabled(&self) -> bool {
        self.threshold_db != 0.0
    }
}

impl PedalEdit for NoiseGateEdit {
    fn pedal_name(&self) -> &'static str {
        "NoiseGate"
    }

    fn build(&self, sample_rate: f32) -> Result<Box<dyn Pedal>> {
        Ok(Box::new(NoiseGate::new(
            self.threshold_db,
            self.ratio,
            sample_rate,
        )?))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistortionEdit {
    pub drive_db: f32,
}

impl DistortionEdit {
    pub fn is_enabled(&self) -> bool {
        self.drive_db != 0.0
    }
}

impl PedalEdit for DistortionEdit {
    fn pedal_name(&self) -> &'static str {
        "Distortion"
    }

    fn build(&self, _sample_rate: f32) -> Result<Box<dyn Pedal>> {
        Ok(Box::new(Distortion::new(self.drive_db)?))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChorusEdit {
    pub rate_hz: f32,
    pub depth: f32,
    pub centre_delay_ms: f32,
    pub feedback: f32,
}

impl ChorusEdit {
    pub fn is_enabled(&self) -> bool {
        self.rate_hz != 0.0
    }
}

impl PedalEdit for ChorusEdit {
    fn pedal_name(&self) -> &'static str {
        "Chorus"
    }

    fn build(&self, sample_rate: f32) -> Result<Box<dyn Pedal>> {
        Ok(Box::new(Chorus::new(
            self.rate_hz,
            self.depth,
            self.centre_delay_ms,
            self.feedback,
            sample_rate,
        )?))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbEdit {
    pub room_size: f32,
    pub damping: f32,
    pub wet_level: f32,
    pub dry_level: f32,
}

impl ReverbEdit {
    pub fn is_enabled(&self) -> bool {
        self.room_size != 0.0
    }
}

impl PedalEdit for ReverbEdit {
    fn pedal_name(&self) -> &'static str {
        "Reverb"
    }

    fn build(&self, sample_rate: f32) -> Result<Box<dyn Pedal>> {
        Ok(Box::new(Reverb::new(
            self.room_size,
            self.damping,
            self.wet_level,
            self.dry_level,
            sample_rate,
        )?))
    }
}

// =============================================================================
// Overlays and flags
// =============================================================================

/// A sound laid over a line at `start_s` seconds.
///
/// `source_path` pins a specific file; otherwise `name` is resolved through
/// the asset catalog when the edit is applied.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialEffectEdit {
    pub name: String,
    pub source_path: Option<PathBuf>,
    pub volume_db: f32,
    pub fade_out_ms: u32,
    pub start_s: f32,
    pub repeat_count: u32,
}

impl SpecialEffectEdit {
    pub fn is_enabled(&self) -> bool {
        !self.name.is_empty() || self.source_path.is_some()
    }

    pub fn adjustments(&self) -> Vec<String> {
        vec![capitalize(&self.name)]
    }
}

/// Soundtrack bed mixed under a timeline or part.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundEdit {
    pub track_name: String,
    pub fade_in: bool,
    pub fade_out: bool,
    /// Attenuation applied to the bed, in dB.
    pub lower_db: f32,
}

impl BackgroundEdit {
    pub fn is_enabled(&self) -> bool {
        !self.track_name.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationEdit {
    pub enabled: bool,
}

// =============================================================================
// Descriptor
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditDescriptor {
    Basic(BasicEdit),
    Compressor(CompressorEdit),
    Limiter(LimiterEdit),
    NoiseGate(NoiseGateEdit),
    Distortion(DistortionEdit),
    Chorus(ChorusEdit),
    Reverb(ReverbEdit),
    SpecialEffect(SpecialEffectEdit),
    Background(BackgroundEdit),
    Normalization(NormalizationEdit),
}

impl EditDescriptor {
    pub fn kind(&self) -> EditKind {
        match self {
            EditDescriptor::Basic(_) => EditKind::Basic,
            EditDescriptor::Compressor(_) => EditKind::Compressor,
            EditDescriptor::Limiter(_) => EditKind::Limiter,
            EditDescriptor::NoiseGate(_) => EditKind::NoiseGate,
            EditDescriptor::Distortion(_) => EditKind::Distortion,
            EditDescriptor::Chorus(_) => EditKind::Chorus,
            EditDescriptor::Reverb(_) => EditKind::Reverb,
            EditDescriptor::SpecialEffect(_) => EditKind::SpecialEffect,
            EditDescriptor::Background(_) => EditKind::Background,
            EditDescriptor::Normalization(_) => EditKind::Normalization,
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            EditDescriptor::Basic(e) => e.is_enabled(),
            EditDescriptor::Compressor(e) => e.is_enabled(),
            EditDescriptor::Limiter(e) => e.is_enabled(),
            EditDescriptor::NoiseGate(e) => e.is_enabled(),
            EditDescriptor::Distortion(e) => e.is_enabled(),
            EditDescriptor::Chorus(e) => e.is_enabled(),
            EditDescriptor::Reverb(e) => e.is_enabled(),
            EditDescriptor::SpecialEffect(e) => e.is_enabled(),
            EditDescriptor::Background(e) => e.is_enabled(),
            EditDescriptor::Normalization(e) => e.enabled,
        }
    }

    /// Display labels for this descriptor.
    pub fn adjustments(&self) -> Vec<String> {
        match self {
            EditDescriptor::Basic(e) => e.adjustments(),
            EditDescriptor::Compressor(e) => vec![format!("Compressor:{}dB", e.threshold_db)],
            EditDescriptor::Limiter(e) => vec![format!("Limiter:{}dB", e.threshold_db)],
            EditDescriptor::NoiseGate(e) => vec![format!("Noise Gate:{}dB", e.threshold_db)],
            EditDescriptor::Distortion(e) => vec![format!("Distortion:{}dB", e.drive_db)],
            EditDescriptor::Chorus(e) => vec![format!("Chorus:{}Hz", e.rate_hz)],
            EditDescriptor::Reverb(e) => vec![format!("Reverb:{}", e.room_size)],
            EditDescriptor::SpecialEffect(e) => e.adjustments(),
            EditDescriptor::Background(e) => vec![format!("Background:{}", e.track_name)],
            EditDescriptor::Normalization(_) => vec!["Audiobook Normalization".to_string()],
        }
    }

    /// The pedal view of this descriptor, if it is a DSP kind.
    pub fn as_pedal(&self) -> Option<&dyn PedalEdit> {
        match self {
            EditDescriptor::Compressor(e) => Some(e),
            EditDescriptor::Limiter(e) => Some(e),
            EditDescriptor::NoiseGate(e) => Some(e),
            EditDescriptor::Distortion(e) => Some(e),
            EditDescriptor::Chorus(e) => Some(e),
            EditDescriptor::Reverb(e) => Some(e),
            EditDescriptor::Basic(_)
            | EditDescriptor::SpecialEffect(_)
            | EditDescriptor::Background(_)
            | EditDescriptor::Normalization(_) => None,
        }
    }
}

macro_rules! impl_from_edit {
    ($($edit:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$edit> for EditDescriptor {
                fn from(edit: $edit) -> Self {
                    EditDescriptor::$variant(edit)
                }
            }
        )*
    };
}

impl_from_edit! {
    BasicEdit => Basic,
    CompressorEdit => Compressor,
    LimiterEdit => Limiter,
    NoiseGateEdit => NoiseGate,
    DistortionEdit => Distortion,
    ChorusEdit => Chorus,
    ReverbEdit => Reverb,
    SpecialEffectEdit => SpecialEffect,
    BackgroundEdit => Background,
    NormalizationEdit => Normalization,
}

/// First character upper-cased, the rest lower-cased.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_disabled() {
        let inert: Vec<EditDescriptor> = vec![
            BasicEdit::default().into(),
            CompressorEdit::default().into(),
            LimiterEdit::default().into(),
            NoiseGateEdit::default().into(),
            DistortionEdit::default().into(),
            ChorusEdit::default().into(),
            ReverbEdit::default().into(),
            SpecialEffectEdit::default().into(),
            BackgroundEdit::default().into(),
            NormalizationEdit::default().into(),
        ];
        assert!(inert.iter().all(|e| !e.is_enabled()));
    }

    #[test]
    fn test_basic_duration_alone_is_not_enabled() {
        let edit = BasicEdit {
            duration_ms: 2500,
            ..Default::default()
        };
        assert!(!edit.is_enabled());
        assert!(edit.adjustments().is_empty());
    }

    #[test]
    fn test_from_ranges_converts_end_positions() {
        let edit = BasicEdit::from_ranges(3000, -2.0, (250, 2500), (100, 2900), (0, 400));
        assert_eq!(edit.fade_in_ms, 250);
        assert_eq!(edit.fade_out_ms, 500);
        assert_eq!(edit.trim_in_ms, 100);
        assert_eq!(edit.trim_out_ms, 100);
        assert_eq!(edit.extend_out_ms, 400);

        let untouched = BasicEdit::from_ranges(3000, 0.0, (0, 3000), (0, 3000), (0, 0));
        assert!(!untouched.is_enabled());
    }

    #[test]
    fn test_adjustment_labels() {
        let basic = BasicEdit {
            volume_db: 3.0,
            fade_in_ms: 200,
            trim_out_ms: 50,
            ..Default::default()
        };
        assert_eq!(
            basic.adjustments(),
            vec!["Volume:3dB", "Fade In:200ms", "Trim End:50ms"]
        );

        let reverb: EditDescriptor = ReverbEdit {
            room_size: 0.5,
            ..Default::default()
        }
        .into();
        assert_eq!(reverb.adjustments(), vec!["Reverb:0.5"]);

        let effect: EditDescriptor = SpecialEffectEdit {
            name: "door SLAM".into(),
            ..Default::default()
        }
        .into();
        assert_eq!(effect.adjustments(), vec!["Door slam"]);
    }

    #[test]
    fn test_canonical_rank_covers_pedals_only() {
        let ranked: Vec<_> = [
            EditKind::Distortion,
            EditKind::Chorus,
            EditKind::Reverb,
            EditKind::NoiseGate,
            EditKind::Limiter,
            EditKind::Compressor,
        ]
        .iter()
        .map(|k| k.chain_rank().unwrap())
        .collect();
        assert_eq!(ranked, vec![0, 1, 2, 3, 4, 5]);
        assert!(!EditKind::Background.is_pedal());
        assert!(!EditKind::Basic.is_pedal());
    }

    #[test]
    fn test_pedal_build_reports_name() {
        let edit: EditDescriptor = CompressorEdit {
            threshold_db: -20.0,
            ratio: 0.0,
            ..Default::default()
        }
        .into();
        let err = edit.as_pedal().unwrap().build(44_100.0).err().unwrap();
        assert!(err.to_string().starts_with("Compressor"));
    }

    #[test]
    fn test_serde_tagging() {
        let json = r#"[
            {"kind": "limiter", "threshold_db": -1.0, "release_ms": 250.0},
            {"kind": "background", "track_name": "rain", "fade_in": true},
            {"kind": "normalization", "enabled": true}
        ]"#;
        let edits: Vec<EditDescriptor> = serde_json::from_str(json).unwrap();
        assert_eq!(edits[0].kind(), EditKind::Limiter);
        assert!(edits.iter().all(|e| e.is_enabled()));
        match &edits[1] {
            EditDescriptor::Background(bg) => {
                assert!(bg.fade_in && !bg.fade_out);
                assert_eq!(bg.lower_db, 0.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
