//! The set of edits making up one edit operation.
//!
//! Lookup by kind returns the last descriptor of that kind, so appending a
//! descriptor overrides earlier ones for the singleton accessors (`basic`,
//! `background`, ...). Batch processing is different: every enabled pedal in
//! the board contributes to the chain, duplicates included. Callers that want
//! a single compressor must add a single compressor.

use serde::{Deserialize, Serialize};

use crate::edits::{
    BackgroundEdit, BasicEdit, EditDescriptor, EditKind, NormalizationEdit, PedalEdit,
    SpecialEffectEdit,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Soundboard {
    edits: Vec<EditDescriptor>,
}

impl Soundboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, edit: impl Into<EditDescriptor>) -> &mut Self {
        self.edits.push(edit.into());
        self
    }

    pub fn extend<I>(&mut self, edits: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<EditDescriptor>,
    {
        self.edits.extend(edits.into_iter().map(Into::into));
        self
    }

    /// Builder form of [`Soundboard::add`].
    pub fn with(mut self, edit: impl Into<EditDescriptor>) -> Self {
        self.add(edit);
        self
    }

    pub fn edits(&self) -> &[EditDescriptor] {
        &self.edits
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Last-added descriptor of `kind`.
    pub fn get(&self, kind: EditKind) -> Option<&EditDescriptor> {
        self.edits.iter().rev().find(|e| e.kind() == kind)
    }

    pub fn basic(&self) -> Option<&BasicEdit> {
        match self.get(EditKind::Basic)? {
            EditDescriptor::Basic(e) => Some(e),
            _ => None,
        }
    }

    pub fn background(&self) -> Option<&BackgroundEdit> {
        match self.get(EditKind::Background)? {
            EditDescriptor::Background(e) => Some(e),
            _ => None,
        }
    }

    pub fn normalization(&self) -> Option<&NormalizationEdit> {
        match self.get(EditKind::Normalization)? {
            EditDescriptor::Normalization(e) => Some(e),
            _ => None,
        }
    }

    pub fn special_effect(&self) -> Option<&SpecialEffectEdit> {
        match self.get(EditKind::SpecialEffect)? {
            EditDescriptor::SpecialEffect(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.edits.iter().any(EditDescriptor::is_enabled)
    }

    pub fn enabled(&self) -> Vec<&EditDescriptor> {
        self.edits.iter().filter(|e| e.is_enabled()).collect()
    }

    /// All pedal descriptors in insertion order, enabled or not.
    pub fn pedals(&self) -> Vec<&EditDescriptor> {
        self.edits.iter().filter(|e| e.kind().is_pedal()).collect()
    }

    /// Enabled pedals in processing order. The sort is stable, so repeated
    /// kinds keep their insertion order.
    pub fn enabled_pedals(&self) -> Vec<(EditKind, &dyn PedalEdit)> {
        let mut pedals: Vec<(usize, EditKind, &dyn PedalEdit)> = self
            .edits
            .iter()
            .filter(|e| e.is_enabled())
            .filter_map(|e| {
                let kind = e.kind();
                Some((kind.chain_rank()?, kind, e.as_pedal()?))
            })
            .collect();
        pedals.sort_by_key(|(rank, _, _)| *rank);
        pedals.into_iter().map(|(_, kind, p)| (kind, p)).collect()
    }

    /// Labels of every enabled descriptor, sorted.
    pub fn adjustments(&self) -> Vec<String> {
        let mut labels: Vec<String> = self
            .edits
            .iter()
            .filter(|e| e.is_enabled())
            .flat_map(EditDescriptor::adjustments)
            .collect();
        labels.sort();
        labels
    }
}

impl<E: Into<EditDescriptor>> FromIterator<E> for Soundboard {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let mut board = Soundboard::new();
        board.extend(iter);
        board
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edits::{CompressorEdit, DistortionEdit, LimiterEdit, ReverbEdit};

    fn comp(threshold_db: f32) -> CompressorEdit {
        CompressorEdit {
            threshold_db,
            ratio: 2.0,
            attack_ms: 5.0,
            release_ms: 50.0,
        }
    }

    #[test]
    fn test_get_returns_last_added() {
        let board = Soundboard::new()
            .with(BasicEdit {
                volume_db: 1.0,
                ..Default::default()
            })
            .with(BasicEdit {
                volume_db: -4.0,
                ..Default::default()
            });
        assert_eq!(board.basic().unwrap().volume_db, -4.0);
        assert!(board.background().is_none());
    }

    #[test]
    fn test_duplicate_pedals_all_contribute() {
        let board = Soundboard::new().with(comp(-10.0)).with(comp(-20.0));
        match board.get(EditKind::Compressor).unwrap() {
            EditDescriptor::Compressor(c) => assert_eq!(c.threshold_db, -20.0),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(board.enabled_pedals().len(), 2);
    }

    #[test]
    fn test_enabled_pedals_in_canonical_order() {
        let board: Soundboard = vec![
            EditDescriptor::from(comp(-18.0)),
            LimiterEdit {
                threshold_db: -1.0,
                release_ms: 100.0,
            }
            .into(),
            ReverbEdit {
                room_size: 0.4,
                damping: 0.5,
                wet_level: 0.3,
                dry_level: 0.4,
            }
            .into(),
            DistortionEdit { drive_db: 6.0 }.into(),
            DistortionEdit::default().into(),
        ]
        .into_iter()
        .collect();

        let kinds: Vec<EditKind> = board.enabled_pedals().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![
                EditKind::Distortion,
                EditKind::Reverb,
                EditKind::Limiter,
                EditKind::Compressor
            ]
        );
        assert_eq!(board.pedals().len(), 5);
    }

    #[test]
    fn test_adjustments_sorted_and_enabled_only() {
        let board = Soundboard::new()
            .with(LimiterEdit {
                threshold_db: -1.0,
                release_ms: 250.0,
            })
            .with(comp(-23.0))
            .with(ReverbEdit::default())
            .with(NormalizationEdit { enabled: true });
        assert_eq!(
            board.adjustments(),
            vec!["Audiobook Normalization", "Compressor:-23dB", "Limiter:-1dB"]
        );
    }

    #[test]
    fn test_is_enabled() {
        assert!(!Soundboard::new().is_enabled());
        assert!(!Soundboard::new().with(BasicEdit::default()).is_enabled());
        assert!(Soundboard::new().with(comp(-3.0)).is_enabled());
    }

    #[test]
    fn test_serializes_as_list() {
        let board = Soundboard::new().with(DistortionEdit { drive_db: 3.0 });
        let json = serde_json::to_string(&board).unwrap();
        assert!(json.starts_with('['));
        let back: Soundboard = serde_json::from_str(&json).unwrap();
        assert_eq!(back, board);
    }
}
