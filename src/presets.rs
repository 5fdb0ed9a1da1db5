use std::collections::HashMap;

use log::warn;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::edits::{CompressorEdit, LimiterEdit};
use crate::soundboard::Soundboard;

// =============================================================================
// MASTERING PRESETS
// =============================================================================

/// Name of the preset used by the normalization pass.
pub const AUDIOBOOK: &str = "audiobook";

/// Compressor into limiter, plus the loudness window the chain aims for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteringPreset {
    #[serde(default)]
    pub description: String,
    pub compressor: CompressorEdit,
    pub limiter: LimiterEdit,
    pub integrated_loudness_min: f32,
    pub integrated_loudness_max: f32,
    pub true_peak_ceiling: f32,
}

impl MasteringPreset {
    pub fn audiobook() -> Self {
        Self {
            description: "Long-form spoken word".to_string(),
            compressor: CompressorEdit {
                threshold_db: -23.0,
                ratio: 2.0,
                attack_ms: 150.0,
                release_ms: 150.0,
            },
            limiter: LimiterEdit {
                threshold_db: -1.0,
                release_ms: 250.0,
            },
            integrated_loudness_min: -23.0,
            integrated_loudness_max: -18.0,
            true_peak_ceiling: -3.0,
        }
    }

    /// The preset as an edit set. The chain runs the limiter before the
    /// compressor regardless of insertion order.
    pub fn soundboard(&self) -> Soundboard {
        Soundboard::new()
            .with(self.compressor.clone())
            .with(self.limiter.clone())
    }

    /// Whether a measured integrated loudness falls in the target window.
    pub fn loudness_in_range(&self, lufs: f64) -> bool {
        lufs >= self.integrated_loudness_min as f64 && lufs <= self.integrated_loudness_max as f64
    }

    /// Whether a measured true peak stays at or under the ceiling.
    pub fn true_peak_in_range(&self, true_peak_db: f64) -> bool {
        true_peak_db <= self.true_peak_ceiling as f64
    }
}

#[derive(Debug)]
pub struct PresetManager {
    presets: HashMap<String, MasteringPreset>,
}

impl PresetManager {
    /// Load presets from baked-in JSON. This is fallible but non-fatal.
    /// Returns the compiled-in defaults if parsing fails.
    pub fn new() -> Self {
        Self::from_json(include_str!("../presets.json"))
    }

    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<HashMap<String, MasteringPreset>>(json) {
            Ok(mut presets) => {
                presets
                    .entry(AUDIOBOOK.to_string())
                    .or_insert_with(MasteringPreset::audiobook);
                Self { presets }
            }
            Err(e) => {
                warn!("Preset JSON is malformed ({}), using built-in presets", e);
                Self::default()
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&MasteringPreset> {
        self.presets.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.presets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn audiobook(&self) -> MasteringPreset {
        self.get(AUDIOBOOK)
            .cloned()
            .unwrap_or_else(MasteringPreset::audiobook)
    }
}

impl Default for PresetManager {
    fn default() -> Self {
        let mut presets = HashMap::new();
        presets.insert(AUDIOBOOK.to_string(), MasteringPreset::audiobook());
        Self { presets }
    }
}

/// Process-wide preset table, parsed on first use.
pub static PRESETS: Lazy<PresetManager> = Lazy::new(PresetManager::new);
