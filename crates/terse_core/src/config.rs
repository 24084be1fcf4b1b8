//! Generation configuration.
//!
//! A [`GenerationConfig`] is captured once before the loop starts and
//! never altered mid-run. Sampling fields (temperature, top-k, top-p,
//! seed) are consumed by the engine implementation; the loop itself only
//! reads `max_tokens` and the batch/context sizes.

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Hard cap on generated tokens per run.
    pub max_tokens: u32,
    /// Context window size handed to the engine at setup.
    pub ctx_size: u32,
    /// Decode batch capacity.
    pub batch_size: u32,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub seed: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 64,
            ctx_size: 2048,
            batch_size: 512,
            temperature: 0.2,
            top_k: 40,
            top_p: 0.9,
            seed: 42,
        }
    }
}

impl GenerationConfig {
    /// Load from a TOML file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, crate::TerseError> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| crate::TerseError::Config(format!("{}: {}", path.display(), e)))
    }
}
