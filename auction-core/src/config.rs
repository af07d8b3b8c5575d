//! Simulation configuration.
//!
//! Every field has a default so a config file only needs to name what it changes:
//!
//! ```json
//! { "rounds": 10, "value_seed": 7, "items": 4,
//!   "valuation": { "kind": "substitutes", "groups": [[0, 1]] } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AuctionError, Result};
use crate::types::Price;
use crate::valuation::ValuationModel;

// === CONSTANTS ===

/// Private values are drawn uniformly from `[PRIVATE_VALUE_MIN, PRIVATE_VALUE_MAX)`.
pub const PRIVATE_VALUE_MIN: Price = 0.0;
pub const PRIVATE_VALUE_MAX: Price = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub auction_id: u32,
    pub rounds: u32,
    /// Seed for the private-value stream
    pub value_seed: u64,
    /// Seed for the tie-break stream; falls back to `value_seed`
    pub tie_break_seed: Option<u64>,
    /// Item count for multi-item runs (ids `0..items`)
    pub items: u32,
    pub valuation: Option<ValuationModel>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            auction_id: 1,
            rounds: 25,
            value_seed: 100,
            tie_break_seed: None,
            items: 3,
            valuation: None,
        }
    }
}

impl SimulationConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            value_seed: seed,
            ..Self::default()
        }
    }

    pub fn tie_break_seed(&self) -> u64 {
        self.tie_break_seed.unwrap_or(self.value_seed)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AuctionError::Config(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| AuctionError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = SimulationConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.tie_break_seed(), 100);
    }

    #[test]
    fn explicit_tie_break_seed_wins() {
        let config = SimulationConfig::from_json_str(r#"{"value_seed": 5, "tie_break_seed": 6}"#)
            .unwrap();
        assert_eq!(config.value_seed, 5);
        assert_eq!(config.tie_break_seed(), 6);
    }

    #[test]
    fn valuation_model_is_parsed_and_validated() {
        let config = SimulationConfig::from_json_str(
            r#"{"items": 4, "valuation": {"kind": "substitutes", "groups": [[0, 1]]}}"#,
        )
        .unwrap();
        assert_eq!(config.items, 4);
        assert!(matches!(
            config.valuation,
            Some(ValuationModel::Substitutes(_))
        ));

        let err = SimulationConfig::from_json_str(
            r#"{"valuation": {"kind": "synergy", "synergies": [{"items": [0], "bonus": 1.0}]}}"#,
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = SimulationConfig::from_path("does/not/exist.json").unwrap_err();
        assert!(matches!(err, AuctionError::Config(_)));
    }
}
