//! Tunables for a verifier or analyzer instance.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::EngineError;
use crate::sensitivity::Sensitivity;

/// Options controlling rule evaluation.
///
/// Every field has a default, so a config file only needs the keys it changes:
///
/// ```json
/// { "max_workers": 2, "rule_timeout_ms": 500 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierOptions {
    /// Upper bound on rules evaluated at the same time.
    pub max_workers: usize,
    /// Per-rule evaluation window used by the async analyzer.
    pub rule_timeout_ms: u64,
    /// Minimum descriptive-similarity score for a region to count as the rule's target.
    pub location_floor: f64,
    /// Candidates whose scores differ by no more than this are reported as ambiguous.
    pub ambiguity_margin: f64,
    /// Sensitivity used when the caller does not supply one.
    pub default_sensitivity: Sensitivity,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self {
            max_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            rule_timeout_ms: 2_000,
            location_floor: 0.5,
            ambiguity_margin: 1e-6,
            default_sensitivity: Sensitivity::default(),
        }
    }
}

impl VerifierOptions {
    /// Loads options from a JSON file and validates them.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;

        let options: VerifierOptions =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_workers == 0 {
            return Err(EngineError::InvalidConfig(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if self.rule_timeout_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "rule_timeout_ms must be positive".to_string(),
            ));
        }
        if !(self.location_floor > 0.0 && self.location_floor <= 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "location_floor must be in (0, 1], got {}",
                self.location_floor
            )));
        }
        if !(self.ambiguity_margin >= 0.0 && self.ambiguity_margin.is_finite()) {
            return Err(EngineError::InvalidConfig(format!(
                "ambiguity_margin must be a non-negative number, got {}",
                self.ambiguity_margin
            )));
        }
        Ok(())
    }

    pub fn rule_timeout(&self) -> Duration {
        Duration::from_millis(self.rule_timeout_ms)
    }
}
