//! Sensitivity control and its mapping to tolerance bands.
//!
//! The mapping is a pure table so that sensitivity behavior can be checked on its own,
//! independently of any rule evaluation. Every tolerance shrinks monotonically as
//! sensitivity rises and the fuzzy-text threshold rises monotonically.
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A 0-100 control scaling all tolerance bands. 0 accepts all but gross mismatches,
/// 100 approaches the measurement noise floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Sensitivity(u8);

impl Sensitivity {
    pub const MIN: Sensitivity = Sensitivity(0);
    pub const MAX: Sensitivity = Sensitivity(100);

    pub fn new(value: i64) -> Result<Self, EngineError> {
        if (0..=100).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(EngineError::InvalidSensitivity(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    fn fraction(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self(50)
    }
}

impl TryFrom<i64> for Sensitivity {
    type Error = EngineError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Sensitivity> for u8 {
    fn from(value: Sensitivity) -> Self {
        value.0
    }
}

impl std::fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tolerances resolved for one sensitivity value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceTable {
    /// Minimum similarity ratio for near-match text rules.
    pub text_min_similarity: f64,
    /// Font height band as a fraction of the expected height.
    pub font_height_relative: f64,
    /// Spacing band as a fraction of the expected gap.
    pub spacing_relative: f64,
    /// Barcode width/height band as a fraction of the expected dimension.
    pub barcode_dimension_relative: f64,
    /// Barcode placement band in image fractions.
    pub placement_absolute: f64,
}

impl ToleranceTable {
    pub fn for_sensitivity(sensitivity: Sensitivity) -> Self {
        let t = sensitivity.fraction();
        Self {
            text_min_similarity: lerp(0.75, 0.99, t),
            font_height_relative: (0.20 * (1.0 - t)).max(0.01),
            spacing_relative: lerp(0.20, 0.02, t),
            barcode_dimension_relative: lerp(0.15, 0.015, t),
            placement_absolute: lerp(0.10, 0.01, t),
        }
    }
}

fn lerp(at_zero: f64, at_full: f64, t: f64) -> f64 {
    at_zero + (at_full - at_zero) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(value: i64) -> ToleranceTable {
        ToleranceTable::for_sensitivity(Sensitivity::new(value).unwrap())
    }

    #[test]
    fn test_range_is_enforced() {
        assert!(Sensitivity::new(-1).is_err());
        assert!(Sensitivity::new(101).is_err());
        assert_eq!(Sensitivity::new(100).unwrap(), Sensitivity::MAX);
        assert_eq!(Sensitivity::default().value(), 50);
    }

    #[test]
    fn test_endpoints() {
        let low = table(0);
        assert!((low.text_min_similarity - 0.75).abs() < 1e-12);
        assert!((low.spacing_relative - 0.20).abs() < 1e-12);
        assert!((low.font_height_relative - 0.20).abs() < 1e-12);

        let high = table(100);
        assert!((high.text_min_similarity - 0.99).abs() < 1e-12);
        assert!((high.spacing_relative - 0.02).abs() < 1e-12);
        assert!((high.font_height_relative - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_font_height_is_ten_percent_at_midpoint() {
        assert!((table(50).font_height_relative - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_mapping_is_monotonic() {
        for s in 0..100 {
            let (a, b) = (table(s), table(s + 1));
            assert!(b.text_min_similarity >= a.text_min_similarity);
            assert!(b.font_height_relative <= a.font_height_relative);
            assert!(b.spacing_relative <= a.spacing_relative);
            assert!(b.barcode_dimension_relative <= a.barcode_dimension_relative);
            assert!(b.placement_absolute <= a.placement_absolute);
        }
    }

    #[test]
    fn test_serde_rejects_out_of_range() {
        assert!(serde_json::from_str::<Sensitivity>("101").is_err());
        assert_eq!(serde_json::from_str::<Sensitivity>("7").unwrap().value(), 7);
        assert_eq!(serde_json::to_string(&Sensitivity::MAX).unwrap(), "100");
    }
}
