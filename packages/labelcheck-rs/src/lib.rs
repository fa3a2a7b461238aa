//! # labelcheck-rs
//!
//! A rule evaluation engine for packaging label compliance. Given the text regions and
//! visual features recognized on a label image, it checks declarative rules and reports
//! a verdict per rule that a renderer can overlay on the image.
//!
//! ## Features
//!
//! - **Rule Normalization**: Validate raw rule documents, convert units to millimeters and derive tolerances from a 0-100 sensitivity
//! - **Element Location**: Map free-text target descriptions like "net weight, top left" onto recognized regions
//! - **Text Checks**: Exact, near-match and translated-text parity checks with explainable messages
//! - **Geometric Checks**: Font height, spacing, barcode dimensions and barcode placement in physical units
//! - **Calibration**: Pixel-to-millimeter ratio from a known-size barcode or embedded DPI
//! - **Async Service**: Run OCR and feature detection collaborators with per-rule timeouts and cancellation
//!
//! ## Quick Start
//!
//! ```ignore
//! use labelcheck_rs::prelude::*;
//!
//! let rules: RuleDocument = serde_json::from_str(r#"[
//!     {"kind": "exact_text", "target": "net weight", "expected_text": "250g"}
//! ]"#)?;
//! let scene = LabelScene::new(ImageInfo::new(800, 600))
//!     .with_text_regions(vec![TextRegion::new("r1", "250g", BoundingBox::new(40, 20, 60, 14))]);
//!
//! let verifier = Verifier::new(VerifierOptions::default())?;
//! let report = verifier.evaluate(&rules.into_rules(), &scene, None, Sensitivity::default())?;
//! println!("{}", report.to_json()?);
//! ```

pub mod calibration;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod locator;
pub mod report;
pub mod rules;
pub mod scene;
pub mod sensitivity;
pub mod service;
pub mod text_match;

// Re-export commonly used types at the root level
pub use calibration::{resolve_calibration, CalibrationRatio, CalibrationReference};
pub use config::VerifierOptions;
pub use engine::{evaluate_rule, Verifier};
pub use error::{EngineError, Result, RuleValidationError};
pub use locator::{ElementLocator, LocateQuery, Located};
pub use report::{aggregate, AnalysisReport, HighlightedElement, OverallStatus, Summary, VerdictStatus};
pub use rules::{
    normalize_rules, Expectation, LengthUnit, LengthWindow, RawRule, RuleDefinition, RuleDocument,
    RuleKind, RuleSet, Severity,
};
pub use scene::{LabelScene, SceneDocument};
pub use sensitivity::{Sensitivity, ToleranceTable};
pub use service::{AnalysisRequest, CancelSignal, Cancellation, LabelAnalyzer};
pub use text_match::{normalize_text, similarity_ratio};

pub use labelcheck_vision::{
    BoundingBox, Dpi, FeatureAttributes, FeatureDetector, FeatureKind, ImageInfo, LabelImage, OcrEngine,
    OcrOutput, TextRegion, VisionError, VisualFeature,
};

/// Prelude module for convenient imports
///
/// Import everything you need with:
/// ```ignore
/// use labelcheck_rs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        normalize_rules, resolve_calibration, AnalysisReport, AnalysisRequest, BoundingBox, CalibrationRatio,
        CalibrationReference, CancelSignal, Cancellation, Dpi, EngineError, FeatureDetector, FeatureKind,
        HighlightedElement, ImageInfo, LabelAnalyzer, LabelImage, LabelScene, OcrEngine, OcrOutput, OverallStatus,
        RawRule, RuleDefinition, RuleDocument, RuleValidationError, SceneDocument, Sensitivity, Severity,
        TextRegion, VerdictStatus, Verifier, VerifierOptions, VisionError, VisualFeature,
    };
}
