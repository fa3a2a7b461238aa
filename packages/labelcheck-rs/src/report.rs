//! Verdicts and the aggregated analysis report.
//!
//! The serialized shape of [`AnalysisReport`] and [`HighlightedElement`] is the wire
//! contract with the overlay renderer; field names and nullability must stay as they are.
use chrono::Utc;
use labelcheck_vision::{BoundingBox, ImageInfo};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::rules::{RuleDefinition, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Correct,
    Wrong,
    /// The check could not be completed automatically and needs a human.
    Info,
}

/// Per-rule outcome, highlighted on the label by the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightedElement {
    pub rule_id_ref: String,
    pub bounding_box: Option<BoundingBox>,
    pub status: VerdictStatus,
    pub message: String,
    pub found_value: Option<String>,
    pub expected_value: Option<String>,
    pub confidence: Option<f64>,
}

impl HighlightedElement {
    pub fn new(rule_id_ref: impl Into<String>, status: VerdictStatus, message: impl Into<String>) -> Self {
        Self {
            rule_id_ref: rule_id_ref.into(),
            bounding_box: None,
            status,
            message: message.into(),
            found_value: None,
            expected_value: None,
            confidence: None,
        }
    }

    pub fn info(rule_id_ref: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(rule_id_ref, VerdictStatus::Info, message)
    }

    pub fn with_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = Some(bounding_box);
        self
    }

    pub fn with_found(mut self, found: impl Into<String>) -> Self {
        self.found_value = Some(found.into());
        self
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected_value = Some(expected.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        });
        self
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.message.push(' ');
        self.message.push_str(note);
        self
    }

    /// Clips the bounding box, if any, into the image bounds.
    pub fn clamped_to(mut self, image: &ImageInfo) -> Self {
        self.bounding_box = self.bounding_box.map(|b| b.clamp_to(image));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Pass,
    FailCritical,
    FailMinor,
    /// The analysis ran, but at least one rule is unresolved and none failed.
    ProcessingError,
}

impl OverallStatus {
    /// Pure function of (severity, status) pairs: critical failures dominate minor
    /// ones, and a pass requires every verdict to be correct.
    pub fn from_verdicts<I>(verdicts: I) -> Self
    where
        I: IntoIterator<Item = (Severity, VerdictStatus)>,
    {
        let mut critical = false;
        let mut minor = false;
        let mut unresolved = false;
        for (severity, status) in verdicts {
            match (severity, status) {
                (Severity::Critical, VerdictStatus::Wrong) => critical = true,
                (Severity::Minor, VerdictStatus::Wrong) => minor = true,
                (_, VerdictStatus::Info) => unresolved = true,
                (_, VerdictStatus::Correct) => {}
            }
        }
        if critical {
            Self::FailCritical
        } else if minor {
            Self::FailMinor
        } else if unresolved {
            Self::ProcessingError
        } else {
            Self::Pass
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_rules_defined: usize,
    pub matches: usize,
    /// Wrong plus unresolved verdicts.
    pub mismatches_or_errors_in_rules: usize,
    pub unresolved: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analysis_id: Uuid,
    pub original_filename: String,
    pub overall_status: OverallStatus,
    pub summary: Summary,
    pub highlights: Vec<HighlightedElement>,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_image_url: Option<String>,
}

impl AnalysisReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Builds the final report from one verdict per rule, in rule order.
pub fn aggregate(
    analysis_id: Uuid,
    rules: &[RuleDefinition],
    highlights: Vec<HighlightedElement>,
    image: &ImageInfo,
) -> AnalysisReport {
    debug_assert_eq!(rules.len(), highlights.len());

    let overall_status = OverallStatus::from_verdicts(
        rules
            .iter()
            .zip(highlights.iter())
            .map(|(rule, verdict)| (rule.severity, verdict.status)),
    );

    let count = |status: VerdictStatus| highlights.iter().filter(|h| h.status == status).count();
    let matches = count(VerdictStatus::Correct);
    let unresolved = count(VerdictStatus::Info);
    let wrong = count(VerdictStatus::Wrong);

    let summary = Summary {
        total_rules_defined: rules.len(),
        matches,
        mismatches_or_errors_in_rules: wrong + unresolved,
        unresolved,
    };

    info!(
        %analysis_id,
        status = ?overall_status,
        matches,
        wrong,
        unresolved,
        "analysis complete"
    );

    AnalysisReport {
        analysis_id,
        original_filename: image
            .filename
            .clone()
            .unwrap_or_else(|| "label".to_string()),
        overall_status,
        summary,
        highlights,
        timestamp: Utc::now().to_rfc3339(),
        processed_image_url: None,
    }
}
