//! Synchronous verifier: runs every rule against one scene and aggregates a report.
//!
//! Rules are independent, so they are evaluated on a bounded worker pool. The scene is
//! shared read-only between workers, and verdicts are collected back in rule order.
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::calibration::CalibrationRatio;
use crate::config::VerifierOptions;
use crate::error::Result;
use crate::geometry::{
    evaluate_barcode_dimension, evaluate_barcode_placement, evaluate_font_height, evaluate_spacing,
};
use crate::locator::ElementLocator;
use crate::report::{aggregate, AnalysisReport, HighlightedElement};
use crate::rules::{normalize_rules, Expectation, RawRule, RuleDefinition};
use crate::scene::LabelScene;
use crate::sensitivity::Sensitivity;
use crate::text_match::{evaluate_presence, evaluate_text, evaluate_translations};

/// Evaluates one rule. Never fails: anything that prevents a decision becomes an
/// `info` verdict.
pub fn evaluate_rule(
    rule: &RuleDefinition,
    scene: &LabelScene,
    calibration: Option<&CalibrationRatio>,
    options: &VerifierOptions,
) -> HighlightedElement {
    let locator = ElementLocator::new(scene, options.location_floor, options.ambiguity_margin);

    let verdict = match &rule.expectation {
        Expectation::Text(expectation) => evaluate_text(rule, expectation, &locator),
        Expectation::Translations {
            variants,
            case_sensitive,
        } => evaluate_translations(rule, variants, *case_sensitive, &locator),
        Expectation::FontHeight(window) => evaluate_font_height(rule, window, &locator, calibration),
        Expectation::Spacing {
            secondary_target,
            window,
        } => evaluate_spacing(rule, secondary_target, window, &locator, calibration),
        Expectation::BarcodeDimension {
            width_mm,
            height_mm,
            decoded_value,
        } => evaluate_barcode_dimension(
            rule,
            *width_mm,
            *height_mm,
            decoded_value.as_deref(),
            &locator,
            calibration,
        ),
        Expectation::BarcodePlacement {
            window,
            decoded_value,
        } => evaluate_barcode_placement(rule, window, decoded_value.as_deref(), &locator),
        Expectation::Presence {
            expected_text,
            present,
        } => evaluate_presence(rule, expected_text.as_deref(), *present, &locator),
    };

    debug!(
        rule_id = %rule.id,
        kind = rule.kind.as_str(),
        status = ?verdict.status,
        "rule evaluated"
    );
    verdict.clamped_to(&scene.image)
}

/// Reusable rule verifier backed by its own worker pool.
pub struct Verifier {
    options: VerifierOptions,
    pool: ThreadPool,
}

impl Verifier {
    pub fn new(options: VerifierOptions) -> Result<Self> {
        options.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(options.max_workers)
            .thread_name(|i| format!("labelcheck-rule-{}", i))
            .build()?;
        Ok(Self { options, pool })
    }

    pub fn options(&self) -> &VerifierOptions {
        &self.options
    }

    /// Normalizes `rules` and evaluates them. Fails only when a rule is malformed, in
    /// which case nothing is evaluated.
    pub fn evaluate(
        &self,
        rules: &[RawRule],
        scene: &LabelScene,
        calibration: Option<CalibrationRatio>,
        sensitivity: Sensitivity,
    ) -> Result<AnalysisReport> {
        let rules = normalize_rules(rules, sensitivity)?;
        Ok(self.evaluate_rules(&rules, scene, calibration))
    }

    /// Evaluates already-normalized rules. The report holds exactly one verdict per
    /// rule, in the order given.
    pub fn evaluate_rules(
        &self,
        rules: &[RuleDefinition],
        scene: &LabelScene,
        calibration: Option<CalibrationRatio>,
    ) -> AnalysisReport {
        let analysis_id = Uuid::new_v4();
        debug!(%analysis_id, rules = rules.len(), workers = self.options.max_workers, "evaluating rules");
        if calibration.is_none() && rules.iter().any(|r| r.needs_calibration()) {
            warn!(%analysis_id, "no calibration reference found; physical measurements will be unresolved");
        }

        let options = &self.options;
        let highlights: Vec<HighlightedElement> = self.pool.install(|| {
            rules
                .par_iter()
                .map(|rule| evaluate_rule(rule, scene, calibration.as_ref(), options))
                .collect()
        });

        aggregate(analysis_id, rules, highlights, &scene.image)
    }
}
