//! Geometric rules: font height, spacing, barcode dimensions and barcode placement.
//!
//! Physical measurements go through the calibration ratio. When it is absent, the
//! rules that need millimeters answer `info` instead of guessing a scale.
use labelcheck_vision::{BoundingBox, FeatureKind, TextRegion, VisualFeature};
use tracing::{debug, warn};

use crate::calibration::CalibrationRatio;
use crate::locator::{ElementLocator, LocateQuery, Located};
use crate::report::{HighlightedElement, VerdictStatus};
use crate::rules::{LengthUnit, LengthWindow, PlacementWindow, ReferenceEdge, RuleDefinition};

/// Minimum share of a text region a glyph row must cover to stand in for its height.
const GLYPH_ROW_MIN_OVERLAP: f64 = 0.5;

const NO_CALIBRATION: &str = "no calibration reference found; physical size cannot be measured";

/// Acceptance interval around an expected window. Each bound carries its own tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Band {
    lower: Option<(f64, f64)>,
    upper: Option<(f64, f64)>,
}

impl Band {
    /// Widens each bound by `relative` of its value, never by less than `floor`.
    fn around(window: &LengthWindow, relative: f64, floor: f64) -> Self {
        let widen = |bound: f64| (bound, (bound * relative).max(floor));
        Self {
            lower: window.lower.map(widen),
            upper: window.upper.map(widen),
        }
    }

    /// Widens each bound by the same fixed amount, never by less than `floor`.
    fn fixed(window: &LengthWindow, tolerance: f64, floor: f64) -> Self {
        let tolerance = tolerance.max(floor);
        Self {
            lower: window.lower.map(|bound| (bound, tolerance)),
            upper: window.upper.map(|bound| (bound, tolerance)),
        }
    }

    fn absolute(min: f64, max: f64, tolerance: f64) -> Self {
        Self {
            lower: Some((min, tolerance)),
            upper: Some((max, tolerance)),
        }
    }

    /// Signed distance to the nearest edge of the band, positive inside.
    fn margin(&self, value: f64) -> f64 {
        let lower = self.lower.map(|(bound, tol)| value - (bound - tol));
        let upper = self.upper.map(|(bound, tol)| (bound + tol) - value);
        match (lower, upper) {
            (Some(l), Some(u)) => l.min(u),
            (Some(m), None) | (None, Some(m)) => m,
            (None, None) => f64::INFINITY,
        }
    }

    fn contains(&self, value: f64) -> bool {
        self.margin(value) >= 0.0
    }

    /// `1 - deviation / tolerance` clamped to `[0, 1]`, where the deviation is the
    /// distance past the nearest expected bound. 1.0 anywhere inside the expected window.
    fn confidence(&self, value: f64) -> f64 {
        let below = self
            .lower
            .filter(|(bound, _)| value < *bound)
            .map(|(bound, tol)| (bound - value, tol));
        let above = self
            .upper
            .filter(|(bound, _)| value > *bound)
            .map(|(bound, tol)| (value - bound, tol));
        match below.or(above) {
            None => 1.0,
            Some((_, tolerance)) if tolerance <= 0.0 => 0.0,
            Some((deviation, tolerance)) => (1.0 - deviation / tolerance).clamp(0.0, 1.0),
        }
    }

    fn describe(&self, precision: usize, unit: &str) -> String {
        match (self.lower, self.upper) {
            (Some((lo, lt)), Some((hi, ht))) => format!(
                "{:.p$}-{:.p$}{}",
                lo - lt,
                hi + ht,
                unit,
                p = precision
            ),
            (Some((lo, lt)), None) => format!(">= {:.p$}{}", lo - lt, unit, p = precision),
            (None, Some((hi, ht))) => format!("<= {:.p$}{}", hi + ht, unit, p = precision),
            (None, None) => "any".to_string(),
        }
    }
}

/// Band for a length rule: the rule's own `tolerance_mm` when it has one, otherwise
/// the sensitivity-derived relative tolerance.
fn band_for(rule: &RuleDefinition, window: &LengthWindow, floor: f64) -> Band {
    match rule.absolute_tolerance_mm {
        Some(tolerance) => Band::fixed(window, tolerance, floor),
        None => Band::around(window, rule.tolerance, floor),
    }
}

/// Pixel-to-window conversion for one measurement.
#[derive(Debug, Clone, Copy)]
struct Scale {
    x: f64,
    y: f64,
    floor: f64,
}

impl Scale {
    /// Pixel windows need no calibration; physical ones need a ratio.
    fn for_unit(unit: LengthUnit, calibration: Option<&CalibrationRatio>) -> Option<Self> {
        match unit {
            LengthUnit::Pixels => Some(Self {
                x: 1.0,
                y: 1.0,
                floor: 1.0,
            }),
            LengthUnit::Millimeters => calibration.map(|c| Self {
                x: c.mm_per_px_x,
                y: c.mm_per_px_y,
                floor: c.noise_floor_mm(),
            }),
        }
    }

    fn distance(&self, dx_px: f64, dy_px: f64) -> f64 {
        (dx_px * self.x).hypot(dy_px * self.y)
    }
}

fn not_found(rule: &RuleDefinition, what: &str) -> HighlightedElement {
    warn!(rule_id = %rule.id, target = %what, "geometric target not found");
    HighlightedElement::info(&rule.id, format!("Could not locate '{}' on the label.", what))
}

fn note_ambiguity<T>(verdict: HighlightedElement, located: &Located<'_, T>, target: &str) -> HighlightedElement {
    if located.is_ambiguous() {
        verdict.with_note(&format!(
            "Ambiguous target: {} candidates matched '{}' equally well; only the first was measured.",
            located.tied_count(),
            target
        ))
    } else {
        verdict
    }
}

fn status(inside: bool) -> VerdictStatus {
    if inside {
        VerdictStatus::Correct
    } else {
        VerdictStatus::Wrong
    }
}

/// Height of the glyphs inside a region, in pixels. A glyph-row feature covering most
/// of the region is more precise than the OCR box, which includes line spacing.
fn glyph_height_px(region: &TextRegion, features: &[VisualFeature]) -> f64 {
    let area = region.bounding_box.area();
    if area == 0 {
        return f64::from(region.bounding_box.height);
    }
    features
        .iter()
        .filter(|f| f.kind == FeatureKind::GlyphRow)
        .map(|f| (f, f.bounding_box.intersection_area(&region.bounding_box)))
        .filter(|(_, overlap)| *overlap as f64 / area as f64 >= GLYPH_ROW_MIN_OVERLAP)
        .max_by_key(|(_, overlap)| *overlap)
        .map(|(f, _)| f.pixel_height())
        .unwrap_or_else(|| f64::from(region.bounding_box.height))
}

pub fn evaluate_font_height(
    rule: &RuleDefinition,
    window: &LengthWindow,
    locator: &ElementLocator<'_>,
    calibration: Option<&CalibrationRatio>,
) -> HighlightedElement {
    let located = locator.locate_text(&LocateQuery::described(&rule.target));
    let Some(region) = located.best() else {
        return not_found(rule, &rule.target).with_expected(window.to_string());
    };

    let Some(scale) = Scale::for_unit(window.unit, calibration) else {
        return HighlightedElement::info(&rule.id, format!("Font height of '{}': {}.", rule.target, NO_CALIBRATION))
            .with_box(region.bounding_box)
            .with_expected(window.to_string());
    };

    let height_px = glyph_height_px(region, &locator.scene().visual_features);
    let height = height_px * scale.y;
    let band = band_for(rule, window, scale.floor);
    let inside = band.contains(height);
    debug!(rule_id = %rule.id, height_px, height, unit = window.unit.symbol(), inside, "measured font height");

    let verdict = HighlightedElement::new(
        &rule.id,
        status(inside),
        format!(
            "Measured text height {} for '{}'; accepted range {}.",
            window.unit.format(height),
            rule.target,
            band.describe(2, &format!(" {}", window.unit.symbol()))
        ),
    )
    .with_box(region.bounding_box)
    .with_found(window.unit.format(height))
    .with_expected(window.to_string())
    .with_confidence(band.confidence(height));
    note_ambiguity(verdict, &located, &rule.target)
}

pub fn evaluate_spacing(
    rule: &RuleDefinition,
    secondary_target: &str,
    window: &LengthWindow,
    locator: &ElementLocator<'_>,
    calibration: Option<&CalibrationRatio>,
) -> HighlightedElement {
    let first = locator.locate_text(&LocateQuery::described(&rule.target));
    let second = locator.locate_text(&LocateQuery::described(secondary_target));
    let Some(a) = first.best() else {
        return not_found(rule, &rule.target).with_expected(window.to_string());
    };
    let Some(b) = second.best() else {
        return not_found(rule, secondary_target).with_expected(window.to_string());
    };

    if a.id == b.id {
        return HighlightedElement::info(
            &rule.id,
            format!(
                "'{}' and '{}' resolve to the same region '{}'; spacing cannot be measured.",
                rule.target, secondary_target, a.id
            ),
        )
        .with_box(a.bounding_box)
        .with_expected(window.to_string());
    }

    let combined = a.bounding_box.union(&b.bounding_box);
    let Some(scale) = Scale::for_unit(window.unit, calibration) else {
        return HighlightedElement::info(
            &rule.id,
            format!("Spacing between '{}' and '{}': {}.", rule.target, secondary_target, NO_CALIBRATION),
        )
        .with_box(combined)
        .with_expected(window.to_string());
    };

    let (dx, dy) = a.bounding_box.edge_gap(&b.bounding_box);
    let gap = scale.distance(f64::from(dx), f64::from(dy));
    let band = band_for(rule, window, scale.floor);
    let inside = band.contains(gap);
    debug!(rule_id = %rule.id, dx, dy, gap, unit = window.unit.symbol(), inside, "measured spacing");

    let verdict = HighlightedElement::new(
        &rule.id,
        status(inside),
        format!(
            "Gap between '{}' and '{}' is {}; accepted range {}.",
            rule.target,
            secondary_target,
            window.unit.format(gap),
            band.describe(2, &format!(" {}", window.unit.symbol()))
        ),
    )
    .with_box(combined)
    .with_found(window.unit.format(gap))
    .with_expected(window.to_string())
    .with_confidence(band.confidence(gap));
    let verdict = note_ambiguity(verdict, &first, &rule.target);
    note_ambiguity(verdict, &second, secondary_target)
}

fn describe_dimensions(width: Option<f64>, height: Option<f64>) -> String {
    match (width, height) {
        (Some(w), Some(h)) => format!("{:.2} x {:.2} mm", w, h),
        (Some(w), None) => format!("width {:.2} mm", w),
        (None, Some(h)) => format!("height {:.2} mm", h),
        (None, None) => "unspecified".to_string(),
    }
}

pub fn evaluate_barcode_dimension(
    rule: &RuleDefinition,
    width_mm: Option<f64>,
    height_mm: Option<f64>,
    decoded_value: Option<&str>,
    locator: &ElementLocator<'_>,
    calibration: Option<&CalibrationRatio>,
) -> HighlightedElement {
    let expected = describe_dimensions(width_mm, height_mm);
    let located = locator.locate_barcode(&rule.target, decoded_value);
    let Some(barcode) = located.best() else {
        return not_found(rule, &rule.target).with_expected(expected);
    };

    let Some(calibration) = calibration else {
        return HighlightedElement::info(&rule.id, format!("Barcode dimensions: {}.", NO_CALIBRATION))
            .with_box(barcode.bounding_box)
            .with_expected(expected);
    };

    let measured_width = barcode.pixel_width() * calibration.mm_per_px_x;
    let measured_height = barcode.pixel_height() * calibration.mm_per_px_y;

    let mut inside = true;
    let mut confidence = 1.0_f64;
    let mut problems = Vec::new();
    let checks = [
        ("width", width_mm, measured_width, calibration.mm_per_px_x),
        ("height", height_mm, measured_height, calibration.mm_per_px_y),
    ];
    for (axis, wanted, measured, floor) in checks {
        let Some(wanted) = wanted else {
            continue;
        };
        let band = band_for(rule, &LengthWindow::exactly(wanted), floor);
        confidence = confidence.min(band.confidence(measured));
        if !band.contains(measured) {
            inside = false;
            problems.push(format!(
                "{} {:.2} mm outside {}",
                axis,
                measured,
                band.describe(2, " mm")
            ));
        }
    }
    debug!(rule_id = %rule.id, measured_width, measured_height, inside, "measured barcode");

    let message = if inside {
        format!("Barcode measures {}, within tolerance.", describe_dimensions(Some(measured_width), Some(measured_height)))
    } else {
        format!("Barcode dimensions out of tolerance: {}.", problems.join("; "))
    };
    let found = describe_dimensions(
        width_mm.map(|_| measured_width),
        height_mm.map(|_| measured_height),
    );

    let verdict = HighlightedElement::new(&rule.id, status(inside), message)
        .with_box(barcode.bounding_box)
        .with_found(found)
        .with_expected(expected)
        .with_confidence(confidence);
    note_ambiguity(verdict, &located, &rule.target)
}

/// Offset of a box from an image edge as a fraction of the image extent on that axis.
fn edge_fraction(bounding_box: &BoundingBox, edge: ReferenceEdge, width: u32, height: u32) -> f64 {
    let (w, h) = (f64::from(width), f64::from(height));
    match edge {
        ReferenceEdge::Left => f64::from(bounding_box.x) / w,
        ReferenceEdge::Top => f64::from(bounding_box.y) / h,
        ReferenceEdge::Right => (w - f64::from(bounding_box.right())) / w,
        ReferenceEdge::Bottom => (h - f64::from(bounding_box.bottom())) / h,
    }
}

pub fn evaluate_barcode_placement(
    rule: &RuleDefinition,
    window: &PlacementWindow,
    decoded_value: Option<&str>,
    locator: &ElementLocator<'_>,
) -> HighlightedElement {
    let expected = format!(
        "{:.2}-{:.2} of image from {} edge",
        window.min,
        window.max,
        window.edge.as_str()
    );
    let located = locator.locate_barcode(&rule.target, decoded_value);
    let Some(barcode) = located.best() else {
        return not_found(rule, &rule.target).with_expected(expected);
    };

    let image = &locator.scene().image;
    if image.width == 0 || image.height == 0 {
        return HighlightedElement::info(&rule.id, "Image dimensions are unknown; placement cannot be measured.")
            .with_box(barcode.bounding_box)
            .with_expected(expected);
    }

    let fraction = edge_fraction(&barcode.bounding_box, window.edge, image.width, image.height);
    let band = Band::absolute(window.min, window.max, rule.tolerance);
    let inside = band.contains(fraction);

    let verdict = HighlightedElement::new(
        &rule.id,
        status(inside),
        format!(
            "Barcode sits {:.3} of the image from the {} edge; accepted range {}.",
            fraction,
            window.edge.as_str(),
            band.describe(3, "")
        ),
    )
    .with_box(barcode.bounding_box)
    .with_found(format!("{:.3} from {} edge", fraction, window.edge.as_str()))
    .with_expected(expected)
    .with_confidence(band.confidence(fraction));
    note_ambiguity(verdict, &located, &rule.target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{normalize_rules, Expectation, RawRule};
    use crate::scene::LabelScene;
    use crate::sensitivity::Sensitivity;
    use labelcheck_vision::{FeatureAttributes, ImageInfo};
    use serde_json::json;

    fn rule(value: serde_json::Value) -> RuleDefinition {
        let raw: RawRule = serde_json::from_value(value).unwrap();
        normalize_rules(&[raw], Sensitivity::default()).unwrap().remove(0)
    }

    fn run(rule: &RuleDefinition, scene: &LabelScene, calibration: Option<CalibrationRatio>) -> HighlightedElement {
        let locator = ElementLocator::new(scene, 0.5, 1e-6);
        let calibration = calibration.as_ref();
        match &rule.expectation {
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
            other => panic!("not a geometric rule: {:?}", other),
        }
    }

    fn ratio(mm_per_px: f64) -> Option<CalibrationRatio> {
        CalibrationRatio::isotropic(mm_per_px)
    }

    #[test]
    fn test_band_margins() {
        let band = Band::around(&LengthWindow::exactly(3.0), 0.1, 0.2);
        assert!(band.contains(3.3));
        assert!(!band.contains(3.31));
        assert!((band.confidence(3.0) - 1.0).abs() < 1e-12);
        assert!((band.confidence(3.15) - 0.5).abs() < 1e-9);
        assert!((band.confidence(2.85) - 0.5).abs() < 1e-9);
        assert_eq!(band.confidence(4.0), 0.0);
        assert_eq!(band.confidence(1.0), 0.0);
        assert_eq!(band.describe(2, " mm"), "2.70-3.30 mm");

        let range = Band::absolute(0.1, 0.3, 0.05);
        assert_eq!(range.confidence(0.2), 1.0);
        assert!((range.confidence(0.325) - 0.5).abs() < 1e-9);

        let floored = Band::around(&LengthWindow::exactly(1.0), 0.01, 0.2);
        assert!(floored.contains(1.19));
        assert!(!floored.contains(1.21));
    }

    #[test]
    fn test_font_height_outside_band_is_wrong() {
        let rule = rule(json!({"kind": "font_height", "target": "net weight", "expected_value": "3mm"}));
        let scene = LabelScene::new(ImageInfo::new(500, 500))
            .with_text_regions(vec![TextRegion::new("r1", "Net weight 250g", BoundingBox::new(10, 10, 200, 20))]);

        let verdict = run(&rule, &scene, ratio(0.2));
        assert_eq!(verdict.status, VerdictStatus::Wrong);
        assert_eq!(verdict.found_value.as_deref(), Some("4.00 mm"));
        assert_eq!(verdict.expected_value.as_deref(), Some("3.00 mm"));
        assert_eq!(verdict.confidence, Some(0.0));
    }

    #[test]
    fn test_absolute_tolerance_replaces_relative_band() {
        let rule = rule(json!({
            "kind": "font_height", "target": "net weight", "expected_value": "3mm", "tolerance_mm": 2.0
        }));
        let scene = LabelScene::new(ImageInfo::new(500, 500))
            .with_text_regions(vec![TextRegion::new("r1", "Net weight", BoundingBox::new(10, 10, 200, 20))]);

        let verdict = run(&rule, &scene, ratio(0.2));
        assert_eq!(verdict.status, VerdictStatus::Correct);
        assert!(verdict.message.contains("1.00-5.00 mm"), "{}", verdict.message);
        assert!((verdict.confidence.unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_pixel_font_height_needs_no_calibration() {
        let rule = rule(json!({
            "kind": "font_size", "target": "net weight", "font_size_value": 24, "font_size_unit": "px"
        }));
        let scene = LabelScene::new(ImageInfo::new(500, 500))
            .with_text_regions(vec![TextRegion::new("r1", "Net weight", BoundingBox::new(10, 10, 200, 20))]);

        let verdict = run(&rule, &scene, None);
        assert_eq!(verdict.status, VerdictStatus::Wrong);
        assert_eq!(verdict.found_value.as_deref(), Some("20.00 px"));
        assert_eq!(verdict.expected_value.as_deref(), Some("24.00 px"));
        assert!(verdict.message.contains("21.60-26.40 px"), "{}", verdict.message);
    }

    #[test]
    fn test_font_height_prefers_glyph_row() {
        let rule = rule(json!({"kind": "font_height", "target": "net weight", "expected_value": "3mm"}));
        let scene = LabelScene::new(ImageInfo::new(500, 500))
            .with_text_regions(vec![TextRegion::new("r1", "Net weight 250g", BoundingBox::new(10, 10, 200, 20))])
            .with_visual_features(vec![VisualFeature::new(
                "g1",
                FeatureKind::GlyphRow,
                BoundingBox::new(10, 12, 200, 16),
            )
            .with_attributes(FeatureAttributes {
                pixel_height: Some(15.0),
                ..Default::default()
            })]);

        let verdict = run(&rule, &scene, ratio(0.2));
        assert_eq!(verdict.status, VerdictStatus::Correct);
        assert_eq!(verdict.found_value.as_deref(), Some("3.00 mm"));
    }

    #[test]
    fn test_font_height_without_calibration_is_info() {
        let rule = rule(json!({"kind": "font_height", "target": "net weight", "expected_value": "3mm"}));
        let scene = LabelScene::new(ImageInfo::new(500, 500))
            .with_text_regions(vec![TextRegion::new("r1", "Net weight", BoundingBox::new(10, 10, 200, 20))]);

        let verdict = run(&rule, &scene, None);
        assert_eq!(verdict.status, VerdictStatus::Info);
        assert!(verdict.message.contains("no calibration reference found"));
        assert!(verdict.found_value.is_none());
        assert_eq!(verdict.bounding_box, Some(BoundingBox::new(10, 10, 200, 20)));
    }

    #[test]
    fn test_min_operator_has_open_upper_bound() {
        let rule = rule(json!({
            "kind": "font_size", "target_description": "net weight",
            "font_size_value": 1.2, "font_size_unit": "mm", "font_size_operator": "min"
        }));
        let scene = LabelScene::new(ImageInfo::new(500, 500))
            .with_text_regions(vec![TextRegion::new("r1", "Net weight", BoundingBox::new(10, 10, 200, 60))]);
        assert_eq!(run(&rule, &scene, ratio(0.1)).status, VerdictStatus::Correct);
    }

    fn spacing_scene() -> LabelScene {
        LabelScene::new(ImageInfo::new(500, 500)).with_text_regions(vec![
            TextRegion::new("name", "Product name", BoundingBox::new(10, 10, 100, 20)),
            TextRegion::new("weight", "Net weight", BoundingBox::new(10, 50, 100, 20)),
        ])
    }

    #[test]
    fn test_spacing_measures_edge_gap() {
        let rule = rule(json!({
            "kind": "spacing", "target": "product name", "secondary_target": "net weight",
            "expected_value": "2mm"
        }));
        let verdict = run(&rule, &spacing_scene(), ratio(0.1));
        assert_eq!(verdict.status, VerdictStatus::Correct);
        assert_eq!(verdict.found_value.as_deref(), Some("2.00 mm"));
        assert_eq!(verdict.bounding_box, Some(BoundingBox::new(10, 10, 100, 60)));
    }

    #[test]
    fn test_spacing_in_pixels() {
        let rule = rule(json!({
            "kind": "spacing", "target": "product name", "secondary_target": "net weight",
            "expected_value": 20, "unit": "px"
        }));
        let verdict = run(&rule, &spacing_scene(), None);
        assert_eq!(verdict.status, VerdictStatus::Correct);
        assert_eq!(verdict.found_value.as_deref(), Some("20.00 px"));
    }

    #[test]
    fn test_spacing_same_region_is_info() {
        let rule = rule(json!({
            "kind": "spacing", "target": "net weight", "secondary_target": "weight",
            "expected_value": "2mm"
        }));
        let verdict = run(&rule, &spacing_scene(), ratio(0.1));
        assert_eq!(verdict.status, VerdictStatus::Info);
        assert!(verdict.message.contains("same region"));
    }

    #[test]
    fn test_spacing_missing_secondary_is_info() {
        let rule = rule(json!({
            "kind": "spacing", "target": "product name", "secondary_target": "allergens",
            "expected_value": "2mm"
        }));
        let verdict = run(&rule, &spacing_scene(), ratio(0.1));
        assert_eq!(verdict.status, VerdictStatus::Info);
        assert!(verdict.message.contains("allergens"));
    }

    fn barcode_scene() -> LabelScene {
        LabelScene::new(ImageInfo::new(1000, 1000)).with_visual_features(vec![VisualFeature::barcode(
            "b1",
            BoundingBox::new(400, 720, 373, 259),
            "5012345678900",
        )])
    }

    #[test]
    fn test_barcode_dimensions_within_tolerance() {
        let rule = rule(json!({"kind": "barcode_dimensions", "expected_width_mm": 37.29, "expected_height_mm": 25.93}));
        let verdict = run(&rule, &barcode_scene(), ratio(0.1));
        assert_eq!(verdict.status, VerdictStatus::Correct);
        assert_eq!(verdict.found_value.as_deref(), Some("37.30 x 25.90 mm"));
    }

    #[test]
    fn test_barcode_too_narrow_is_wrong() {
        let rule = rule(json!({"kind": "barcode_dimension", "expected_width_mm": 45.0}));
        let verdict = run(&rule, &barcode_scene(), ratio(0.1));
        assert_eq!(verdict.status, VerdictStatus::Wrong);
        assert!(verdict.message.contains("width 37.30 mm"), "{}", verdict.message);
    }

    #[test]
    fn test_barcode_without_calibration_or_barcode_is_info() {
        let rule = rule(json!({"kind": "barcode_dimension", "expected_width_mm": 37.29}));
        assert_eq!(run(&rule, &barcode_scene(), None).status, VerdictStatus::Info);

        let empty = LabelScene::new(ImageInfo::new(1000, 1000));
        let verdict = run(&rule, &empty, ratio(0.1));
        assert_eq!(verdict.status, VerdictStatus::Info);
        assert!(verdict.bounding_box.is_none());
    }

    #[test]
    fn test_barcode_placement_from_bottom_edge() {
        let rule = rule(json!({
            "kind": "barcode_placement", "placement": {"edge": "bottom", "min": 0.0, "max": 0.05}
        }));
        let correct = run(&rule, &barcode_scene(), None);
        assert_eq!(correct.status, VerdictStatus::Correct);

        let rule = rule_with_left_window();
        let wrong = run(&rule, &barcode_scene(), None);
        assert_eq!(wrong.status, VerdictStatus::Wrong);
        assert!(wrong.found_value.as_deref().unwrap().starts_with("0.400"));
    }

    fn rule_with_left_window() -> RuleDefinition {
        rule(json!({
            "kind": "barcode_placement", "placement": {"edge": "left", "min": 0.0, "max": 0.1}
        }))
    }
}
