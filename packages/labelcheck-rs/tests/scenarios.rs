//! End-to-end rule evaluation scenarios over in-memory scenes

use labelcheck_rs::prelude::*;
use serde_json::{json, Value};

fn rules(value: Value) -> Vec<RawRule> {
    serde_json::from_value(value).unwrap()
}

fn verifier() -> Verifier {
    Verifier::new(VerifierOptions {
        max_workers: 2,
        ..Default::default()
    })
    .unwrap()
}

fn evaluate(rules: &[RawRule], scene: &LabelScene, calibration: Option<CalibrationRatio>, sensitivity: i64) -> AnalysisReport {
    verifier()
        .evaluate(rules, scene, calibration, Sensitivity::new(sensitivity).unwrap())
        .unwrap()
}

fn dairy_label() -> LabelScene {
    LabelScene::new(ImageInfo::new(1000, 800).with_filename("dairy.png"))
        .with_text_regions(vec![
            TextRegion::new("brand", "Alpine Dairy", BoundingBox::new(50, 30, 300, 40)).with_confidence(0.98),
            TextRegion::new("weight_label", "Net weight", BoundingBox::new(50, 100, 120, 20)),
            TextRegion::new("weight_value", "250g", BoundingBox::new(180, 100, 50, 20)).with_confidence(0.95),
            TextRegion::new("allergens", "Contains: milk, soya", BoundingBox::new(50, 140, 260, 18)),
            TextRegion::new("ingredients_en", "Ingredients", BoundingBox::new(50, 200, 110, 16)).with_language("en"),
            TextRegion::new("ingredients_fr", "Ingredients", BoundingBox::new(50, 225, 110, 16)).with_language("fr"),
        ])
        .with_visual_features(vec![VisualFeature::barcode(
            "ean",
            BoundingBox::new(600, 520, 380, 260),
            "5012345678900",
        )])
}

#[test]
fn test_one_verdict_per_rule() {
    let rules = rules(json!([
        {"kind": "exact_text", "target": "brand name", "expected_text": "Alpine Dairy"},
        {"kind": "exact_text", "target": "storage instructions", "expected_text": "Keep refrigerated"},
        {"kind": "font_height", "target": "net weight", "expected_value": "2mm"},
        {"kind": "barcode_dimension", "expected_width_mm": 38.0},
        {"kind": "barcode_placement", "placement": {"edge": "right", "min": 0.0, "max": 0.05}}
    ]));
    let report = evaluate(&rules, &dairy_label(), None, 50);
    assert_eq!(report.highlights.len(), rules.len());
    assert_eq!(report.summary.total_rules_defined, rules.len());
    assert_eq!(
        report.summary.matches + report.summary.mismatches_or_errors_in_rules,
        rules.len()
    );
}

#[test]
fn test_net_weight_scenario() {
    let rules = rules(json!([{"kind": "exact_text", "target": "net weight", "expected_text": "250g"}]));
    let scene = LabelScene::new(ImageInfo::new(500, 500))
        .with_text_regions(vec![TextRegion::new("r1", "250g", BoundingBox::new(10, 10, 40, 12))]);

    let report = evaluate(&rules, &scene, None, 50);
    let verdict = &report.highlights[0];
    assert_eq!(verdict.status, VerdictStatus::Correct);
    assert_eq!(verdict.found_value.as_deref(), Some("250g"));
    assert_eq!(verdict.bounding_box, Some(BoundingBox::new(10, 10, 40, 12)));
    assert_eq!(report.overall_status, OverallStatus::Pass);
}

#[test]
fn test_value_region_beats_label_region() {
    let rules = rules(json!([{"kind": "exact_text", "target": "net weight", "expected_text": "250g"}]));
    let report = evaluate(&rules, &dairy_label(), None, 50);
    assert_eq!(report.highlights[0].status, VerdictStatus::Correct);
    assert_eq!(report.highlights[0].bounding_box, Some(BoundingBox::new(180, 100, 50, 20)));
}

#[test]
fn test_single_character_difference_is_wrong() {
    let rules = rules(json!([{"kind": "exact_text", "target": "net weight", "expected_text": "250 g"}]));
    let report = evaluate(&rules, &dairy_label(), None, 0);
    assert_eq!(report.highlights[0].status, VerdictStatus::Wrong);
    assert_eq!(report.overall_status, OverallStatus::FailMinor);
}

#[test]
fn test_font_height_scenario() {
    // 20 px at 0.2 mm/px is 4 mm, outside 3 mm +/- 10%
    let rules = rules(json!([{"kind": "font_height", "target": "net weight", "expected_value": "3mm"}]));
    let scene = LabelScene::new(ImageInfo::new(500, 500))
        .with_text_regions(vec![TextRegion::new("r1", "Net weight", BoundingBox::new(10, 10, 120, 20))]);

    let report = evaluate(&rules, &scene, CalibrationRatio::isotropic(0.2), 50);
    let verdict = &report.highlights[0];
    assert_eq!(verdict.status, VerdictStatus::Wrong);
    assert_eq!(verdict.found_value.as_deref(), Some("4.00 mm"));
    assert!(verdict.message.contains("2.70-3.30 mm"), "{}", verdict.message);
}

#[test]
fn test_missing_calibration_makes_physical_rules_info() {
    let rules = rules(json!([
        {"kind": "font_height", "target": "net weight", "expected_value": "3mm"},
        {"kind": "font_height", "target": "Alpine Dairy", "expected_value": "1.2mm", "operator": "min"},
        {"kind": "barcode_dimension", "expected_width_mm": 37.29, "expected_height_mm": 25.93},
        {"kind": "exact_text", "target": "brand", "expected_text": "Alpine Dairy"}
    ]));
    let report = evaluate(&rules, &dairy_label(), None, 50);

    for verdict in &report.highlights[..3] {
        assert_eq!(verdict.status, VerdictStatus::Info, "{}", verdict.rule_id_ref);
        assert!(verdict.found_value.is_none());
    }
    assert_eq!(report.highlights[3].status, VerdictStatus::Correct);
    assert_eq!(report.overall_status, OverallStatus::ProcessingError);
    assert_eq!(report.summary.unresolved, 3);
}

#[test]
fn test_barcode_reference_calibrates_scene() {
    let scene = dairy_label();
    let references = vec![CalibrationReference {
        decoded_value: Some("5012345678900".to_string()),
        width_mm: 38.0,
        height_mm: Some(26.0),
    }];
    let calibration = resolve_calibration(&scene.visual_features, &scene.image, &references);
    let rules = rules(json!([
        {"kind": "barcode_dimension", "expected_width_mm": 38.0, "expected_height_mm": 26.0, "barcode_value": "5012345678900"}
    ]));
    let report = evaluate(&rules, &scene, calibration, 100);
    assert_eq!(report.highlights[0].status, VerdictStatus::Correct);
}

#[test]
fn test_unlocatable_target_is_info() {
    let rules = rules(json!([{"kind": "exact_text", "target": "organic certification seal", "expected_text": "EU Organic"}]));
    let report = evaluate(&rules, &dairy_label(), None, 50);
    let verdict = &report.highlights[0];
    assert_eq!(verdict.status, VerdictStatus::Info);
    assert!(verdict.found_value.is_none());

    let value = serde_json::to_value(verdict).unwrap();
    assert!(value["found_value"].is_null());
    assert!(value["bounding_box"].is_null());
}

#[test]
fn test_raising_sensitivity_never_fixes_a_failure() {
    let rules = rules(json!([
        {"kind": "exact_text", "target": "allergens", "expected_text": "Contains: milk, soy", "allow_near_match": true},
        {"kind": "font_height", "target": "net weight", "expected_value": "2.1mm"},
        {"kind": "spacing", "target": "alpine dairy", "secondary_target": "net weight", "expected_value": "3.2mm"},
        {"kind": "barcode_dimension", "expected_width_mm": 40.0, "expected_height_mm": 27.0},
        {"kind": "barcode_placement", "placement": {"edge": "bottom", "min": 0.01, "max": 0.02}},
        {"kind": "translated_text", "target": "ingredients", "translations": [
            {"language": "en", "text": "Ingredients"},
            {"language": "fr", "text": "Ingrédients"}
        ]}
    ]));
    let scene = dairy_label();
    let calibration = CalibrationRatio::isotropic(0.1);

    let mut previous: Option<AnalysisReport> = None;
    for sensitivity in (0..=100).step_by(10) {
        let report = evaluate(&rules, &scene, calibration, sensitivity);
        if let Some(previous) = &previous {
            for (before, after) in previous.highlights.iter().zip(&report.highlights) {
                if before.status == VerdictStatus::Wrong {
                    assert_eq!(
                        after.status,
                        VerdictStatus::Wrong,
                        "{} became {:?} at sensitivity {}",
                        after.rule_id_ref,
                        after.status,
                        sensitivity
                    );
                }
            }
        }
        previous = Some(report);
    }

    let strictest = previous.unwrap();
    assert!(strictest
        .highlights
        .iter()
        .any(|h| h.status == VerdictStatus::Wrong));
}

#[test]
fn test_overall_status_follows_critical_failures() {
    let scene = dairy_label();
    let critical_wrong = rules(json!([
        {"kind": "exact_text", "target": "brand", "expected_text": "Alpine Dairy"},
        {"kind": "exact_text", "target": "net weight", "expected_text": "500g", "severity": "critical"}
    ]));
    assert_eq!(
        evaluate(&critical_wrong, &scene, None, 50).overall_status,
        OverallStatus::FailCritical
    );

    let critical_correct = rules(json!([
        {"kind": "exact_text", "target": "brand", "expected_text": "Alpine Dairy", "severity": "critical"},
        {"kind": "exact_text", "target": "net weight", "expected_text": "500g"}
    ]));
    assert_eq!(
        evaluate(&critical_correct, &scene, None, 50).overall_status,
        OverallStatus::FailMinor
    );

    let all_correct = rules(json!([
        {"kind": "exact_text", "target": "brand", "expected_text": "Alpine Dairy", "severity": "critical"},
        {"kind": "exact_text", "target": "net weight", "expected_text": "250g"}
    ]));
    assert_eq!(evaluate(&all_correct, &scene, None, 50).overall_status, OverallStatus::Pass);
}

#[test]
fn test_translation_mismatch_names_the_language() {
    let rules = rules(json!([{"kind": "translation_match", "target": "ingredients header", "translations": [
        {"language": "en", "text": "Ingredients"},
        {"language": "fr", "text": "Ingrédients"}
    ]}]));
    let report = evaluate(&rules, &dairy_label(), None, 50);
    let verdict = &report.highlights[0];
    assert_eq!(verdict.status, VerdictStatus::Wrong);
    assert!(verdict.message.contains("fr:"), "{}", verdict.message);
    assert_eq!(verdict.bounding_box, Some(BoundingBox::new(50, 200, 110, 41)));
}

#[test]
fn test_report_json_round_trip() {
    let rules = rules(json!([
        {"id": "weight", "kind": "exact_text", "target": "net weight", "expected_text": "250g"},
        {"id": "height", "kind": "font_height", "target": "net weight", "expected_value": "3mm"},
        {"id": "seal", "kind": "exact_text", "target": "organic seal", "expected_text": "EU Organic"}
    ]));
    let scene = LabelScene::new(ImageInfo::new(500, 500).with_filename("label.jpg")).with_text_regions(vec![
        TextRegion::new("r1", "Net weight", BoundingBox::new(10, 10, 120, 20)),
        TextRegion::new("r2", "250g", BoundingBox::new(140, 10, 40, 20)),
    ]);
    let report = evaluate(&rules, &scene, CalibrationRatio::isotropic(0.2), 50);

    let json = report.to_json().unwrap();
    let parsed: AnalysisReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, report);

    let ids: Vec<_> = parsed.highlights.iter().map(|h| h.rule_id_ref.as_str()).collect();
    assert_eq!(ids, vec!["weight", "height", "seal"]);

    let keys = ["\"analysis_id\"", "\"original_filename\"", "\"overall_status\"", "\"summary\"", "\"highlights\"", "\"timestamp\""];
    let positions: Vec<_> = keys.iter().map(|k| json.find(k).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(!json.contains("processed_image_url"));
}
