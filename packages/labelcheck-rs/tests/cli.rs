//! Integration tests for the CLI commands

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_version_command() {
    let mut cmd = cargo_bin_cmd!("labelcheck");
    cmd.arg("version");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("labelcheck "));
}

#[test]
fn test_version_flag() {
    let mut cmd = cargo_bin_cmd!("labelcheck");
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("labelcheck "));
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

const SCENE: &str = r#"{
    "image": {"width": 600, "height": 400, "filename": "yogurt.png"},
    "text_regions": [
        {"id": "r1", "text": "Net weight", "bounding_box": {"x": 10, "y": 10, "width": 120, "height": 20}},
        {"id": "r2", "text": "250g", "bounding_box": {"x": 140, "y": 10, "width": 40, "height": 20}}
    ],
    "visual_features": [
        {"id": "b1", "kind": "barcode", "bounding_box": {"x": 300, "y": 250, "width": 200, "height": 100},
         "attributes": {"decoded_value": "4006381333931"}}
    ],
    "calibration_references": [{"decoded_value": "4006381333931", "width_mm": 40.0}]
}"#;

const RULE_SET: &str = r#"{
    "name": "Yogurt pot",
    "conditions": [
        {"type": "exact_text_match", "target_element_description": "net weight", "expected_text": "250g"},
        {"type": "font_size", "target_element_description": "net weight", "font_size_value": 4, "font_size_unit": "mm"}
    ]
}"#;

#[test]
fn test_evaluate_prints_report() {
    let dir = TempDir::new().unwrap();
    let rules = write(dir.path(), "rules.json", RULE_SET);
    let scene = write(dir.path(), "scene.json", SCENE);

    let mut cmd = cargo_bin_cmd!("labelcheck");
    cmd.arg("evaluate").arg("--rules").arg(&rules).arg("--scene").arg(&scene);

    let output = cmd.assert().success().get_output().stdout.clone();
    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["overall_status"], "pass");
    assert_eq!(report["original_filename"], "yogurt.png");
    assert_eq!(report["summary"]["total_rules_defined"], 2);
    assert_eq!(report["highlights"][0]["rule_id_ref"], "rule_1_exact_text");
    assert_eq!(report["highlights"][1]["found_value"], "4.00 mm");
}

#[test]
fn test_mm_per_px_overrides_reference() {
    let dir = TempDir::new().unwrap();
    let rules = write(dir.path(), "rules.json", RULE_SET);
    let scene = write(dir.path(), "scene.json", SCENE);

    let mut cmd = cargo_bin_cmd!("labelcheck");
    cmd.args(["evaluate", "--mm-per-px", "0.25", "--sensitivity", "100"])
        .arg("--rules")
        .arg(&rules)
        .arg("--scene")
        .arg(&scene);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"fail_minor\""))
        .stdout(predicate::str::contains("5.00 mm"));
}

#[test]
fn test_output_file_keeps_stdout_empty() {
    let dir = TempDir::new().unwrap();
    let rules = write(dir.path(), "rules.json", RULE_SET);
    let scene = write(dir.path(), "scene.json", SCENE);
    let report_path = dir.path().join("report.json");

    let mut cmd = cargo_bin_cmd!("labelcheck");
    cmd.arg("evaluate")
        .arg("-r")
        .arg(&rules)
        .arg("-s")
        .arg(&scene)
        .arg("-o")
        .arg(&report_path);

    cmd.assert().success().stdout(predicate::str::is_empty());
    let written = fs::read_to_string(&report_path).unwrap();
    assert!(written.contains("\"highlights\""));
}

#[test]
fn test_invalid_rule_exits_with_status_two() {
    let dir = TempDir::new().unwrap();
    let rules = write(
        dir.path(),
        "rules.json",
        r#"[{"kind": "font_height", "target": "net weight", "expected_value": 3}]"#,
    );
    let scene = write(dir.path(), "scene.json", SCENE);

    let mut cmd = cargo_bin_cmd!("labelcheck");
    cmd.arg("evaluate").arg("-r").arg(&rules).arg("-s").arg(&scene);

    cmd.assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("expected_value"));
}

#[test]
fn test_missing_scene_file_exits_with_status_two() {
    let dir = TempDir::new().unwrap();
    let rules = write(dir.path(), "rules.json", RULE_SET);

    let mut cmd = cargo_bin_cmd!("labelcheck");
    cmd.arg("evaluate")
        .arg("-r")
        .arg(&rules)
        .arg("-s")
        .arg(dir.path().join("missing.json"));

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to read scene file"));
}
