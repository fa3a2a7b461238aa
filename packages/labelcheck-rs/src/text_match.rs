//! Text content rules: exact match, near match, translated-text parity and presence.
use labelcheck_vision::BoundingBox;
use std::collections::HashSet;
use tracing::warn;

use crate::locator::{ElementLocator, LocateQuery, Located};
use crate::report::{HighlightedElement, VerdictStatus};
use crate::rules::{LanguageVariant, MatchMode, RuleDefinition, TextExpectation};

/// Trims and collapses whitespace runs to one space. Punctuation is kept; case is
/// folded only when `case_sensitive` is false.
pub fn normalize_text(text: &str, case_sensitive: bool) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if case_sensitive {
        collapsed
    } else {
        collapsed.to_lowercase()
    }
}

/// Normalized Levenshtein similarity in `[0, 1]`; 1 means identical.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// 1-based character position of the first difference, if the strings differ.
fn first_difference(a: &str, b: &str) -> Option<usize> {
    let mut left = a.chars();
    let mut right = b.chars();
    let mut position = 1;
    loop {
        match (left.next(), right.next()) {
            (None, None) => return None,
            (Some(x), Some(y)) if x == y => position += 1,
            _ => return Some(position),
        }
    }
}

fn ambiguity_note<T>(located: &Located<'_, T>, target: &str, chosen_id: &str) -> Option<String> {
    located.is_ambiguous().then(|| {
        format!(
            "Ambiguous target: {} regions matched '{}' equally well; only '{}' was evaluated.",
            located.tied_count(),
            target,
            chosen_id
        )
    })
}

pub fn evaluate_text(
    rule: &RuleDefinition,
    expectation: &TextExpectation,
    locator: &ElementLocator<'_>,
) -> HighlightedElement {
    let located = locator.locate_text(&LocateQuery::described(&rule.target).expecting(&expectation.text));
    let Some(region) = located.best() else {
        warn!(rule_id = %rule.id, target = %rule.target, "text target not found");
        return HighlightedElement::info(
            &rule.id,
            format!("Could not locate '{}' on the label.", rule.target),
        )
        .with_expected(&expectation.text);
    };

    let found_display = normalize_text(&region.text, true);
    let found = normalize_text(&region.text, expectation.case_sensitive);
    let expected = normalize_text(&expectation.text, expectation.case_sensitive);

    let verdict = match expectation.mode {
        MatchMode::Exact if found == expected => HighlightedElement::new(
            &rule.id,
            VerdictStatus::Correct,
            format!("Found expected text: '{}'", expectation.text),
        )
        .with_confidence(f64::from(region.confidence)),
        MatchMode::Exact => {
            let position = first_difference(&found, &expected).unwrap_or(1);
            HighlightedElement::new(
                &rule.id,
                VerdictStatus::Wrong,
                format!(
                    "Expected '{}' but found '{}' (first difference at character {}).",
                    expectation.text, found_display, position
                ),
            )
            .with_confidence(f64::from(region.confidence))
        }
        MatchMode::Fuzzy => {
            let ratio = similarity_ratio(&found, &expected);
            let status = if ratio >= rule.tolerance {
                VerdictStatus::Correct
            } else {
                VerdictStatus::Wrong
            };
            HighlightedElement::new(
                &rule.id,
                status,
                format!(
                    "Similarity {:.3} to expected text '{}' (threshold {:.3}).",
                    ratio, expectation.text, rule.tolerance
                ),
            )
            .with_confidence(ratio)
        }
    };

    let verdict = verdict
        .with_box(region.bounding_box)
        .with_found(found_display)
        .with_expected(&expectation.text);
    match ambiguity_note(&located, &rule.target, &region.id) {
        Some(note) => verdict.with_note(&note),
        None => verdict,
    }
}

pub fn evaluate_translations(
    rule: &RuleDefinition,
    variants: &[LanguageVariant],
    case_sensitive: bool,
    locator: &ElementLocator<'_>,
) -> HighlightedElement {
    let mut mismatches = Vec::new();
    let mut missing = Vec::new();
    let mut found_parts = Vec::new();
    let mut notes = Vec::new();
    let mut bounding_box: Option<BoundingBox> = None;
    let mut confidence = 1.0_f64;
    // A region answers for one language only.
    let mut claimed: HashSet<&str> = HashSet::new();

    for variant in variants {
        let query = LocateQuery::described(&rule.target)
            .expecting(&variant.text)
            .in_language(&variant.language);
        let mut located = locator.locate_text(&query);
        located.retain(|region| !claimed.contains(region.id.as_str()));
        let Some(region) = located.best() else {
            if variant.required {
                missing.push(variant.language.as_str());
            }
            continue;
        };

        claimed.insert(region.id.as_str());
        let found_display = normalize_text(&region.text, true);
        if normalize_text(&region.text, case_sensitive) != normalize_text(&variant.text, case_sensitive) {
            mismatches.push(format!(
                "{}: found '{}', expected '{}'",
                variant.language, found_display, variant.text
            ));
        }
        found_parts.push(format!("{}: '{}'", variant.language, found_display));
        bounding_box = Some(match bounding_box {
            Some(b) => b.union(&region.bounding_box),
            None => region.bounding_box,
        });
        confidence = confidence.min(f64::from(region.confidence));
        if let Some(note) = ambiguity_note(&located, &format!("{} ({})", rule.target, variant.language), &region.id) {
            notes.push(note);
        }
    }

    let expected = variants
        .iter()
        .map(|v| format!("{}: '{}'", v.language, v.text))
        .collect::<Vec<_>>()
        .join("; ");

    let mut verdict = if !mismatches.is_empty() {
        HighlightedElement::new(
            &rule.id,
            VerdictStatus::Wrong,
            format!("Translation mismatch: {}.", mismatches.join("; ")),
        )
        .with_confidence(confidence)
    } else if !missing.is_empty() {
        warn!(rule_id = %rule.id, languages = ?missing, "required language variants not found");
        HighlightedElement::info(
            &rule.id,
            format!("Could not locate required language variant(s): {}.", missing.join(", ")),
        )
    } else {
        HighlightedElement::new(
            &rule.id,
            VerdictStatus::Correct,
            format!("All {} located language variant(s) match.", found_parts.len()),
        )
        .with_confidence(confidence)
    };

    verdict = verdict.with_expected(expected);
    if !found_parts.is_empty() {
        verdict = verdict.with_found(found_parts.join("; "));
    }
    if let Some(b) = bounding_box {
        verdict = verdict.with_box(b);
    }
    for note in notes {
        verdict = verdict.with_note(&note);
    }
    verdict
}

/// Checks that the target is on the label, or that it is not when `expect_present` is
/// false. With `expected_text`, a located region only counts when it reads that text to
/// within the rule's similarity threshold.
pub fn evaluate_presence(
    rule: &RuleDefinition,
    expected_text: Option<&str>,
    expect_present: bool,
    locator: &ElementLocator<'_>,
) -> HighlightedElement {
    let query = match expected_text {
        Some(text) => LocateQuery::described(&rule.target).expecting(text),
        None => LocateQuery::described(&rule.target),
    };
    let located = locator.locate_text(&query);
    let found = located.best().filter(|region| match expected_text {
        Some(text) => {
            similarity_ratio(&normalize_text(&region.text, false), &normalize_text(text, false)) >= rule.tolerance
        }
        None => true,
    });

    let verdict = match (found, expect_present) {
        (Some(_), true) => HighlightedElement::new(
            &rule.id,
            VerdictStatus::Correct,
            format!("Found '{}' on the label.", rule.target),
        ),
        (Some(region), false) => HighlightedElement::new(
            &rule.id,
            VerdictStatus::Wrong,
            format!(
                "'{}' must not appear on the label but was found: '{}'.",
                rule.target,
                normalize_text(&region.text, true)
            ),
        ),
        (None, true) => {
            return HighlightedElement::new(
                &rule.id,
                VerdictStatus::Wrong,
                format!("'{}' is missing from the label.", rule.target),
            )
            .with_expected("present")
        }
        (None, false) => {
            return HighlightedElement::new(
                &rule.id,
                VerdictStatus::Correct,
                format!("'{}' does not appear on the label.", rule.target),
            )
            .with_expected("absent")
        }
    };

    let Some(region) = found else {
        return verdict;
    };
    let verdict = verdict
        .with_box(region.bounding_box)
        .with_found(normalize_text(&region.text, true))
        .with_expected(if expect_present { "present" } else { "absent" })
        .with_confidence(f64::from(region.confidence));
    match ambiguity_note(&located, &rule.target, &region.id) {
        Some(note) => verdict.with_note(&note),
        None => verdict,
    }
}
