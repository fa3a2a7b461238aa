//! Rule normalization: raw rule entries in, typed [`RuleDefinition`]s out.
//!
//! Normalization is all-or-nothing. The first malformed entry rejects the batch with a
//! [`RuleValidationError`] naming the rule and field, so callers never evaluate a partial
//! rule set.
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use crate::error::RuleValidationError;
use crate::sensitivity::{Sensitivity, ToleranceTable};

/// Number with an optional trailing unit: `3mm`, `0.5 in`, `.8pt`, `12`.
static LENGTH_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn length_pattern() -> Option<&'static Regex> {
    LENGTH_PATTERN
        .get_or_init(|| Regex::new(r"^\s*(\d+(?:\.\d+)?|\.\d+)\s*([A-Za-z]+)?\s*$").ok())
        .as_ref()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    ExactText,
    TranslatedText,
    FontHeight,
    Spacing,
    BarcodeDimension,
    BarcodePlacement,
    ElementPresence,
}

impl RuleKind {
    /// Accepts the canonical names plus the names used by older rule documents.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "exact_text" | "exact_text_match" => Some(Self::ExactText),
            "translated_text" | "translation_match" => Some(Self::TranslatedText),
            "font_height" | "font_size" => Some(Self::FontHeight),
            "spacing" => Some(Self::Spacing),
            "barcode_dimension" | "barcode_dimensions" => Some(Self::BarcodeDimension),
            "barcode_placement" => Some(Self::BarcodePlacement),
            "element_presence" | "presence" => Some(Self::ElementPresence),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExactText => "exact_text",
            Self::TranslatedText => "translated_text",
            Self::FontHeight => "font_height",
            Self::Spacing => "spacing",
            Self::BarcodeDimension => "barcode_dimension",
            Self::BarcodePlacement => "barcode_placement",
            Self::ElementPresence => "element_presence",
        }
    }

    /// Kinds that accept a per-rule `tolerance_mm`.
    fn takes_absolute_tolerance(&self) -> bool {
        matches!(self, Self::FontHeight | Self::Spacing | Self::BarcodeDimension)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    #[default]
    Minor,
}

/// How a bound in a [`LengthWindow`] is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Exactly,
    Min,
    Max,
    Between,
}

/// Unit a [`LengthWindow`] is expressed in. Physical units are converted to
/// millimeters when the rule is normalized; pixel windows are compared as measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    Millimeters,
    Pixels,
}

impl LengthUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Millimeters => "mm",
            Self::Pixels => "px",
        }
    }

    pub fn format(&self, value: f64) -> String {
        format!("{:.2} {}", value, self.symbol())
    }
}

/// Expected length. A missing bound is open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthWindow {
    pub comparison: Comparison,
    pub unit: LengthUnit,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl LengthWindow {
    pub fn exactly(mm: f64) -> Self {
        Self {
            comparison: Comparison::Exactly,
            unit: LengthUnit::Millimeters,
            lower: Some(mm),
            upper: Some(mm),
        }
    }

    pub fn in_pixels(mut self) -> Self {
        self.unit = LengthUnit::Pixels;
        self
    }
}

impl fmt::Display for LengthWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.unit.symbol();
        match (self.comparison, self.lower, self.upper) {
            (Comparison::Exactly, Some(v), _) => write!(f, "{:.2} {}", v, unit),
            (Comparison::Min, Some(v), _) => write!(f, ">= {:.2} {}", v, unit),
            (Comparison::Max, _, Some(v)) => write!(f, "<= {:.2} {}", v, unit),
            (Comparison::Between, Some(lo), Some(hi)) => write!(f, "{:.2}-{:.2} {}", lo, hi, unit),
            _ => write!(f, "unbounded"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceEdge {
    Left,
    Right,
    Top,
    Bottom,
}

impl ReferenceEdge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

/// Expected offset of a barcode from an image edge, as a fraction of the image size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementWindow {
    pub edge: ReferenceEdge,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    /// Near-match by similarity ratio; the threshold is the rule's tolerance.
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextExpectation {
    pub text: String,
    pub case_sensitive: bool,
    pub mode: MatchMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LanguageVariant {
    pub language: String,
    pub text: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    Text(TextExpectation),
    Translations {
        variants: Vec<LanguageVariant>,
        case_sensitive: bool,
    },
    FontHeight(LengthWindow),
    Spacing {
        secondary_target: String,
        window: LengthWindow,
    },
    BarcodeDimension {
        width_mm: Option<f64>,
        height_mm: Option<f64>,
        decoded_value: Option<String>,
    },
    BarcodePlacement {
        window: PlacementWindow,
        decoded_value: Option<String>,
    },
    /// The target must be on the label (`present`) or must not be. With `expected_text`,
    /// only a region reading that text counts.
    Presence {
        expected_text: Option<String>,
        present: bool,
    },
}

impl Expectation {
    pub fn length_window(&self) -> Option<&LengthWindow> {
        match self {
            Self::FontHeight(window) | Self::Spacing { window, .. } => Some(window),
            _ => None,
        }
    }
}

/// A validated, immutable compliance rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDefinition {
    pub id: String,
    pub kind: RuleKind,
    pub description: Option<String>,
    pub target: String,
    pub expectation: Expectation,
    /// Sensitivity-derived tolerance. Its unit depends on the kind: a minimum similarity
    /// ratio for text, a fraction of the expected value for font height, spacing and
    /// barcode dimensions, and an image fraction for barcode placement.
    pub tolerance: f64,
    /// Fixed band half-width in millimeters written on the rule. Replaces the relative
    /// tolerance for font height, spacing and barcode dimensions.
    pub absolute_tolerance_mm: Option<f64>,
    pub severity: Severity,
    pub sensitivity: Sensitivity,
}

impl RuleDefinition {
    /// Whether evaluating the rule needs a calibration ratio.
    pub fn needs_calibration(&self) -> bool {
        match &self.expectation {
            Expectation::BarcodeDimension { .. } => true,
            other => other
                .length_window()
                .is_some_and(|window| window.unit == LengthUnit::Millimeters),
        }
    }
}

/// One language variant of a translated-text rule, as written in a rule document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTranslation {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub required: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPlacement {
    #[serde(default)]
    pub edge: Option<String>,
    #[serde(default)]
    pub min: Option<Value>,
    #[serde(default)]
    pub max: Option<Value>,
}

/// A rule entry as produced by the rule-document ingestion layer.
///
/// Every field is optional here, and numeric or boolean fields are kept as raw JSON, so
/// [`normalize_rules`] can report a malformed value against the rule that carries it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, alias = "type")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "target_description", alias = "target_element_description")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_text: Option<String>,
    /// Text, `"3mm"`-style length, or a bare number combined with `unit`.
    #[serde(default, alias = "font_size_value", skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<Value>,
    #[serde(default, alias = "font_size_unit", skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, alias = "font_size_operator", skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, alias = "font_size_value_upper", skip_serializing_if = "Option::is_none")]
    pub expected_upper: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_near_match: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translations: Option<Vec<RawTranslation>>,
    /// Single-language shorthand for a translated-text rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_width_mm: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_height_mm: Option<Value>,
    /// Absolute tolerance in millimeters, overriding the sensitivity-derived one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance_mm: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<RawPlacement>,
    /// For presence rules: whether the target must appear (default) or must not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_present: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity_override: Option<Value>,
}

/// A named collection of rules, the shape used by stored rule documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub conditions: Vec<RawRule>,
}

/// Either a bare list of rules or a full [`RuleSet`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleDocument {
    Rules(Vec<RawRule>),
    Set(RuleSet),
}

impl RuleDocument {
    pub fn into_rules(self) -> Vec<RawRule> {
        match self {
            Self::Rules(rules) => rules,
            Self::Set(set) => set.conditions,
        }
    }
}

/// Validates and canonicalizes a batch of raw rules.
pub fn normalize_rules(
    raw: &[RawRule],
    sensitivity: Sensitivity,
) -> Result<Vec<RuleDefinition>, RuleValidationError> {
    let mut seen = HashSet::new();
    raw.iter()
        .enumerate()
        .map(|(index, rule)| {
            let definition = normalize_rule(index, rule, sensitivity)?;
            if !seen.insert(definition.id.clone()) {
                return Err(RuleValidationError::new(
                    definition.id,
                    "id",
                    "is used by more than one rule",
                ));
            }
            Ok(definition)
        })
        .collect()
}

fn normalize_rule(
    index: usize,
    raw: &RawRule,
    global: Sensitivity,
) -> Result<RuleDefinition, RuleValidationError> {
    let explicit_id = non_empty(raw.id.as_deref()).map(str::to_string);
    let label = explicit_id
        .clone()
        .unwrap_or_else(|| format!("#{}", index + 1));
    let invalid = |field: &str, reason: &str| RuleValidationError::new(label.clone(), field, reason);

    let kind_name = non_empty(raw.kind.as_deref()).ok_or_else(|| invalid("kind", "is missing"))?;
    let kind = RuleKind::parse(kind_name)
        .ok_or_else(|| invalid("kind", &format!("'{}' is not a known rule kind", kind_name)))?;

    let id = explicit_id.unwrap_or_else(|| format!("rule_{}_{}", index + 1, kind.as_str()));

    let sensitivity = match &raw.sensitivity_override {
        Some(value) => value
            .as_i64()
            .and_then(|v| Sensitivity::new(v).ok())
            .ok_or_else(|| invalid("sensitivity_override", "must be an integer between 0 and 100"))?,
        None => global,
    };
    let table = ToleranceTable::for_sensitivity(sensitivity);

    let severity = match non_empty(raw.severity.as_deref()) {
        None => Severity::Minor,
        Some(s) => match s.to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "minor" => Severity::Minor,
            _ => return Err(invalid("severity", "must be 'critical' or 'minor'")),
        },
    };

    let target = match kind {
        RuleKind::BarcodeDimension | RuleKind::BarcodePlacement => {
            non_empty(raw.target.as_deref()).unwrap_or("barcode").to_string()
        }
        RuleKind::TranslatedText => non_empty(raw.target.as_deref())
            .or_else(|| non_empty(raw.description.as_deref()))
            .unwrap_or("translated text")
            .to_string(),
        RuleKind::ElementPresence => non_empty(raw.target.as_deref())
            .or_else(|| non_empty(raw.expected_text.as_deref()))
            .ok_or_else(|| invalid("target", "or expected_text is required for element_presence rules"))?
            .to_string(),
        _ => non_empty(raw.target.as_deref())
            .ok_or_else(|| invalid("target", "is required for this rule kind"))?
            .to_string(),
    };

    let case_sensitive = flag(raw.case_sensitive.as_ref(), "case_sensitive", &invalid)?.unwrap_or(true);

    let absolute_tolerance_mm = match number(raw.tolerance_mm.as_ref(), "tolerance_mm", &invalid)? {
        None => None,
        Some(_) if !kind.takes_absolute_tolerance() => {
            return Err(invalid(
                "tolerance_mm",
                &format!("does not apply to {} rules", kind.as_str()),
            ))
        }
        Some(t) if !(t.is_finite() && t >= 0.0) => {
            return Err(invalid("tolerance_mm", "must be a non-negative number"))
        }
        Some(t) => Some(t),
    };

    let (expectation, tolerance) = match kind {
        RuleKind::ExactText => {
            let text = raw
                .expected_text
                .as_deref()
                .or_else(|| raw.expected_value.as_ref().and_then(Value::as_str))
                .and_then(|t| non_empty(Some(t)))
                .ok_or_else(|| invalid("expected_text", "is required for exact_text rules"))?;
            let mode = if flag(raw.allow_near_match.as_ref(), "allow_near_match", &invalid)?.unwrap_or(false) {
                MatchMode::Fuzzy
            } else {
                MatchMode::Exact
            };
            (
                Expectation::Text(TextExpectation {
                    text: text.to_string(),
                    case_sensitive,
                    mode,
                }),
                table.text_min_similarity,
            )
        }
        RuleKind::TranslatedText => (
            Expectation::Translations {
                variants: translation_variants(raw, &invalid)?,
                case_sensitive,
            },
            table.text_min_similarity,
        ),
        RuleKind::FontHeight => (
            Expectation::FontHeight(length_window(raw, &invalid)?),
            table.font_height_relative,
        ),
        RuleKind::Spacing => {
            let secondary = non_empty(raw.secondary_target.as_deref())
                .ok_or_else(|| invalid("secondary_target", "is required for spacing rules"))?;
            (
                Expectation::Spacing {
                    secondary_target: secondary.to_string(),
                    window: length_window(raw, &invalid)?,
                },
                table.spacing_relative,
            )
        }
        RuleKind::BarcodeDimension => {
            let width_mm = positive(raw.expected_width_mm.as_ref(), "expected_width_mm", &invalid)?;
            let height_mm = positive(raw.expected_height_mm.as_ref(), "expected_height_mm", &invalid)?;
            if width_mm.is_none() && height_mm.is_none() {
                return Err(invalid(
                    "expected_width_mm",
                    "or expected_height_mm is required for barcode_dimension rules",
                ));
            }
            (
                Expectation::BarcodeDimension {
                    width_mm,
                    height_mm,
                    decoded_value: non_empty(raw.barcode_value.as_deref()).map(str::to_string),
                },
                table.barcode_dimension_relative,
            )
        }
        RuleKind::BarcodePlacement => (
            Expectation::BarcodePlacement {
                window: placement_window(raw, &invalid)?,
                decoded_value: non_empty(raw.barcode_value.as_deref()).map(str::to_string),
            },
            table.placement_absolute,
        ),
        RuleKind::ElementPresence => (
            Expectation::Presence {
                expected_text: non_empty(raw.expected_text.as_deref()).map(str::to_string),
                present: flag(raw.is_present.as_ref(), "is_present", &invalid)?.unwrap_or(true),
            },
            table.text_min_similarity,
        ),
    };

    if absolute_tolerance_mm.is_some()
        && expectation
            .length_window()
            .is_some_and(|window| window.unit == LengthUnit::Pixels)
    {
        return Err(invalid("tolerance_mm", "cannot be combined with a length in pixels"));
    }

    Ok(RuleDefinition {
        id,
        kind,
        description: non_empty(raw.description.as_deref()).map(str::to_string),
        target,
        expectation,
        tolerance,
        absolute_tolerance_mm,
        severity,
        sensitivity,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn number<F>(value: Option<&Value>, field: &str, invalid: &F) -> Result<Option<f64>, RuleValidationError>
where
    F: Fn(&str, &str) -> RuleValidationError,
{
    match value {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| invalid(field, "is not a valid number")),
        Some(_) => Err(invalid(field, "must be a number")),
    }
}

fn flag<F>(value: Option<&Value>, field: &str, invalid: &F) -> Result<Option<bool>, RuleValidationError>
where
    F: Fn(&str, &str) -> RuleValidationError,
{
    match value {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(invalid(field, "must be true or false")),
    }
}

fn positive<F>(value: Option<&Value>, field: &str, invalid: &F) -> Result<Option<f64>, RuleValidationError>
where
    F: Fn(&str, &str) -> RuleValidationError,
{
    match number(value, field, invalid)? {
        Some(v) if !(v.is_finite() && v > 0.0) => Err(invalid(field, "must be a positive number")),
        other => Ok(other),
    }
}

fn translation_variants<F>(raw: &RawRule, invalid: &F) -> Result<Vec<LanguageVariant>, RuleValidationError>
where
    F: Fn(&str, &str) -> RuleValidationError,
{
    let entries: Vec<RawTranslation> = match (&raw.translations, &raw.language) {
        (Some(list), _) => list.clone(),
        (None, Some(language)) => vec![RawTranslation {
            language: Some(language.clone()),
            text: raw
                .expected_text
                .clone()
                .or_else(|| raw.expected_value.as_ref().and_then(Value::as_str).map(str::to_string)),
            required: Some(Value::Bool(true)),
        }],
        (None, None) => {
            return Err(invalid("translations", "is required for translated_text rules"));
        }
    };

    if entries.is_empty() {
        return Err(invalid("translations", "must list at least one language variant"));
    }

    let mut languages = HashSet::new();
    let mut variants = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let language = non_empty(entry.language.as_deref())
            .ok_or_else(|| invalid(&format!("translations[{}].language", i), "is missing"))?
            .to_ascii_lowercase();
        let text = non_empty(entry.text.as_deref())
            .ok_or_else(|| invalid(&format!("translations[{}].text", i), "is missing"))?;
        if !languages.insert(language.clone()) {
            return Err(invalid(
                &format!("translations[{}].language", i),
                &format!("'{}' is listed more than once", language),
            ));
        }
        let required = flag(entry.required.as_ref(), &format!("translations[{}].required", i), invalid)?;
        variants.push(LanguageVariant {
            language,
            text: text.to_string(),
            required: required.unwrap_or(true),
        });
    }

    if !variants.iter().any(|v| v.required) {
        return Err(invalid("translations", "must mark at least one variant as required"));
    }
    Ok(variants)
}

/// Unit family and the factor converting a value into it.
fn parse_unit(unit: &str) -> Option<(LengthUnit, f64)> {
    match unit.trim().to_ascii_lowercase().as_str() {
        "mm" => Some((LengthUnit::Millimeters, 1.0)),
        "cm" => Some((LengthUnit::Millimeters, 10.0)),
        "in" | "inch" | "inches" => Some((LengthUnit::Millimeters, 25.4)),
        "pt" => Some((LengthUnit::Millimeters, 25.4 / 72.0)),
        "px" | "pixel" | "pixels" => Some((LengthUnit::Pixels, 1.0)),
        _ => None,
    }
}

/// Parses a length such as `"3mm"`, `"8 pt"`, `"24px"` or a bare number with a separate
/// unit. Physical lengths come back in millimeters.
fn parse_length<F>(
    value: &Value,
    unit: Option<&str>,
    field: &str,
    invalid: &F,
) -> Result<(f64, LengthUnit), RuleValidationError>
where
    F: Fn(&str, &str) -> RuleValidationError,
{
    let (magnitude, inline_unit) = match value {
        Value::Number(n) => (n.as_f64(), None),
        Value::String(s) => match length_pattern().and_then(|re| re.captures(s)) {
            Some(caps) => (
                caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()),
                caps.get(2).map(|m| m.as_str().to_string()),
            ),
            None => return Err(invalid(field, &format!("'{}' is not a length", s))),
        },
        _ => return Err(invalid(field, "must be a number or a length string")),
    };
    let magnitude = magnitude.ok_or_else(|| invalid(field, "is not a valid number"))?;

    let unit = inline_unit
        .as_deref()
        .or(unit)
        .ok_or_else(|| invalid(field, "requires a length unit (mm, cm, in, pt or px)"))?;
    let (family, factor) = parse_unit(unit)
        .ok_or_else(|| invalid(field, &format!("unit '{}' is not a length unit", unit)))?;

    let length = magnitude * factor;
    if !(length.is_finite() && length >= 0.0) {
        return Err(invalid(field, "must be a non-negative length"));
    }
    Ok((length, family))
}

fn length_window<F>(raw: &RawRule, invalid: &F) -> Result<LengthWindow, RuleValidationError>
where
    F: Fn(&str, &str) -> RuleValidationError,
{
    let value = raw
        .expected_value
        .as_ref()
        .ok_or_else(|| invalid("expected_value", "is required for this rule kind"))?;
    let (lower, unit) = parse_length(value, raw.unit.as_deref(), "expected_value", invalid)?;

    let comparison = match non_empty(raw.operator.as_deref()).map(str::to_ascii_lowercase).as_deref() {
        None | Some("exactly") => Comparison::Exactly,
        Some("min") => Comparison::Min,
        Some("max") => Comparison::Max,
        Some("between") => Comparison::Between,
        Some(other) => {
            return Err(invalid(
                "operator",
                &format!("'{}' is not one of exactly, min, max, between", other),
            ))
        }
    };

    let (lower, upper) = match comparison {
        Comparison::Exactly => (Some(lower), Some(lower)),
        Comparison::Min => (Some(lower), None),
        Comparison::Max => (None, Some(lower)),
        Comparison::Between => {
            let upper = raw
                .expected_upper
                .as_ref()
                .ok_or_else(|| invalid("expected_upper", "is required when operator is 'between'"))?;
            let (upper, upper_unit) =
                parse_length(upper, raw.unit.as_deref().or(unit_of(value)), "expected_upper", invalid)?;
            if upper_unit != unit {
                return Err(invalid("expected_upper", "must use the same kind of unit as expected_value"));
            }
            if upper < lower {
                return Err(invalid("expected_upper", "must not be below expected_value"));
            }
            (Some(lower), Some(upper))
        }
    };
    Ok(LengthWindow {
        comparison,
        unit,
        lower,
        upper,
    })
}

/// Unit written inline in a length string, if any.
fn unit_of(value: &Value) -> Option<&str> {
    value
        .as_str()
        .and_then(|s| length_pattern().and_then(|re| re.captures(s)))
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
}

fn placement_window<F>(raw: &RawRule, invalid: &F) -> Result<PlacementWindow, RuleValidationError>
where
    F: Fn(&str, &str) -> RuleValidationError,
{
    let placement = raw
        .placement
        .as_ref()
        .ok_or_else(|| invalid("placement", "is required for barcode_placement rules"))?;
    let edge = match non_empty(placement.edge.as_deref()).map(str::to_ascii_lowercase).as_deref() {
        Some("left") => ReferenceEdge::Left,
        Some("right") => ReferenceEdge::Right,
        Some("top") => ReferenceEdge::Top,
        Some("bottom") => ReferenceEdge::Bottom,
        _ => return Err(invalid("placement.edge", "must be one of left, right, top, bottom")),
    };
    let min = number(placement.min.as_ref(), "placement.min", invalid)?
        .ok_or_else(|| invalid("placement.min", "is missing"))?;
    let max = number(placement.max.as_ref(), "placement.max", invalid)?
        .ok_or_else(|| invalid("placement.max", "is missing"))?;
    if !(0.0..=1.0).contains(&min) || !(0.0..=1.0).contains(&max) || min > max {
        return Err(invalid("placement", "requires 0 <= min <= max <= 1"));
    }
    Ok(PlacementWindow { edge, min, max })
}
