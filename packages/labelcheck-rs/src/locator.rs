//! Maps a rule's free-text target description onto regions and features of the label.
//!
//! Scoring is lexical and positional only, so every ranking can be explained from the
//! inputs: keyword overlap between the description and the recognized text, character
//! similarity to the expected text when the rule has one, and a small bonus for
//! positional hints such as "top left" or "near barcode".
use labelcheck_vision::{BoundingBox, FeatureKind, TextRegion, VisualFeature};
use std::cmp::Ordering;

use crate::scene::LabelScene;
use crate::text_match::{normalize_text, similarity_ratio};

/// Weight of keyword overlap when the rule also names the exact text to find, so that
/// a region carrying the expected text outranks a region that merely names the target.
const KEYWORD_WEIGHT_WITH_EXPECTED: f64 = 0.7;
/// Largest bonus positional hints can add to a lexical match.
const POSITION_BONUS: f64 = 0.15;
const LANGUAGE_BONUS: f64 = 0.05;
/// Base score for a barcode when the rule does not name a decoded value.
const UNNAMED_BARCODE_SCORE: f64 = 0.75;
/// Minimum token similarity for a keyword to count as present despite OCR noise.
const TOKEN_MATCH_SIMILARITY: f64 = 0.8;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "of", "on", "in", "at", "for", "to", "and", "or", "with", "by", "is",
    "label", "text", "area", "section", "corner", "side", "region", "element", "near", "next",
    "beside", "adjacent",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PositionHint {
    Top,
    Bottom,
    Left,
    Right,
    Center,
    NearBarcode,
}

/// A description split into content keywords and positional hints.
#[derive(Debug, Clone, Default, PartialEq)]
struct TargetDescription {
    keywords: Vec<String>,
    hints: Vec<PositionHint>,
}

impl TargetDescription {
    fn parse(description: &str) -> Self {
        let tokens = tokenize(description);
        let near = tokens
            .iter()
            .any(|t| matches!(t.as_str(), "near" | "next" | "beside" | "adjacent" | "by"));
        let mentions_barcode = tokens.iter().any(|t| t == "barcode");

        let mut parsed = TargetDescription::default();
        if near && mentions_barcode {
            parsed.hints.push(PositionHint::NearBarcode);
        }
        for token in tokens {
            let hint = match token.as_str() {
                "top" | "upper" => Some(PositionHint::Top),
                "bottom" | "lower" => Some(PositionHint::Bottom),
                "left" => Some(PositionHint::Left),
                "right" => Some(PositionHint::Right),
                "center" | "centre" | "middle" => Some(PositionHint::Center),
                _ => None,
            };
            match hint {
                Some(h) => {
                    if !parsed.hints.contains(&h) {
                        parsed.hints.push(h);
                    }
                }
                None if near && mentions_barcode && token == "barcode" => {}
                None if STOP_WORDS.contains(&token.as_str()) => {}
                None => parsed.keywords.push(token),
            }
        }
        parsed
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Fraction of `keywords` present in `text`, tolerating small OCR misreads.
fn keyword_overlap(keywords: &[String], text: &str) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let tokens = tokenize(text);
    let matched = keywords
        .iter()
        .filter(|keyword| {
            tokens.iter().any(|token| {
                token == *keyword
                    || (keyword.chars().count() >= 4
                        && similarity_ratio(token, keyword) >= TOKEN_MATCH_SIMILARITY)
            })
        })
        .count();
    matched as f64 / keywords.len() as f64
}

/// What to look for on the label.
#[derive(Debug, Clone, Copy)]
pub struct LocateQuery<'q> {
    description: &'q str,
    expected_text: Option<&'q str>,
    language: Option<&'q str>,
    use_keywords: bool,
}

impl<'q> LocateQuery<'q> {
    pub fn described(description: &'q str) -> Self {
        Self {
            description,
            expected_text: None,
            language: None,
            use_keywords: true,
        }
    }

    pub fn expecting(mut self, text: &'q str) -> Self {
        self.expected_text = Some(text);
        self
    }

    /// Restricts the query to one language. All variants of a translated rule share
    /// the same description, so only the expected text and positional hints are scored.
    pub fn in_language(mut self, language: &'q str) -> Self {
        self.language = Some(language);
        self.use_keywords = false;
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Candidate<'s, T> {
    pub item: &'s T,
    pub score: f64,
}

/// Ranked candidates above the location floor, best first. Empty means "not found".
///
/// Candidates within the ambiguity margin of the best score are tied; the tie-break
/// orders them, so `best` is the first of the tie.
#[derive(Clone)]
pub struct Located<'s, T> {
    pub candidates: Vec<Candidate<'s, T>>,
    ambiguity_margin: f64,
    tie_break: fn(&T, &T) -> Ordering,
}

impl<'s, T> Located<'s, T> {
    fn ranked(candidates: Vec<Candidate<'s, T>>, ambiguity_margin: f64, tie_break: fn(&T, &T) -> Ordering) -> Self {
        let mut located = Self {
            candidates,
            ambiguity_margin,
            tie_break,
        };
        located.rank();
        located
    }

    fn rank(&mut self) {
        let tie_break = self.tie_break;
        self.candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| tie_break(a.item, b.item))
        });
        let tied = self.tied_count();
        self.candidates[..tied].sort_by(|a, b| tie_break(a.item, b.item));
    }

    pub fn best(&self) -> Option<&'s T> {
        self.candidates.first().map(|c| c.item)
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Keeps the candidates `keep` accepts and re-ranks the rest.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.candidates.retain(|c| keep(c.item));
        self.rank();
    }

    /// Number of candidates within the ambiguity margin of the best score.
    pub fn tied_count(&self) -> usize {
        let best = self
            .candidates
            .iter()
            .map(|c| c.score)
            .fold(f64::NEG_INFINITY, f64::max);
        self.candidates
            .iter()
            .filter(|c| best - c.score <= self.ambiguity_margin)
            .count()
    }

    pub fn is_ambiguous(&self) -> bool {
        self.tied_count() > 1
    }
}

/// Higher OCR confidence first, then the smaller, more specific box.
fn text_tie_break(a: &TextRegion, b: &TextRegion) -> Ordering {
    b.confidence
        .partial_cmp(&a.confidence)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.bounding_box.area().cmp(&b.bounding_box.area()))
}

fn barcode_tie_break(a: &VisualFeature, b: &VisualFeature) -> Ordering {
    a.bounding_box.area().cmp(&b.bounding_box.area())
}

pub struct ElementLocator<'s> {
    scene: &'s LabelScene,
    floor: f64,
    ambiguity_margin: f64,
}

impl<'s> ElementLocator<'s> {
    pub fn new(scene: &'s LabelScene, floor: f64, ambiguity_margin: f64) -> Self {
        Self {
            scene,
            floor,
            ambiguity_margin,
        }
    }

    pub fn scene(&self) -> &'s LabelScene {
        self.scene
    }

    pub fn locate_text(&self, query: &LocateQuery<'_>) -> Located<'s, TextRegion> {
        let description = TargetDescription::parse(query.description);
        let expected = query.expected_text.map(|t| normalize_text(t, false));

        let candidates: Vec<Candidate<'s, TextRegion>> = self
            .scene
            .text_regions
            .iter()
            .filter_map(|region| {
                let mut language_bonus = 0.0;
                if let (Some(wanted), Some(tag)) = (query.language, region.language.as_deref()) {
                    if !same_language(wanted, tag) {
                        return None;
                    }
                    language_bonus = LANGUAGE_BONUS;
                }

                let keyword = if query.use_keywords {
                    keyword_overlap(&description.keywords, &region.text)
                } else {
                    0.0
                };
                // A description made only of positional hints is located by position.
                if expected.is_none() && description.keywords.is_empty() && !description.hints.is_empty() {
                    let score = self.position_fit(&description.hints, &region.bounding_box) + language_bonus;
                    return Some(Candidate { item: region, score });
                }

                let base = match &expected {
                    Some(expected) => {
                        let similarity = similarity_ratio(expected, &normalize_text(&region.text, false));
                        (KEYWORD_WEIGHT_WITH_EXPECTED * keyword).max(similarity)
                    }
                    None => keyword,
                };
                if base <= 0.0 {
                    return None;
                }

                let score = base
                    + POSITION_BONUS * self.position_fit(&description.hints, &region.bounding_box)
                    + language_bonus;
                Some(Candidate { item: region, score })
            })
            .collect();

        self.finish(candidates, text_tie_break)
    }

    /// Barcode features matching the description. When `decoded_value` is given, only
    /// barcodes decoding to that value are candidates.
    pub fn locate_barcode(&self, description: &str, decoded_value: Option<&str>) -> Located<'s, VisualFeature> {
        let description = TargetDescription::parse(description);

        let candidates: Vec<Candidate<'s, VisualFeature>> = self
            .scene
            .visual_features
            .iter()
            .filter(|f| f.kind == FeatureKind::Barcode)
            .filter_map(|feature| {
                let base = match decoded_value {
                    Some(value) if feature.attributes.decoded_value.as_deref() == Some(value) => 1.0,
                    Some(_) => return None,
                    None => UNNAMED_BARCODE_SCORE,
                };
                let score = base + POSITION_BONUS * self.position_fit(&description.hints, &feature.bounding_box);
                Some(Candidate { item: feature, score })
            })
            .collect();

        self.finish(candidates, barcode_tie_break)
    }

    fn finish<T>(&self, mut candidates: Vec<Candidate<'s, T>>, tie_break: fn(&T, &T) -> Ordering) -> Located<'s, T> {
        candidates.retain(|c| c.score >= self.floor);
        Located::ranked(candidates, self.ambiguity_margin, tie_break)
    }

    /// How well a box satisfies the hints, in `[0, 1]`; 0 without hints.
    fn position_fit(&self, hints: &[PositionHint], bounding_box: &BoundingBox) -> f64 {
        let image = &self.scene.image;
        if hints.is_empty() || image.width == 0 || image.height == 0 {
            return 0.0;
        }
        let (cx, cy) = bounding_box.center();
        let fx = (cx / f64::from(image.width)).clamp(0.0, 1.0);
        let fy = (cy / f64::from(image.height)).clamp(0.0, 1.0);

        let fit: f64 = hints
            .iter()
            .map(|hint| match hint {
                PositionHint::Top => 1.0 - fy,
                PositionHint::Bottom => fy,
                PositionHint::Left => 1.0 - fx,
                PositionHint::Right => fx,
                PositionHint::Center => 1.0 - 2.0 * (fx - 0.5).abs().max((fy - 0.5).abs()),
                PositionHint::NearBarcode => self.barcode_proximity(cx, cy),
            })
            .sum();
        fit / hints.len() as f64
    }

    fn barcode_proximity(&self, cx: f64, cy: f64) -> f64 {
        let image = &self.scene.image;
        let diagonal = f64::from(image.width).hypot(f64::from(image.height));
        self.scene
            .visual_features
            .iter()
            .filter(|f| f.kind == FeatureKind::Barcode)
            .map(|f| {
                let (bx, by) = f.bounding_box.center();
                1.0 - ((cx - bx).hypot(cy - by) / diagonal).min(1.0)
            })
            .fold(0.0, f64::max)
    }
}

/// Compares language tags on their primary subtag, so `en` matches `en-GB`.
fn same_language(a: &str, b: &str) -> bool {
    let primary = |tag: &str| {
        tag.split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase()
    };
    primary(a) == primary(b)
}
