use serde::{Deserialize, Serialize};

use crate::image::ImageInfo;

/// Axis-aligned box in pixel space, origin at the top-left corner of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.x) + f64::from(self.width) / 2.0,
            f64::from(self.y) + f64::from(self.height) / 2.0,
        )
    }

    /// Horizontal and vertical pixel gaps between the nearest edges of two boxes.
    /// An axis on which the boxes overlap contributes a gap of zero.
    pub fn edge_gap(&self, other: &BoundingBox) -> (u32, u32) {
        let dx = other
            .x
            .saturating_sub(self.right())
            .max(self.x.saturating_sub(other.right()));
        let dy = other
            .y
            .saturating_sub(self.bottom())
            .max(self.y.saturating_sub(other.bottom()));
        (dx, dy)
    }

    pub fn intersection_area(&self, other: &BoundingBox) -> u64 {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return 0;
        }
        u64::from(right - left) * u64::from(bottom - top)
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BoundingBox::new(left, top, right - left, bottom - top)
    }

    /// Clips the box so it lies within the image bounds.
    pub fn clamp_to(&self, image: &ImageInfo) -> BoundingBox {
        let x = self.x.min(image.width);
        let y = self.y.min(image.height);
        let width = self.width.min(image.width - x);
        let height = self.height.min(image.height - y);
        BoundingBox::new(x, y, width, height)
    }

    pub fn is_within(&self, image: &ImageInfo) -> bool {
        self.right() <= image.width && self.bottom() <= image.height
    }
}

/// A line or block of text recognized by the OCR collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRegion {
    pub id: String,
    pub text: String,
    pub bounding_box: BoundingBox,
    /// Recognition confidence in `[0, 1]`.
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    /// BCP-47 style language tag (`en`, `fr`, ...) when the OCR engine reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

fn default_confidence() -> f32 {
    1.0
}

impl TextRegion {
    pub fn new(id: impl Into<String>, text: impl Into<String>, bounding_box: BoundingBox) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            bounding_box,
            confidence: 1.0,
            language: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}
