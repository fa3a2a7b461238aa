use serde::{Deserialize, Serialize};

use crate::region::BoundingBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Barcode,
    LineSegment,
    GlyphRow,
}

/// Measurements reported by the computer-vision collaborator for a feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureAttributes {
    /// Payload decoded from a barcode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoded_value: Option<String>,
    /// Barcode symbology name (`EAN13`, `CODE128`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbology: Option<String>,
    /// Raw measured width in pixels, when finer than the bounding box.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_width: Option<f64>,
    /// Raw measured height in pixels; for a glyph row this is the text height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_height: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualFeature {
    pub id: String,
    pub kind: FeatureKind,
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub attributes: FeatureAttributes,
}

impl VisualFeature {
    pub fn new(id: impl Into<String>, kind: FeatureKind, bounding_box: BoundingBox) -> Self {
        Self {
            id: id.into(),
            kind,
            bounding_box,
            attributes: FeatureAttributes::default(),
        }
    }

    pub fn barcode(id: impl Into<String>, bounding_box: BoundingBox, decoded_value: impl Into<String>) -> Self {
        let mut feature = Self::new(id, FeatureKind::Barcode, bounding_box);
        feature.attributes.decoded_value = Some(decoded_value.into());
        feature
    }

    pub fn with_attributes(mut self, attributes: FeatureAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Measured pixel width, falling back to the bounding box.
    pub fn pixel_width(&self) -> f64 {
        self.attributes
            .pixel_width
            .filter(|w| w.is_finite() && *w > 0.0)
            .unwrap_or_else(|| f64::from(self.bounding_box.width))
    }

    /// Measured pixel height, falling back to the bounding box.
    pub fn pixel_height(&self) -> f64 {
        self.attributes
            .pixel_height
            .filter(|h| h.is_finite() && *h > 0.0)
            .unwrap_or_else(|| f64::from(self.bounding_box.height))
    }
}
