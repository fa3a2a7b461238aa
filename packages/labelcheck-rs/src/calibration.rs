//! Pixel-to-millimeter calibration for a single label image.
//!
//! A barcode whose physical size is declared by the caller is the preferred reference,
//! since it is printed at a known size on the label itself. Embedded DPI metadata is the
//! fallback. When neither is available the ratio is absent and every rule needing
//! physical units degrades to an `info` verdict.
use labelcheck_vision::{Dpi, FeatureKind, ImageInfo, VisualFeature};
use serde::{Deserialize, Serialize};
use tracing::debug;

const MM_PER_INCH: f64 = 25.4;

/// Millimeters per pixel along each image axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRatio {
    pub mm_per_px_x: f64,
    pub mm_per_px_y: f64,
}

impl CalibrationRatio {
    /// Returns `None` unless both ratios are finite and positive.
    pub fn new(mm_per_px_x: f64, mm_per_px_y: f64) -> Option<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        (valid(mm_per_px_x) && valid(mm_per_px_y)).then_some(Self {
            mm_per_px_x,
            mm_per_px_y,
        })
    }

    pub fn isotropic(mm_per_px: f64) -> Option<Self> {
        Self::new(mm_per_px, mm_per_px)
    }

    pub fn from_dpi(dpi: Dpi) -> Option<Self> {
        if dpi.x <= 0.0 || dpi.y <= 0.0 {
            return None;
        }
        Self::new(MM_PER_INCH / dpi.x, MM_PER_INCH / dpi.y)
    }

    /// Physical length of a pixel offset, combining both axes.
    pub fn distance_mm(&self, dx_px: f64, dy_px: f64) -> f64 {
        (dx_px * self.mm_per_px_x).hypot(dy_px * self.mm_per_px_y)
    }

    /// Size of one pixel, the smallest difference a measurement can resolve.
    pub fn noise_floor_mm(&self) -> f64 {
        self.mm_per_px_x.max(self.mm_per_px_y)
    }
}

/// A feature on the label whose printed size is known in advance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReference {
    /// Decoded payload identifying the barcode; the first barcode is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoded_value: Option<String>,
    pub width_mm: f64,
    /// Declared height; the horizontal ratio is reused vertically when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_mm: Option<f64>,
}

/// Derives the calibration ratio for an image, or `None` when no reference is usable.
pub fn resolve_calibration(
    features: &[VisualFeature],
    image: &ImageInfo,
    references: &[CalibrationReference],
) -> Option<CalibrationRatio> {
    for reference in references {
        let barcode = features.iter().find(|f| {
            f.kind == FeatureKind::Barcode
                && match &reference.decoded_value {
                    Some(value) => f.attributes.decoded_value.as_deref() == Some(value.as_str()),
                    None => true,
                }
        });
        let Some(barcode) = barcode else {
            continue;
        };

        let x = reference.width_mm / barcode.pixel_width();
        let y = reference
            .height_mm
            .map(|h| h / barcode.pixel_height())
            .unwrap_or(x);
        if let Some(ratio) = CalibrationRatio::new(x, y) {
            debug!(
                feature = %barcode.id,
                mm_per_px_x = ratio.mm_per_px_x,
                mm_per_px_y = ratio.mm_per_px_y,
                "calibrated from barcode reference"
            );
            return Some(ratio);
        }
    }

    let ratio = image.dpi.and_then(CalibrationRatio::from_dpi);
    if let Some(ratio) = ratio {
        debug!(mm_per_px_x = ratio.mm_per_px_x, "calibrated from image resolution metadata");
    }
    ratio
}
