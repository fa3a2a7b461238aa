use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Resolution metadata embedded in the label image, in dots per inch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dpi {
    pub x: f64,
    pub y: f64,
}

impl Dpi {
    pub fn uniform(dpi: f64) -> Self {
        Self { x: dpi, y: dpi }
    }
}

/// Dimensions and metadata of the label image a scene was extracted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<Dpi>,
}

impl ImageInfo {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            filename: None,
            dpi: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_dpi(mut self, dpi: Dpi) -> Self {
        self.dpi = Some(dpi);
        self
    }
}

/// Image handed to the OCR and feature-detection collaborators.
#[derive(Debug, Clone)]
pub enum LabelImage {
    FilePath(PathBuf),
    Bytes(Vec<u8>),
}
