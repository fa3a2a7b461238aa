use labelcheck_vision::{ImageInfo, TextRegion, VisualFeature};
use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationReference;

/// Read-only snapshot of everything the collaborators extracted from one label image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScene {
    pub image: ImageInfo,
    #[serde(default)]
    pub text_regions: Vec<TextRegion>,
    #[serde(default)]
    pub visual_features: Vec<VisualFeature>,
}

impl LabelScene {
    pub fn new(image: ImageInfo) -> Self {
        Self {
            image,
            text_regions: Vec::new(),
            visual_features: Vec::new(),
        }
    }

    pub fn with_text_regions(mut self, regions: Vec<TextRegion>) -> Self {
        self.text_regions = regions;
        self
    }

    pub fn with_visual_features(mut self, features: Vec<VisualFeature>) -> Self {
        self.visual_features = features;
        self
    }
}

/// On-disk form of a scene: the scene itself plus any known-size references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(flatten)]
    pub scene: LabelScene,
    #[serde(default)]
    pub calibration_references: Vec<CalibrationReference>,
}
