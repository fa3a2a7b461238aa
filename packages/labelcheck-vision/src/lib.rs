pub mod engine;
pub mod feature;
pub mod image;
pub mod region;

pub use engine::{FeatureDetector, OcrEngine, OcrOutput, VisionError};
pub use feature::{FeatureAttributes, FeatureKind, VisualFeature};
pub use image::{Dpi, ImageInfo, LabelImage};
pub use region::{BoundingBox, TextRegion};
