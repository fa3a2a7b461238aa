use async_trait::async_trait;
use thiserror::Error;

use crate::feature::VisualFeature;
use crate::image::LabelImage;
use crate::region::TextRegion;

#[derive(Debug, Clone)]
pub struct OcrOutput {
    pub text: String,
    pub regions: Vec<TextRegion>,
}

impl OcrOutput {
    pub fn from_regions(regions: Vec<TextRegion>) -> Self {
        let text = regions
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Self { text, regions }
    }
}

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("unsupported operation")]
    Unsupported,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("engine error: {0}")]
    EngineError(String),
}

/// Text detection collaborator. Implementations are expected to be slow and blocking
/// internally; callers only see the async surface.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, input: &LabelImage) -> Result<OcrOutput, VisionError>;
}

/// Computer-vision collaborator producing barcodes, line segments and glyph rows.
#[async_trait]
pub trait FeatureDetector: Send + Sync {
    async fn detect(&self, input: &LabelImage) -> Result<Vec<VisualFeature>, VisionError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::BoundingBox;

    struct FixedOcr(Vec<TextRegion>);

    #[async_trait]
    impl OcrEngine for FixedOcr {
        async fn recognize(&self, input: &LabelImage) -> Result<OcrOutput, VisionError> {
            match input {
                LabelImage::Bytes(data) if data.is_empty() => {
                    Err(VisionError::InvalidInput("empty image".to_string()))
                }
                _ => Ok(OcrOutput::from_regions(self.0.clone())),
            }
        }
    }

    #[tokio::test]
    async fn test_output_joins_region_text() {
        let engine = FixedOcr(vec![
            TextRegion::new("r1", "Net weight", BoundingBox::new(0, 0, 10, 10)),
            TextRegion::new("r2", "250g", BoundingBox::new(0, 20, 10, 10)),
        ]);
        let output = engine.recognize(&LabelImage::Bytes(vec![1])).await.unwrap();
        assert_eq!(output.text, "Net weight\n250g");
        assert_eq!(output.regions.len(), 2);
    }

    #[tokio::test]
    async fn test_error_surfaces_through_trait() {
        let engine = FixedOcr(Vec::new());
        let err = engine.recognize(&LabelImage::Bytes(Vec::new())).await.unwrap_err();
        assert!(matches!(err, VisionError::InvalidInput(_)));
    }
}
