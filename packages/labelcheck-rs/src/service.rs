//! Async analysis pipeline: collaborators, calibration, then per-rule evaluation.
//!
//! OCR and feature detection run concurrently. Each rule is then evaluated on the
//! blocking pool, gated by a semaphore and bounded by the configured rule timeout.
//! A [`CancelSignal`] aborts the whole request; no partial report is produced.
use labelcheck_vision::{FeatureDetector, ImageInfo, LabelImage, OcrEngine};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::calibration::{resolve_calibration, CalibrationRatio, CalibrationReference};
use crate::config::VerifierOptions;
use crate::engine::evaluate_rule;
use crate::error::{EngineError, Result};
use crate::report::{aggregate, AnalysisReport, HighlightedElement};
use crate::rules::{normalize_rules, RawRule};
use crate::scene::LabelScene;
use crate::sensitivity::Sensitivity;

/// Owner side of a cancellation channel.
#[derive(Debug)]
pub struct Cancellation {
    sender: watch::Sender<bool>,
}

impl Cancellation {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a cancellation channel. Dropping the [`Cancellation`] without
/// cancelling leaves the signal pending forever.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, receiver) = watch::channel(false);
        Self { receiver }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.receiver.borrow_and_update() {
                return;
            }
            if self.receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// One label to analyze.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image: LabelImage,
    pub image_info: ImageInfo,
    pub rules: Vec<RawRule>,
    /// Known-size features used to derive the calibration ratio.
    pub calibration_references: Vec<CalibrationReference>,
    /// Caller-supplied ratio; skips calibration resolution when set.
    pub calibration: Option<CalibrationRatio>,
    /// Falls back to the analyzer's default sensitivity when absent.
    pub sensitivity: Option<Sensitivity>,
}

impl AnalysisRequest {
    pub fn new(image: LabelImage, image_info: ImageInfo, rules: Vec<RawRule>) -> Self {
        Self {
            image,
            image_info,
            rules,
            calibration_references: Vec::new(),
            calibration: None,
            sensitivity: None,
        }
    }

    pub fn with_calibration_references(mut self, references: Vec<CalibrationReference>) -> Self {
        self.calibration_references = references;
        self
    }

    pub fn with_calibration(mut self, calibration: CalibrationRatio) -> Self {
        self.calibration = Some(calibration);
        self
    }

    pub fn with_sensitivity(mut self, sensitivity: Sensitivity) -> Self {
        self.sensitivity = Some(sensitivity);
        self
    }
}

/// Waits for a rule's blocking evaluation, turning an overrun into an `info` verdict.
/// The blocking work keeps its worker permit until it actually returns.
async fn within_timeout(
    rule_id: String,
    timeout: Duration,
    work: JoinHandle<HighlightedElement>,
) -> Result<HighlightedElement> {
    match tokio::time::timeout(timeout, work).await {
        Ok(joined) => Ok(joined?),
        Err(_) => {
            warn!(rule_id = %rule_id, timeout_ms = timeout.as_millis() as u64, "rule evaluation timed out");
            Ok(HighlightedElement::info(
                rule_id,
                format!("Rule evaluation timed out after {} ms.", timeout.as_millis()),
            ))
        }
    }
}

/// Aborts every task it still holds when dropped.
struct TaskSet<T>(Vec<JoinHandle<T>>);

impl<T> Drop for TaskSet<T> {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

pub struct LabelAnalyzer {
    ocr: Arc<dyn OcrEngine>,
    detector: Arc<dyn FeatureDetector>,
    options: VerifierOptions,
}

impl LabelAnalyzer {
    pub fn new(
        ocr: Arc<dyn OcrEngine>,
        detector: Arc<dyn FeatureDetector>,
        options: VerifierOptions,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            ocr,
            detector,
            options,
        })
    }

    pub fn options(&self) -> &VerifierOptions {
        &self.options
    }

    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisReport> {
        self.analyze_with_cancel(request, CancelSignal::never()).await
    }

    pub async fn analyze_with_cancel(
        &self,
        request: AnalysisRequest,
        mut cancel: CancelSignal,
    ) -> Result<AnalysisReport> {
        let analysis_id = Uuid::new_v4();
        let sensitivity = request.sensitivity.unwrap_or(self.options.default_sensitivity);
        let rules = normalize_rules(&request.rules, sensitivity)?;
        info!(%analysis_id, rules = rules.len(), %sensitivity, "starting analysis");

        let image = &request.image;
        let collaborators = async { tokio::try_join!(self.ocr.recognize(image), self.detector.detect(image)) };
        let (ocr, features) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            result = collaborators => result?,
        };
        debug!(
            %analysis_id,
            regions = ocr.regions.len(),
            features = features.len(),
            "collaborators finished"
        );

        let scene = LabelScene::new(request.image_info)
            .with_text_regions(ocr.regions)
            .with_visual_features(features);
        let calibration = request.calibration.or_else(|| {
            resolve_calibration(&scene.visual_features, &scene.image, &request.calibration_references)
        });
        if calibration.is_none() && rules.iter().any(|r| r.needs_calibration()) {
            warn!(%analysis_id, "no calibration reference found; physical measurements will be unresolved");
        }

        let scene = Arc::new(scene);
        let options = Arc::new(self.options.clone());
        let semaphore = Arc::new(Semaphore::new(self.options.max_workers));
        let timeout = self.options.rule_timeout();

        let mut tasks = TaskSet(Vec::with_capacity(rules.len()));
        for rule in rules.iter().cloned() {
            let scene = Arc::clone(&scene);
            let options = Arc::clone(&options);
            let semaphore = Arc::clone(&semaphore);

            tasks.0.push(tokio::spawn(async move {
                let permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| EngineError::Cancelled)?;
                let rule_id = rule.id.clone();
                let work = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    evaluate_rule(&rule, &scene, calibration.as_ref(), &options)
                });
                within_timeout(rule_id, timeout, work).await
            }));
        }

        let mut highlights = Vec::with_capacity(rules.len());
        for handle in tasks.0.iter_mut() {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(%analysis_id, "analysis cancelled");
                    return Err(EngineError::Cancelled);
                }
                joined = handle => joined,
            };
            highlights.push(joined??);
        }

        Ok(aggregate(analysis_id, &rules, highlights, &scene.image))
    }
}
