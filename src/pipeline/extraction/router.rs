//! Label-driven dispatch to extraction strategies.
//!
//! Strategies are checked in registration order and the first one whose
//! `handles` accepts the label runs. Adding a method means registering a
//! new strategy.

use super::confidence::{assess_quality, filter, join_fragments, mean_confidence};
use super::ocr::SharedOcrEngine;
use super::sanitize::sanitize_extracted_text;
use super::types::{ExtractionRequest, ExtractionResult, ExtractionStrategy, RecognitionFragment};
use super::vision_ocr::RemoteVisionInterpretation;
use super::ExtractionError;
use crate::models::{ExtractionMethod, ScriptLabel};
use crate::pipeline::remote::SharedVisionClient;

/// Local OCR followed by confidence filtering. Modern scripts only.
pub struct LocalRecognition {
    engine: SharedOcrEngine,
}

impl LocalRecognition {
    pub fn new(engine: SharedOcrEngine) -> Self {
        Self { engine }
    }
}

impl ExtractionStrategy for LocalRecognition {
    fn name(&self) -> &'static str {
        "local_recognition"
    }

    fn handles(&self, label: &ScriptLabel) -> bool {
        matches!(label, ScriptLabel::Modern)
    }

    fn extract(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<ExtractionResult, ExtractionError> {
        let owned;
        let fragments: &[RecognitionFragment] = match request.recognized {
            Some(fragments) => fragments,
            None => {
                owned = self.engine.recognize(request.prepared_png)?;
                &owned
            }
        };

        let cleaned: Vec<RecognitionFragment> = fragments
            .iter()
            .map(|f| RecognitionFragment {
                text: sanitize_extracted_text(&f.text),
                ..f.clone()
            })
            .filter(|f| !f.text.is_empty())
            .collect();

        let kept = filter(&cleaned, request.threshold);
        let dropped = cleaned.len() - kept.len();

        tracing::debug!(
            file = request.image.name(),
            languages = self.engine.languages(),
            total = cleaned.len(),
            kept = kept.len(),
            mean_confidence = mean_confidence(&cleaned),
            threshold = request.threshold.fraction(),
            "Local recognition filtered"
        );

        Ok(ExtractionResult {
            raw_text: join_fragments(&kept),
            source_label: request.label,
            method: ExtractionMethod::LocalOcr,
            fragments_kept: kept.len(),
            fragments_dropped: dropped,
            quality: assess_quality(&cleaned),
        })
    }
}

/// Ordered registry of extraction strategies.
#[derive(Default)]
pub struct ExtractionRouter {
    strategies: Vec<Box<dyn ExtractionStrategy + Send + Sync>>,
}

impl ExtractionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local OCR for modern text, remote vision for everything else.
    pub fn standard(engine: SharedOcrEngine, vision: Option<SharedVisionClient>) -> Self {
        let remote = match vision {
            Some(client) => RemoteVisionInterpretation::new(client),
            None => RemoteVisionInterpretation::unconfigured(),
        };
        Self::new()
            .register(LocalRecognition::new(engine))
            .register(remote)
    }

    pub fn register(mut self, strategy: impl ExtractionStrategy + Send + Sync + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn route(&self, label: &ScriptLabel) -> Option<&(dyn ExtractionStrategy + Send + Sync)> {
        self.strategies
            .iter()
            .find(|s| s.handles(label))
            .map(|s| s.as_ref())
    }

    pub fn extract(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<ExtractionResult, ExtractionError> {
        let strategy = self
            .route(&request.label)
            .ok_or_else(|| ExtractionError::NoStrategy(request.label.to_string()))?;
        tracing::debug!(strategy = strategy.name(), label = %request.label, "Routing extraction");
        strategy.extract(request)
    }
}
