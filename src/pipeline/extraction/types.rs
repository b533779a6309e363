use serde::{Deserialize, Serialize};

use super::confidence::{ConfidenceThreshold, QualityFlag};
use super::ExtractionError;
use crate::models::{ExtractionMethod, ImageUnit, ScriptLabel};

/// One OCR-detected text span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionFragment {
    pub text: String,
    /// Engine confidence, 0-100.
    pub confidence: f32,
    pub position: Option<BoundingBox>,
}

impl RecognitionFragment {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            confidence,
            position: None,
        }
    }
}

/// Bounding box for a text region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Text extracted from one image by whichever strategy ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub raw_text: String,
    pub source_label: ScriptLabel,
    pub method: ExtractionMethod,
    pub fragments_kept: usize,
    pub fragments_dropped: usize,
    /// Quality concerns raised by local recognition.
    pub quality: Vec<QualityFlag>,
}

impl ExtractionResult {
    /// Placeholder used when a recoverable failure left no text.
    pub fn empty(source_label: ScriptLabel, method: ExtractionMethod) -> Self {
        Self {
            raw_text: String::new(),
            source_label,
            method,
            fragments_kept: 0,
            fragments_dropped: 0,
            quality: Vec::new(),
        }
    }
}

/// Everything a strategy needs to extract text from one image.
pub struct ExtractionRequest<'a> {
    pub image: &'a ImageUnit,
    /// Normalized PNG bytes for the local engine.
    pub prepared_png: &'a [u8],
    pub label: ScriptLabel,
    /// Fragments already produced by the auto-detect pass, if any.
    pub recognized: Option<&'a [RecognitionFragment]>,
    pub threshold: ConfidenceThreshold,
    /// Instruction sent to the remote vision model.
    pub instruction: &'a str,
}

/// Local recognition engine abstraction (allows mocking for tests).
/// The language set is fixed when the engine is built.
pub trait OcrEngine {
    fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<RecognitionFragment>, ExtractionError>;

    fn languages(&self) -> &str;
}

/// One way of turning an image into text.
pub trait ExtractionStrategy {
    fn name(&self) -> &'static str;

    /// Whether this strategy should run for the given label.
    fn handles(&self, label: &ScriptLabel) -> bool;

    fn extract(&self, request: &ExtractionRequest<'_>) -> Result<ExtractionResult, ExtractionError>;
}
