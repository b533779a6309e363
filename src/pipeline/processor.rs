//! Batch processing orchestrator.
//!
//! Drives each image through classify → extract → translate → annotate →
//! record, strictly in submission order. Fatal errors stop only the image
//! they occur in. Remote and persistence failures become warnings on an
//! otherwise complete outcome.
//!
//! Engines and clients are injected so the orchestrator is fully testable
//! with mock implementations.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::config::{ConfigError, API_KEY_VAR};
use crate::db::DatabaseError;
use crate::lexicon::LexiconStore;
use crate::models::{
    ExtractionMethod, ImageUnit, InputError, ResultRecord, ScriptLabel, TargetLanguage,
};
use crate::pipeline::extraction::{
    classify, detect_language, join_fragments, prepare_image, script_profile, ClassifierInput,
    ConfidenceThreshold, ExtractionError, ExtractionRequest, ExtractionResult, ExtractionRouter,
    QualityFlag, SharedOcrEngine, DEFAULT_VISION_PROMPT,
};
use crate::pipeline::recorder::{self, annotate, build_record, RecordDraft, ResultStore};
use crate::pipeline::remote::{RemoteServiceError, SharedCompletionClient, SharedVisionClient};
use crate::pipeline::translation::translate;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    #[error("Recognition engine error: {0}")]
    RecognitionEngine(ExtractionError),

    #[error("Remote service error: {0}")]
    RemoteService(#[from] RemoteServiceError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),
}

impl PipelineError {
    /// Fatal errors abort the run they occur in (the batch or one image).
    /// Remote and persistence errors are downgraded to warnings.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::RemoteService(_) | Self::Persistence(_))
    }
}

impl From<ExtractionError> for PipelineError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Remote(e) => Self::RemoteService(e),
            other => Self::RecognitionEngine(other),
        }
    }
}

/// Which remote call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStage {
    Vision,
    Translation,
}

impl fmt::Display for RemoteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vision => f.write_str("vision"),
            Self::Translation => f.write_str("translation"),
        }
    }
}

/// A recoverable problem attached to an image outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageWarning {
    RemoteService { stage: RemoteStage, message: String },
    Persistence { message: String },
    LowQuality { flag: QualityFlag },
}

impl fmt::Display for StageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoteService { stage, message } => write!(f, "{stage} failed: {message}"),
            Self::Persistence { message } => write!(f, "result not saved: {message}"),
            Self::LowQuality { flag } => f.write_str(flag.describe()),
        }
    }
}

// ---------------------------------------------------------------------------
// Options and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Classify from a quick local OCR pass instead of using `manual_label`.
    pub auto_detect: bool,
    pub manual_label: ScriptLabel,
    pub threshold: ConfidenceThreshold,
    pub translate: bool,
    pub target_language: TargetLanguage,
    pub vision_prompt: String,
    /// Replaces the extracted text. Honored for single-image batches only.
    pub manual_correction: Option<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            auto_detect: true,
            manual_label: ScriptLabel::Modern,
            threshold: ConfidenceThreshold::default(),
            translate: false,
            target_language: TargetLanguage::default(),
            vision_prompt: DEFAULT_VISION_PROMPT.to_string(),
            manual_correction: None,
        }
    }
}

impl PipelineOptions {
    /// Whether some image is certain to need the vision service.
    fn requires_vision(&self) -> bool {
        !self.auto_detect && self.manual_label != ScriptLabel::Modern
    }
}

#[derive(Debug)]
pub enum ImageOutcome {
    Recorded {
        record: ResultRecord,
        row_id: i64,
        warnings: Vec<StageWarning>,
    },
    /// Processed, but the write to the results store failed.
    Unsaved {
        record: ResultRecord,
        warnings: Vec<StageWarning>,
        error: DatabaseError,
    },
    Failed {
        filename: String,
        error: PipelineError,
    },
}

impl ImageOutcome {
    pub fn filename(&self) -> &str {
        match self {
            Self::Recorded { record, .. } | Self::Unsaved { record, .. } => &record.filename,
            Self::Failed { filename, .. } => filename,
        }
    }

    pub fn record(&self) -> Option<&ResultRecord> {
        match self {
            Self::Recorded { record, .. } | Self::Unsaved { record, .. } => Some(record),
            Self::Failed { .. } => None,
        }
    }

    pub fn warnings(&self) -> &[StageWarning] {
        match self {
            Self::Recorded { warnings, .. } | Self::Unsaved { warnings, .. } => warnings,
            Self::Failed { .. } => &[],
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub outcomes: Vec<ImageOutcome>,
}

impl BatchReport {
    pub fn records(&self) -> impl Iterator<Item = &ResultRecord> {
        self.outcomes.iter().filter_map(ImageOutcome::record)
    }

    pub fn recorded_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ImageOutcome::Recorded { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.warnings().len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct BatchProcessor {
    ocr: SharedOcrEngine,
    router: ExtractionRouter,
    vision_configured: bool,
    completion: Option<SharedCompletionClient>,
}

impl BatchProcessor {
    pub fn new(
        ocr: SharedOcrEngine,
        vision: Option<SharedVisionClient>,
        completion: Option<SharedCompletionClient>,
    ) -> Self {
        let vision_configured = vision.is_some();
        Self {
            router: ExtractionRouter::standard(ocr.clone(), vision),
            ocr,
            vision_configured,
            completion,
        }
    }

    /// Process every image in order and record one result per image.
    ///
    /// Fails as a whole only for an empty batch or a missing credential
    /// that the options make certain to be needed.
    pub fn process_batch(
        &self,
        lexicon: &LexiconStore,
        store: &dyn ResultStore,
        images: &[ImageUnit],
        options: &PipelineOptions,
    ) -> Result<BatchReport, PipelineError> {
        if images.is_empty() {
            return Err(InputError::NoImages.into());
        }
        if options.translate && self.completion.is_none() {
            return Err(ConfigError::MissingCredential(API_KEY_VAR).into());
        }
        if options.requires_vision() && !self.vision_configured {
            return Err(ConfigError::MissingCredential(API_KEY_VAR).into());
        }

        let batch_id = Uuid::new_v4();
        let _span =
            tracing::info_span!("process_batch", %batch_id, images = images.len()).entered();

        let correction = match (&options.manual_correction, images.len()) {
            (Some(text), 1) => Some(text.as_str()),
            (Some(_), n) => {
                tracing::warn!(images = n, "Manual correction ignored for multi-image batch");
                None
            }
            (None, _) => None,
        };

        let outcomes: Vec<ImageOutcome> = images
            .iter()
            .enumerate()
            .map(|(index, image)| {
                self.process_image(lexicon, store, image, index, options, correction)
            })
            .collect();

        let report = BatchReport { batch_id, outcomes };
        tracing::info!(
            recorded = report.recorded_count(),
            failed = report.failed_count(),
            warnings = report.warning_count(),
            "Batch complete"
        );
        Ok(report)
    }

    fn process_image(
        &self,
        lexicon: &LexiconStore,
        store: &dyn ResultStore,
        image: &ImageUnit,
        index: usize,
        options: &PipelineOptions,
        correction: Option<&str>,
    ) -> ImageOutcome {
        let _span = tracing::info_span!("process_image", file = image.name(), index).entered();
        match self.run_stages(lexicon, store, image, options, correction) {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!(error = %error, "Image failed");
                ImageOutcome::Failed {
                    filename: image.name().to_string(),
                    error,
                }
            }
        }
    }

    fn run_stages(
        &self,
        lexicon: &LexiconStore,
        store: &dyn ResultStore,
        image: &ImageUnit,
        options: &PipelineOptions,
        correction: Option<&str>,
    ) -> Result<ImageOutcome, PipelineError> {
        let prepared = prepare_image(image)?;
        let mut warnings = Vec::new();

        // Classify
        let (label, detected) = if options.auto_detect {
            let fragments = self
                .ocr
                .recognize(&prepared.png_bytes)
                .map_err(PipelineError::RecognitionEngine)?;
            let detected_text = join_fragments(&fragments);
            tracing::debug!(
                profile = ?script_profile(&detected_text),
                "Legacy code points in detected text"
            );
            let label = classify(ClassifierInput::Text(&detected_text));
            (label, Some(fragments))
        } else {
            (classify(ClassifierInput::Manual(options.manual_label)), None)
        };
        tracing::info!(label = %label, auto = options.auto_detect, "Script classified");

        // Extract
        let request = ExtractionRequest {
            image,
            prepared_png: &prepared.png_bytes,
            label,
            recognized: detected.as_deref(),
            threshold: options.threshold,
            instruction: &options.vision_prompt,
        };
        let mut extraction = match self.router.extract(&request) {
            Ok(result) => result,
            Err(ExtractionError::Remote(e)) => {
                tracing::warn!(error = %e, "Vision interpretation failed, recording empty text");
                warnings.push(StageWarning::RemoteService {
                    stage: RemoteStage::Vision,
                    message: e.to_string(),
                });
                ExtractionResult::empty(label, ExtractionMethod::RemoteVision)
            }
            Err(e) => return Err(PipelineError::RecognitionEngine(e)),
        };
        warnings.extend(
            extraction
                .quality
                .iter()
                .map(|flag| StageWarning::LowQuality { flag: *flag }),
        );

        if let Some(text) = correction {
            tracing::info!("Applying manual correction");
            extraction.raw_text = text.trim().to_string();
        }

        // Translate
        let detected_language = detect_language(&extraction.raw_text);
        let translated_text = if options.translate {
            self.translate_stage(
                &extraction.raw_text,
                options.target_language,
                detected_language,
                &mut warnings,
            )
        } else {
            String::new()
        };

        // Annotate and record
        let annotation = annotate(&extraction.raw_text, &label, lexicon);
        let record = build_record(RecordDraft {
            filename: image.name(),
            extraction: &extraction,
            translated_text,
            detected_language,
            target_language: options.translate.then_some(options.target_language),
            annotation,
        });

        match recorder::record(store, &record) {
            Ok(row_id) => Ok(ImageOutcome::Recorded {
                record,
                row_id,
                warnings,
            }),
            Err(error) => {
                warnings.push(StageWarning::Persistence {
                    message: error.to_string(),
                });
                Ok(ImageOutcome::Unsaved {
                    record,
                    warnings,
                    error,
                })
            }
        }
    }

    fn translate_stage(
        &self,
        text: &str,
        target: TargetLanguage,
        detected: Option<TargetLanguage>,
        warnings: &mut Vec<StageWarning>,
    ) -> String {
        let result = match &self.completion {
            Some(client) => translate(client.as_ref(), text, target, detected),
            None => Err(ConfigError::MissingCredential(API_KEY_VAR).into()),
        };
        match result {
            Ok(translated) => translated,
            Err(e) => {
                tracing::warn!(error = %e, "Translation failed, leaving it empty");
                warnings.push(StageWarning::RemoteService {
                    stage: RemoteStage::Translation,
                    message: e.to_string(),
                });
                String::new()
            }
        }
    }
}
