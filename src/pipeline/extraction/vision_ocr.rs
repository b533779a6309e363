//! Remote vision interpretation for ancient or unclassified scripts.
//!
//! The original image bytes go to the hosted vision model together with the
//! instruction prompt. The trimmed reply becomes the raw text as-is, line
//! structure included: no confidence filtering applies on this path.

use super::sanitize::strip_invisible;
use super::types::{ExtractionRequest, ExtractionResult, ExtractionStrategy};
use super::ExtractionError;
use crate::config::{ConfigError, API_KEY_VAR};
use crate::models::{ExtractionMethod, ScriptLabel};
use crate::pipeline::remote::{RemoteServiceError, SharedVisionClient};

/// Instruction used when the caller does not supply one.
pub const DEFAULT_VISION_PROMPT: &str =
    "This image contains Geʿez or another ancient script. Please interpret or describe the content.";

pub struct RemoteVisionInterpretation {
    client: Option<SharedVisionClient>,
}

impl RemoteVisionInterpretation {
    pub fn new(client: SharedVisionClient) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Strategy with no credential behind it. Every call fails recoverably.
    pub fn unconfigured() -> Self {
        Self { client: None }
    }
}

impl ExtractionStrategy for RemoteVisionInterpretation {
    fn name(&self) -> &'static str {
        "remote_vision_interpretation"
    }

    fn handles(&self, label: &ScriptLabel) -> bool {
        !matches!(label, ScriptLabel::Modern)
    }

    fn extract(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<ExtractionResult, ExtractionError> {
        let client = self.client.as_ref().ok_or(RemoteServiceError::NotConfigured(
            ConfigError::MissingCredential(API_KEY_VAR),
        ))?;

        let _span = tracing::info_span!(
            "vision_interpret",
            file = request.image.name(),
            image_size = request.image.bytes().len(),
        )
        .entered();
        let start = std::time::Instant::now();

        let reply = client.interpret(
            request.instruction,
            request.image.bytes(),
            request.image.media_type(),
        )?;
        let raw_text = strip_invisible(reply.trim());

        tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            text_len = raw_text.len(),
            "Vision interpretation complete"
        );

        Ok(ExtractionResult {
            raw_text,
            source_label: request.label,
            method: ExtractionMethod::RemoteVision,
            fragments_kept: 0,
            fragments_dropped: 0,
            quality: Vec::new(),
        })
    }
}
