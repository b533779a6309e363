//! Translation of recognized text into the configured target language.

use crate::models::TargetLanguage;
use crate::pipeline::remote::{CompletionClient, RemoteServiceError};

/// Build the instruction sent to the text model.
pub fn build_translation_prompt(
    text: &str,
    target: TargetLanguage,
    source_hint: Option<TargetLanguage>,
) -> String {
    let source_line = match source_hint {
        Some(source) => format!("The text appears to be in {}.\n", source.display_name()),
        None => String::new(),
    };
    format!(
        "Translate the following text into {target}.\n\
         {source_line}\
         Reply with the translation only, without commentary or quotation marks.\n\n\
         Text:\n{text}",
        target = target.display_name(),
    )
}

/// Translate `text` into `target`.
///
/// Blank input returns an empty string without calling the service. When the
/// detected source language already equals the target, the text is returned
/// unchanged.
pub fn translate(
    client: &dyn CompletionClient,
    text: &str,
    target: TargetLanguage,
    source_hint: Option<TargetLanguage>,
) -> Result<String, RemoteServiceError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(String::new());
    }

    if source_hint == Some(target) {
        tracing::debug!(target = target.as_str(), "Source already in target language, skipping");
        return Ok(text.to_string());
    }

    let prompt = build_translation_prompt(text, target, source_hint);
    let translated = client.complete(&prompt)?;

    tracing::info!(
        target = target.as_str(),
        source = source_hint.map(|s| s.as_str()).unwrap_or("unknown"),
        chars_in = text.chars().count(),
        chars_out = translated.chars().count(),
        "Translation complete"
    );
    Ok(translated.trim().to_string())
}
