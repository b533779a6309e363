//! `process`: run a batch of image files through the pipeline.

use std::path::PathBuf;

use serde::Serialize;

use crate::core_state::CoreState;
use crate::models::ImageUnit;
use crate::pipeline::processor::{BatchReport, ImageOutcome, PipelineOptions};

/// Per-image view of a batch outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ImageSummary {
    pub filename: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    pub raw_text: String,
    pub translated_text: String,
    pub transliteration: String,
    pub meaning: String,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub batch_id: String,
    pub recorded: usize,
    pub failed: usize,
    pub warnings: usize,
    pub images: Vec<ImageSummary>,
}

impl From<&ImageOutcome> for ImageSummary {
    fn from(outcome: &ImageOutcome) -> Self {
        let (status, row_id, error) = match outcome {
            ImageOutcome::Recorded { row_id, .. } => ("recorded", Some(*row_id), None),
            ImageOutcome::Unsaved { error, .. } => ("unsaved", None, Some(error.to_string())),
            ImageOutcome::Failed { error, .. } => ("failed", None, Some(error.to_string())),
        };
        let record = outcome.record();
        Self {
            filename: outcome.filename().to_string(),
            status,
            row_id,
            script: record.and_then(|r| r.script()).map(|s| s.to_string()),
            raw_text: record.map(|r| r.raw_text.clone()).unwrap_or_default(),
            translated_text: record.map(|r| r.translated_text.clone()).unwrap_or_default(),
            transliteration: record.map(|r| r.transliteration.clone()).unwrap_or_default(),
            meaning: record.map(|r| r.meaning.clone()).unwrap_or_default(),
            warnings: outcome.warnings().iter().map(ToString::to_string).collect(),
            error,
        }
    }
}

impl From<&BatchReport> for BatchSummary {
    fn from(report: &BatchReport) -> Self {
        Self {
            batch_id: report.batch_id.to_string(),
            recorded: report.recorded_count(),
            failed: report.failed_count(),
            warnings: report.warning_count(),
            images: report.outcomes.iter().map(ImageSummary::from).collect(),
        }
    }
}

/// Read every file, then process them in the given order.
///
/// A file that cannot be read rejects the whole submission before any
/// image is processed.
pub fn process_images(
    state: &CoreState,
    paths: &[PathBuf],
    options: &PipelineOptions,
) -> Result<BatchSummary, String> {
    let images = paths
        .iter()
        .map(|p| ImageUnit::from_path(p))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;

    let report = state
        .process_batch(&images, options)
        .map_err(|e| e.to_string())?;

    Ok(BatchSummary::from(&report))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use image::ImageOutputFormat;

    use super::*;
    use crate::config::AppConfig;
    use crate::lexicon::LexiconStore;
    use crate::pipeline::extraction::preprocess::tests::make_test_image;
    use crate::pipeline::extraction::MockOcrEngine;

    fn state(dir: &std::path::Path, text: &str) -> CoreState {
        let db = dir.join("results.db").display().to_string();
        let config = AppConfig::from_lookup(move |key| {
            (key == "GLYPHSCRIBE_DB").then(|| db.clone())
        })
        .unwrap();
        CoreState::with_parts(
            config,
            LexiconStore::in_memory(Vec::new()),
            Arc::new(MockOcrEngine::from_text(text, 91.0)),
        )
    }

    #[test]
    fn files_are_processed_and_summarized() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("scan.png");
        let jpg = dir.path().join("photo.jpg");
        std::fs::write(&png, make_test_image(20, 10, ImageOutputFormat::Png)).unwrap();
        std::fs::write(&jpg, make_test_image(20, 10, ImageOutputFormat::Jpeg(90))).unwrap();

        let summary = process_images(
            &state(dir.path(), "Page 12"),
            &[png, jpg],
            &PipelineOptions::default(),
        )
        .unwrap();

        assert_eq!(summary.recorded, 2);
        assert_eq!(summary.failed, 0);
        let names: Vec<&str> = summary.images.iter().map(|i| i.filename.as_str()).collect();
        assert_eq!(names, vec!["scan.png", "photo.jpg"]);
        assert_eq!(summary.images[0].status, "recorded");
        assert_eq!(summary.images[0].raw_text, "Page 12");
        assert_eq!(summary.images[0].script.as_deref(), Some("modern"));
    }

    #[test]
    fn unreadable_file_rejects_submission() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.png");
        let state = state(dir.path(), "x");
        let err = process_images(&state, &[missing], &PipelineOptions::default()).unwrap_err();
        assert!(err.contains("nope.png"));
        assert_eq!(state.result_count().unwrap(), 0);
    }

    #[test]
    fn unsupported_extension_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let gif = dir.path().join("anim.gif");
        std::fs::write(&gif, b"GIF89a-not-really").unwrap();
        let err = process_images(&state(dir.path(), "x"), &[gif], &PipelineOptions::default())
            .unwrap_err();
        assert!(err.contains("anim.gif"));
    }
}
