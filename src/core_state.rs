//! Process-wide application state.
//!
//! `CoreState` is built once at startup and passed by reference to every
//! command. It owns the configuration, the lexicon (behind an `RwLock`) and
//! the lazily created OCR engine. Database connections are opened per
//! operation and dropped afterwards.

use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard};

use crate::config::AppConfig;
use crate::db::{self, DatabaseError, StoredResult};
use crate::lexicon::{LexiconEntry, LexiconError, LexiconStore};
use crate::models::ImageUnit;
use crate::pipeline::extraction::{SharedOcrEngine, TesseractCli};
use crate::pipeline::processor::{BatchProcessor, BatchReport, PipelineError, PipelineOptions};
use crate::pipeline::recorder::SqliteResultStore;
use crate::pipeline::remote::{
    OpenAiClient, RemoteServiceError, SharedCompletionClient, SharedVisionClient,
};

/// Shared application state.
pub struct CoreState {
    pub config: AppConfig,
    lexicon: RwLock<LexiconStore>,
    /// Created on first use, then reused for the life of the process.
    ocr: OnceLock<SharedOcrEngine>,
}

impl CoreState {
    /// Build state from configuration, loading the lexicon file.
    pub fn new(config: AppConfig) -> Result<Self, CoreError> {
        let lexicon = LexiconStore::load(&config.lexicon_path)?;
        Ok(Self {
            config,
            lexicon: RwLock::new(lexicon),
            ocr: OnceLock::new(),
        })
    }

    /// State with a pre-built engine and lexicon.
    pub fn with_parts(config: AppConfig, lexicon: LexiconStore, engine: SharedOcrEngine) -> Self {
        let ocr = OnceLock::new();
        let _ = ocr.set(engine);
        Self {
            config,
            lexicon: RwLock::new(lexicon),
            ocr,
        }
    }

    // ── Engines and clients ─────────────────────────────────

    pub fn ocr_engine(&self) -> SharedOcrEngine {
        self.ocr.get_or_init(|| build_ocr_engine(&self.config)).clone()
    }

    /// Remote client, or `None` when no credential is configured.
    pub fn remote_client(&self) -> Result<Option<Arc<OpenAiClient>>, RemoteServiceError> {
        if !self.config.has_credentials() {
            return Ok(None);
        }
        Ok(Some(Arc::new(OpenAiClient::from_config(&self.config)?)))
    }

    pub fn processor(&self) -> Result<BatchProcessor, CoreError> {
        let remote = self.remote_client()?;
        Ok(BatchProcessor::new(
            self.ocr_engine(),
            remote.clone().map(|c| c as SharedVisionClient),
            remote.map(|c| c as SharedCompletionClient),
        ))
    }

    // ── Pipeline ────────────────────────────────────────────

    /// Run one batch and append its results to the configured database.
    pub fn process_batch(
        &self,
        images: &[ImageUnit],
        options: &PipelineOptions,
    ) -> Result<BatchReport, CoreError> {
        let processor = self.processor()?;
        let store = SqliteResultStore::new(&self.config.db_path);
        let lexicon = self.read_lexicon()?;
        Ok(processor.process_batch(&lexicon, &store, images, options)?)
    }

    // ── Results ─────────────────────────────────────────────

    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        Ok(db::open_database(&self.config.db_path)?)
    }

    pub fn recent_results(&self, limit: usize) -> Result<Vec<StoredResult>, CoreError> {
        let conn = self.open_db()?;
        Ok(db::list_recent_results(&conn, limit)?)
    }

    pub fn result_count(&self) -> Result<i64, CoreError> {
        let conn = self.open_db()?;
        Ok(db::count_results(&conn)?)
    }

    // ── Lexicon ─────────────────────────────────────────────

    pub fn read_lexicon(&self) -> Result<RwLockReadGuard<'_, LexiconStore>, CoreError> {
        self.lexicon.read().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn add_lexicon_entry(
        &self,
        character: &str,
        transliteration: &str,
        meaning: &str,
    ) -> Result<LexiconEntry, CoreError> {
        let mut lexicon = self.lexicon.write().map_err(|_| CoreError::LockPoisoned)?;
        Ok(lexicon.add(character, transliteration, meaning)?)
    }

    pub fn search_lexicon(&self, query: &str) -> Result<Vec<LexiconEntry>, CoreError> {
        Ok(self.read_lexicon()?.search(query))
    }

    pub fn lookup_lexicon(&self, character: &str) -> Result<Option<LexiconEntry>, CoreError> {
        Ok(self.read_lexicon()?.lookup(character))
    }
}

/// Bundled libtesseract when compiled in and a tessdata directory is set,
/// otherwise the `tesseract` binary.
fn build_ocr_engine(config: &AppConfig) -> SharedOcrEngine {
    #[cfg(feature = "ocr")]
    if let Some(dir) = &config.tessdata_dir {
        use crate::pipeline::extraction::BundledTesseract;
        match BundledTesseract::new(dir, &config.ocr_languages) {
            Ok(engine) => {
                tracing::info!(languages = %config.ocr_languages, "Using bundled Tesseract");
                return Arc::new(engine);
            }
            Err(e) => tracing::warn!(error = %e, "Bundled Tesseract unavailable, using binary"),
        }
    }

    tracing::info!(
        command = %config.tesseract_cmd,
        languages = %config.ocr_languages,
        "Using Tesseract binary"
    );
    Arc::new(TesseractCli::from_config(config))
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Lexicon error: {0}")]
    Lexicon(#[from] LexiconError),
    #[error("Remote service error: {0}")]
    Remote(#[from] RemoteServiceError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::preprocess::tests::png_unit;
    use crate::pipeline::extraction::MockOcrEngine;
    use crate::pipeline::processor::ImageOutcome;

    fn test_config(dir: &std::path::Path) -> AppConfig {
        let db = dir.join("ocr_results.db").display().to_string();
        let lexicon = dir.join("geez_dict.json").display().to_string();
        AppConfig::from_lookup(move |key| match key {
            "GLYPHSCRIBE_DB" => Some(db.clone()),
            "GLYPHSCRIBE_LEXICON" => Some(lexicon.clone()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn missing_lexicon_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = CoreState::new(test_config(dir.path())).unwrap();
        assert!(state.read_lexicon().unwrap().is_empty());
        assert!(state.remote_client().unwrap().is_none());
    }

    #[test]
    fn lexicon_add_is_visible_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let state = CoreState::new(config.clone()).unwrap();

        state.add_lexicon_entry("ሀ", "hä", "first letter").unwrap();
        let found = state.lookup_lexicon("ሀ").unwrap().unwrap();
        assert_eq!(found.transliteration, "hä");
        assert_eq!(state.search_lexicon("hä").unwrap().len(), 1);

        let reloaded = CoreState::new(config).unwrap();
        assert_eq!(reloaded.lookup_lexicon("ሀ").unwrap(), Some(found));
    }

    #[test]
    fn batch_results_land_in_configured_database() {
        let dir = tempfile::tempdir().unwrap();
        let state = CoreState::with_parts(
            test_config(dir.path()),
            LexiconStore::in_memory(Vec::new()),
            Arc::new(MockOcrEngine::from_text("Printed page", 88.0)),
        );

        let images = vec![png_unit("one.png"), png_unit("two.png")];
        let report = state
            .process_batch(&images, &PipelineOptions::default())
            .unwrap();

        assert!(report
            .outcomes
            .iter()
            .all(|o| matches!(o, ImageOutcome::Recorded { .. })));
        assert_eq!(state.result_count().unwrap(), 2);
        let recent = state.recent_results(1).unwrap();
        assert_eq!(recent[0].record.filename, "two.png");
        assert_eq!(recent[0].record.raw_text, "Printed page");
    }

    #[test]
    fn config_halt_surfaces_as_pipeline_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = CoreState::with_parts(
            test_config(dir.path()),
            LexiconStore::in_memory(Vec::new()),
            Arc::new(MockOcrEngine::from_text("x", 88.0)),
        );
        let options = PipelineOptions {
            translate: true,
            ..PipelineOptions::default()
        };
        let err = state.process_batch(&[png_unit("a.png")], &options).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Pipeline(PipelineError::Configuration(_))
        ));
        assert_eq!(state.result_count().unwrap(), 0);
    }
}
