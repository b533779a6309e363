//! Result recording: lexicon annotation, entity extraction and the
//! append-only write to the results store.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use rusqlite::Connection;

use crate::db::repository::insert_result;
use crate::db::sqlite::open_database;
use crate::db::DatabaseError;
use crate::lexicon::LexiconStore;
use crate::models::{Entities, ResultRecord, ScriptLabel, TargetLanguage};
use crate::pipeline::extraction::ExtractionResult;

/// Runs of decimal digits (with decimal/thousand separators) or Ethiopic numerals.
static NUMERAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(?:[.,]\d+)*|[\u{1369}-\u{137C}]+").unwrap()
});

/// Lexicon-derived fields for one result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    pub transliteration: String,
    pub meaning: String,
    /// Every lexicon key found in the text, in order of first appearance.
    pub matched: Vec<String>,
}

/// Look the text up in the lexicon. Ancient labels only.
///
/// The whole trimmed text is tried first, then each character in order.
/// The first hit fills transliteration and meaning.
pub fn annotate(raw_text: &str, label: &ScriptLabel, lexicon: &LexiconStore) -> Annotation {
    let mut annotation = Annotation::default();
    if !label.is_ancient() {
        return annotation;
    }

    let text = raw_text.trim();
    if text.is_empty() {
        return annotation;
    }

    if let Some(entry) = lexicon.lookup(text) {
        annotation.transliteration = entry.transliteration;
        annotation.meaning = entry.meaning;
        annotation.matched.push(entry.character);
    }

    let mut buf = [0u8; 4];
    for ch in text.chars().filter(|c| !c.is_whitespace()) {
        let key: &str = ch.encode_utf8(&mut buf);
        if annotation.matched.iter().any(|m| m == key) {
            continue;
        }
        if let Some(entry) = lexicon.lookup(key) {
            if annotation.matched.is_empty() {
                annotation.transliteration = entry.transliteration;
                annotation.meaning = entry.meaning;
            }
            annotation.matched.push(entry.character);
        }
    }

    annotation
}

/// Numeric tokens in the text.
pub fn extract_numerals(text: &str) -> Vec<String> {
    NUMERAL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Everything the recorder needs to assemble one record.
pub struct RecordDraft<'a> {
    pub filename: &'a str,
    pub extraction: &'a ExtractionResult,
    pub translated_text: String,
    pub detected_language: Option<TargetLanguage>,
    pub target_language: Option<TargetLanguage>,
    pub annotation: Annotation,
}

pub fn build_record(draft: RecordDraft<'_>) -> ResultRecord {
    let extraction = draft.extraction;
    ResultRecord {
        filename: draft.filename.to_string(),
        raw_text: extraction.raw_text.clone(),
        translated_text: draft.translated_text,
        transliteration: draft.annotation.transliteration,
        meaning: draft.annotation.meaning,
        entities: Some(Entities {
            script: extraction.source_label,
            method: extraction.method,
            detected_language: draft.detected_language,
            target_language: draft.target_language,
            fragments_kept: extraction.fragments_kept,
            fragments_dropped: extraction.fragments_dropped,
            lexicon_matches: draft.annotation.matched,
            numerals: extract_numerals(&extraction.raw_text),
        }),
        timestamp: Utc::now(),
    }
}

/// Append-only sink for result records.
pub trait ResultStore {
    /// Store one record, returning its row id.
    fn append(&self, record: &ResultRecord) -> Result<i64, DatabaseError>;
}

/// SQLite file store. The connection lives only for the duration of a write.
pub struct SqliteResultStore {
    path: PathBuf,
}

impl SqliteResultStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl ResultStore for SqliteResultStore {
    fn append(&self, record: &ResultRecord) -> Result<i64, DatabaseError> {
        let conn = open_database(&self.path)?;
        insert_result(&conn, record)
    }
}

impl ResultStore for Connection {
    fn append(&self, record: &ResultRecord) -> Result<i64, DatabaseError> {
        insert_result(self, record)
    }
}

/// Append one record. Failures are reported, never retried.
pub fn record(store: &dyn ResultStore, record: &ResultRecord) -> Result<i64, DatabaseError> {
    match store.append(record) {
        Ok(row_id) => {
            tracing::info!(file = %record.filename, row_id, "Result recorded");
            Ok(row_id)
        }
        Err(e) => {
            tracing::error!(file = %record.filename, error = %e, "Failed to record result");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{count_results, list_recent_results};
    use crate::db::sqlite::open_memory_database;
    use crate::lexicon::LexiconEntry;
    use crate::models::{ExtractionMethod, ScriptFamily};

    fn lexicon() -> LexiconStore {
        LexiconStore::in_memory(vec![
            LexiconEntry {
                character: "ሀ".into(),
                transliteration: "hä".into(),
                meaning: "first letter".into(),
            },
            LexiconEntry {
                character: "ለ".into(),
                transliteration: "lä".into(),
                meaning: "letter la".into(),
            },
            LexiconEntry {
                character: "ሰላም".into(),
                transliteration: "sälam".into(),
                meaning: "peace".into(),
            },
        ])
    }

    fn ancient() -> ScriptLabel {
        ScriptLabel::Ancient {
            family: Some(ScriptFamily::Ethiopic),
        }
    }

    fn extraction(text: &str, label: ScriptLabel) -> ExtractionResult {
        ExtractionResult {
            raw_text: text.into(),
            source_label: label,
            method: ExtractionMethod::RemoteVision,
            fragments_kept: 0,
            fragments_dropped: 0,
            quality: Vec::new(),
        }
    }

    #[test]
    fn whole_text_match_takes_priority() {
        let a = annotate(" ሰላም ", &ancient(), &lexicon());
        assert_eq!(a.transliteration, "sälam");
        assert_eq!(a.meaning, "peace");
        assert_eq!(a.matched[0], "ሰላም");
    }

    #[test]
    fn first_character_match_fills_fields() {
        let a = annotate("ሐ ለ ሀ", &ancient(), &lexicon());
        assert_eq!(a.transliteration, "lä");
        assert_eq!(a.meaning, "letter la");
        assert_eq!(a.matched, vec!["ለ", "ሀ"]);
    }

    #[test]
    fn repeated_characters_matched_once() {
        let a = annotate("ሀሀሀ", &ancient(), &lexicon());
        assert_eq!(a.matched, vec!["ሀ"]);
    }

    #[test]
    fn no_match_leaves_fields_empty() {
        let a = annotate("ጸ", &ancient(), &lexicon());
        assert_eq!(a, Annotation::default());
    }

    #[test]
    fn modern_text_is_never_annotated() {
        let a = annotate("ሀ", &ScriptLabel::Modern, &lexicon());
        assert_eq!(a, Annotation::default());
        let a = annotate("ሀ", &ScriptLabel::Unknown, &lexicon());
        assert_eq!(a, Annotation::default());
    }

    #[test]
    fn numerals_found() {
        assert_eq!(extract_numerals("Year 1923, page 4.5 and ፲፪"), vec!["1923", "4.5", "፲፪"]);
        assert!(extract_numerals("no digits").is_empty());
    }

    #[test]
    fn build_record_carries_entities() {
        let ext = extraction("ሀ 12", ancient());
        let record = build_record(RecordDraft {
            filename: "stele.jpg",
            extraction: &ext,
            translated_text: "ha 12".into(),
            detected_language: Some(TargetLanguage::Amharic),
            target_language: Some(TargetLanguage::English),
            annotation: annotate(&ext.raw_text, &ext.source_label, &lexicon()),
        });
        assert_eq!(record.filename, "stele.jpg");
        assert_eq!(record.transliteration, "hä");
        assert_eq!(record.script(), Some(ancient()));
        let entities = record.entities.unwrap();
        assert_eq!(entities.numerals, vec!["12"]);
        assert_eq!(entities.lexicon_matches, vec!["ሀ"]);
        assert_eq!(entities.target_language, Some(TargetLanguage::English));
    }

    #[test]
    fn record_appends_rows() {
        let conn = open_memory_database().unwrap();
        let ext = extraction("text", ScriptLabel::Modern);
        let r = build_record(RecordDraft {
            filename: "a.png",
            extraction: &ext,
            translated_text: String::new(),
            detected_language: None,
            target_language: None,
            annotation: Annotation::default(),
        });
        let first = record(&conn, &r).unwrap();
        let second = record(&conn, &r).unwrap();
        assert!(second > first);
        assert_eq!(count_results(&conn).unwrap(), 2);
    }

    #[test]
    fn sqlite_store_opens_per_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ocr_results.db");
        let store = SqliteResultStore::new(&path);
        let ext = extraction("hello", ScriptLabel::Modern);
        let r = build_record(RecordDraft {
            filename: "a.png",
            extraction: &ext,
            translated_text: String::new(),
            detected_language: None,
            target_language: None,
            annotation: Annotation::default(),
        });
        record(&store, &r).unwrap();
        record(&store, &r).unwrap();

        let conn = open_database(&path).unwrap();
        let stored = list_recent_results(&conn, 10).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].record.raw_text, "hello");
    }
}
