use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{ExtractionMethod, ScriptLabel, TargetLanguage};

/// Structured annotations stored alongside a result as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    pub script: ScriptLabel,
    pub method: ExtractionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<TargetLanguage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<TargetLanguage>,
    #[serde(default)]
    pub fragments_kept: usize,
    #[serde(default)]
    pub fragments_dropped: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lexicon_matches: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub numerals: Vec<String>,
}

/// The persisted outcome of processing one image. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub filename: String,
    pub raw_text: String,
    pub translated_text: String,
    pub transliteration: String,
    pub meaning: String,
    pub entities: Option<Entities>,
    pub timestamp: DateTime<Utc>,
}

impl ResultRecord {
    /// The script label this record was produced under, when annotated.
    pub fn script(&self) -> Option<ScriptLabel> {
        self.entities.as_ref().map(|e| e.script)
    }
}
