use std::path::{Path, PathBuf};

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Glyphscribe";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable holding the remote service credential.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_VISION_MODEL: &str = "gpt-4o";
const DEFAULT_TEXT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_OCR_LANGS: &str = "eng";
const DEFAULT_TESSERACT_CMD: &str = "tesseract";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{0} is missing. Set it in the environment to enable remote vision and translation")]
    MissingCredential(&'static str),

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Get the application data directory.
/// ~/Glyphscribe/ on all platforms, falling back to the working directory
/// when no home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the results database.
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("ocr_results.db")
}

/// Default location of the curated lexicon file.
pub fn default_lexicon_path() -> PathBuf {
    app_data_dir().join("geez_dict.json")
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "glyphscribe_lib=info,glyphscribe=info,warn"
}

/// Load a `.env` file from the working directory or one of its parents.
///
/// Returns whether a file was applied. Variables already present in the
/// process environment are left untouched.
pub fn load_dotenv() -> bool {
    report_dotenv(dotenvy::dotenv())
}

/// Same as [`load_dotenv`] for an explicit file.
pub fn load_dotenv_from(path: &Path) -> bool {
    report_dotenv(dotenvy::from_path(path).map(|()| path.to_path_buf()))
}

fn report_dotenv(result: Result<PathBuf, dotenvy::Error>) -> bool {
    match result {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "Loaded .env file");
            true
        }
        Err(e) if e.not_found() => false,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable .env file");
            false
        }
    }
}

/// Process-wide configuration, loaded once at startup.
///
/// A missing credential is not an error here: it is stored as `None` and
/// reported by [`AppConfig::require_api_key`] when a remote stage needs it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub vision_model: String,
    pub text_model: String,
    pub timeout_secs: u64,
    pub db_path: PathBuf,
    pub lexicon_path: PathBuf,
    /// Tesseract language set, fixed at engine initialization (e.g. "eng+amh").
    pub ocr_languages: String,
    pub tesseract_cmd: String,
    pub tessdata_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_secs = match non_empty("GLYPHSCRIBE_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                var: "GLYPHSCRIBE_TIMEOUT_SECS",
                value: raw.clone(),
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let config = Self {
            api_key: non_empty(API_KEY_VAR).map(|k| k.trim().to_string()),
            api_base: non_empty("GLYPHSCRIBE_API_BASE")
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            vision_model: non_empty("GLYPHSCRIBE_VISION_MODEL")
                .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
            text_model: non_empty("GLYPHSCRIBE_TEXT_MODEL")
                .unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            timeout_secs,
            db_path: non_empty("GLYPHSCRIBE_DB")
                .map(PathBuf::from)
                .unwrap_or_else(default_db_path),
            lexicon_path: non_empty("GLYPHSCRIBE_LEXICON")
                .map(PathBuf::from)
                .unwrap_or_else(default_lexicon_path),
            ocr_languages: non_empty("GLYPHSCRIBE_OCR_LANGS")
                .unwrap_or_else(|| DEFAULT_OCR_LANGS.to_string()),
            tesseract_cmd: non_empty("TESSERACT_CMD")
                .unwrap_or_else(|| DEFAULT_TESSERACT_CMD.to_string()),
            tessdata_dir: non_empty("TESSDATA_PREFIX").map(PathBuf::from),
        };

        if config.api_key.is_none() {
            tracing::warn!("{API_KEY_VAR} is not set, remote vision and translation are disabled");
        }

        Ok(config)
    }

    /// The remote credential, or a visible configuration error.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential(API_KEY_VAR))
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }
}
