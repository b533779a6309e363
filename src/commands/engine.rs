//! `engine`: report on the local OCR installation and remote configuration.

use serde::Serialize;

use crate::core_state::CoreState;
use crate::pipeline::extraction::TesseractCli;

#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub installed_languages: Vec<String>,
    pub configured_languages: String,
    /// Configured languages with no installed pack.
    pub missing_languages: Vec<String>,
    pub remote_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Query the `tesseract` binary. An unreachable engine is reported in the
/// status, not as a command failure.
pub fn engine_status(state: &CoreState) -> EngineStatus {
    let cli = TesseractCli::from_config(&state.config);
    let configured = state.config.ocr_languages.clone();

    let status = cli
        .engine_version()
        .and_then(|version| Ok((version, cli.installed_languages()?)));

    let (version, installed, error) = match status {
        Ok((version, installed)) => (Some(version), installed, None),
        Err(e) => {
            tracing::warn!(error = %e, "Tesseract check failed");
            (None, Vec::new(), Some(e.to_string()))
        }
    };

    EngineStatus {
        command: cli.command().display().to_string(),
        missing_languages: missing_languages(&configured, &installed),
        version,
        installed_languages: installed,
        configured_languages: configured,
        remote_configured: state.config.has_credentials(),
        error,
    }
}

/// Entries of a `+`-joined language set absent from `installed`.
fn missing_languages(configured: &str, installed: &[String]) -> Vec<String> {
    configured
        .split('+')
        .map(str::trim)
        .filter(|lang| !lang.is_empty() && !installed.iter().any(|i| i == lang))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn missing_languages_listed() {
        let installed = vec!["eng".to_string(), "osd".to_string()];
        assert_eq!(missing_languages("eng+amh", &installed), vec!["amh"]);
        assert!(missing_languages("eng", &installed).is_empty());
    }

    #[test]
    fn absent_binary_is_reported_not_raised() {
        let config = AppConfig::from_lookup(|key| {
            (key == "TESSERACT_CMD").then(|| "/nonexistent/tesseract-glyphscribe".to_string())
        })
        .unwrap();
        let state = CoreState::new(AppConfig {
            lexicon_path: std::env::temp_dir().join("glyphscribe-no-lexicon.json"),
            ..config
        })
        .unwrap();

        let status = engine_status(&state);
        assert!(status.version.is_none());
        assert!(status.error.as_deref().unwrap_or_default().contains("not found"));
        assert_eq!(status.missing_languages, vec!["eng"]);
        assert!(!status.remote_configured);
    }
}
