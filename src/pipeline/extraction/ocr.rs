use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::types::{BoundingBox, OcrEngine, RecognitionFragment};
use super::ExtractionError;
use crate::config::AppConfig;

/// Engine handle shared between the application context and strategies.
pub type SharedOcrEngine = Arc<dyn OcrEngine + Send + Sync>;

/// Tesseract driven through its command-line binary.
/// Each call writes the image to a temp file and reads TSV from stdout.
pub struct TesseractCli {
    command: PathBuf,
    languages: String,
    tessdata_dir: Option<PathBuf>,
}

impl TesseractCli {
    pub fn new(command: impl Into<PathBuf>, languages: &str) -> Self {
        Self {
            command: command.into(),
            languages: languages.to_string(),
            tessdata_dir: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let engine = Self::new(&config.tesseract_cmd, &config.ocr_languages);
        match &config.tessdata_dir {
            Some(dir) => engine.with_tessdata_dir(dir),
            None => engine,
        }
    }

    pub fn with_tessdata_dir(mut self, dir: &Path) -> Self {
        self.tessdata_dir = Some(dir.to_path_buf());
        self
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    /// Full argument list for one invocation. Tesseract only honors
    /// `--tessdata-dir` ahead of the positional arguments.
    fn command_args<'a>(&'a self, args: &[&'a OsStr]) -> Vec<&'a OsStr> {
        let mut full = Vec::with_capacity(args.len() + 2);
        if let Some(dir) = &self.tessdata_dir {
            full.push(OsStr::new("--tessdata-dir"));
            full.push(dir.as_os_str());
        }
        full.extend_from_slice(args);
        full
    }

    fn run(&self, args: &[&OsStr]) -> Result<Output, ExtractionError> {
        Command::new(&self.command)
            .args(self.command_args(args))
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExtractionError::OcrInit(format!(
                        "tesseract binary '{}' not found",
                        self.command.display()
                    ))
                } else {
                    ExtractionError::Io(e)
                }
            })
    }

    /// First line of `tesseract --version`.
    pub fn engine_version(&self) -> Result<String, ExtractionError> {
        let output = self.run(&["--version".as_ref()])?;
        parse_version_output(&console_text(&output))
            .ok_or_else(|| ExtractionError::OcrInit("tesseract printed no version".into()))
    }

    /// Language packs reported by `tesseract --list-langs`.
    pub fn installed_languages(&self) -> Result<Vec<String>, ExtractionError> {
        let output = self.run(&["--list-langs".as_ref()])?;
        if !output.status.success() {
            return Err(ExtractionError::OcrInit(stderr_text(&output)));
        }
        Ok(parse_language_list(&console_text(&output)))
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<RecognitionFragment>, ExtractionError> {
        let mut tmp = tempfile::Builder::new()
            .prefix("glyphscribe-")
            .suffix(".png")
            .tempfile()?;
        tmp.write_all(image_bytes)?;
        tmp.flush()?;

        let output = self.run(&[
            tmp.path().as_os_str(),
            "stdout".as_ref(),
            "-l".as_ref(),
            self.languages.as_ref(),
            "tsv".as_ref(),
        ])?;

        if !output.status.success() {
            return Err(ExtractionError::OcrProcessing(stderr_text(&output)));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let fragments = parse_tsv_fragments(&tsv);
        tracing::debug!(
            languages = %self.languages,
            fragments = fragments.len(),
            "Tesseract run complete"
        );
        Ok(fragments)
    }

    fn languages(&self) -> &str {
        &self.languages
    }
}

/// Some Tesseract builds print diagnostics on stderr, others on stdout.
fn console_text(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.trim().is_empty() {
        String::from_utf8_lossy(&output.stderr).into_owned()
    } else {
        stdout.into_owned()
    }
}

fn stderr_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        format!("tesseract exited with {}", output.status)
    } else {
        stderr
    }
}

pub fn parse_version_output(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

/// Skips the "List of available languages ..." header line.
pub fn parse_language_list(text: &str) -> Vec<String> {
    text.lines()
        .skip(1)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// libtesseract through the `tesseract` crate.
/// Only available when compiled with the `ocr` feature flag.
#[cfg(feature = "ocr")]
pub struct BundledTesseract {
    tessdata_dir: PathBuf,
    languages: String,
}

#[cfg(feature = "ocr")]
impl BundledTesseract {
    /// Every requested language needs its traineddata in `tessdata_dir`.
    pub fn new(tessdata_dir: &Path, languages: &str) -> Result<Self, ExtractionError> {
        for lang in languages.split('+') {
            if !tessdata_dir.join(format!("{lang}.traineddata")).exists() {
                tracing::warn!(
                    lang,
                    dir = %tessdata_dir.display(),
                    "Traineddata missing"
                );
                return Err(ExtractionError::TessdataNotFound(tessdata_dir.to_path_buf()));
            }
        }

        Ok(Self {
            tessdata_dir: tessdata_dir.to_path_buf(),
            languages: languages.to_string(),
        })
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for BundledTesseract {
    fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<RecognitionFragment>, ExtractionError> {
        let tessdata_str = self
            .tessdata_dir
            .to_str()
            .ok_or_else(|| ExtractionError::OcrInit("Invalid tessdata path".into()))?;

        let tess = tesseract::Tesseract::new(Some(tessdata_str), Some(&self.languages))
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?;

        let mut tess = tess
            .set_image_from_mem(image_bytes)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let tsv = tess
            .get_tsv_text(0)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        Ok(parse_tsv_fragments(&tsv))
    }

    fn languages(&self) -> &str {
        &self.languages
    }
}

/// Mock OCR engine for unit testing without Tesseract.
pub struct MockOcrEngine {
    fragments: Vec<RecognitionFragment>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MockOcrEngine {
    pub fn new(fragments: Vec<RecognitionFragment>) -> Self {
        Self {
            fragments,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// One fragment per whitespace-separated word, all at `confidence`.
    pub fn from_text(text: &str, confidence: f32) -> Self {
        Self::new(
            text.split_whitespace()
                .map(|w| RecognitionFragment::new(w, confidence))
                .collect(),
        )
    }

    /// Engine whose every call fails.
    pub fn failing(message: &str) -> Self {
        Self {
            fragments: Vec::new(),
            failure: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for MockOcrEngine {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<Vec<RecognitionFragment>, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(ExtractionError::OcrProcessing(message.clone())),
            None => Ok(self.fragments.clone()),
        }
    }

    fn languages(&self) -> &str {
        "eng"
    }
}

/// Parse Tesseract TSV output into word fragments.
/// TSV columns: level page_num block_num par_num line_num word_num left top width height conf text
/// Level 5 = individual word entries. Confidence stays on the engine's 0-100 scale.
pub fn parse_tsv_fragments(tsv: &str) -> Vec<RecognitionFragment> {
    let mut results = Vec::new();

    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        let level: i32 = match fields[0].trim().parse() {
            Ok(l) => l,
            Err(_) => continue,
        };
        if level != 5 {
            continue;
        }

        // Tesseract 5 prints fractional confidences
        let conf: f32 = match fields[10].trim().parse() {
            Ok(c) => c,
            Err(_) => continue,
        };

        let word = fields[11].trim();
        if word.is_empty() {
            continue;
        }

        // -1 marks words the engine could not score
        let confidence = conf.clamp(0.0, 100.0);

        results.push(RecognitionFragment {
            text: word.to_string(),
            confidence,
            position: parse_bounding_box(fields[6], fields[7], fields[8], fields[9]),
        });
    }

    results
}

fn parse_bounding_box(left: &str, top: &str, width: &str, height: &str) -> Option<BoundingBox> {
    Some(BoundingBox {
        x: left.parse().ok()?,
        y: top.parse().ok()?,
        width: width.parse().ok()?,
        height: height.parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn mock_returns_configured_fragments() {
        let engine = MockOcrEngine::from_text("Rosetta stone fragment", 91.0);
        let fragments = engine.recognize(b"fake").unwrap();
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0].text, "Rosetta");
        assert!((fragments[0].confidence - 91.0).abs() < f32::EPSILON);
        assert!(fragments[0].position.is_none());
        assert_eq!(engine.call_count(), 1);
    }

    #[test]
    fn failing_mock_reports_processing_error() {
        let engine = MockOcrEngine::failing("engine crashed");
        assert!(matches!(
            engine.recognize(b"fake"),
            Err(ExtractionError::OcrProcessing(m)) if m == "engine crashed"
        ));
        assert_eq!(engine.call_count(), 1);
    }

    #[test]
    fn tsv_parser_keeps_word_rows_only() {
        let tsv = format!(
            "{HEADER}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t600\t800\t-1\t\n\
             5\t1\t1\t1\t1\t1\t10\t20\t80\t30\t95\tStele\n\
             5\t1\t1\t1\t1\t2\t100\t20\t60\t30\t88\tof\n\
             5\t1\t1\t1\t2\t1\t10\t60\t120\t30\t72.5\tAxum"
        );
        let fragments = parse_tsv_fragments(&tsv);
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0].text, "Stele");
        assert!((fragments[0].confidence - 95.0).abs() < f32::EPSILON);
        assert!((fragments[2].confidence - 72.5).abs() < f32::EPSILON);
    }

    #[test]
    fn tsv_parser_extracts_bounding_boxes() {
        let tsv = format!("{HEADER}\n5\t1\t1\t1\t1\t1\t100\t25\t60\t28\t88\tword");
        let fragments = parse_tsv_fragments(&tsv);
        assert_eq!(
            fragments[0].position,
            Some(BoundingBox {
                x: 100,
                y: 25,
                width: 60,
                height: 28
            })
        );
    }

    #[test]
    fn tsv_parser_clamps_negative_confidence() {
        let tsv = format!("{HEADER}\n5\t1\t1\t1\t1\t1\t0\t0\t5\t5\t-1\t?");
        let fragments = parse_tsv_fragments(&tsv);
        assert_eq!(fragments[0].confidence, 0.0);
    }

    #[test]
    fn tsv_parser_skips_malformed_rows() {
        let tsv = format!(
            "{HEADER}\n\
             not\ta\tvalid\trow\n\
             5\t1\t1\t1\t1\t1\t0\t0\t5\t5\tabc\tbadconf\n\
             5\t1\t1\t1\t1\t2\t0\t0\t5\t5\t90\t   \n\
             5\t1\t1\t1\t1\t3\tx\ty\t5\t5\t90\tnobox"
        );
        let fragments = parse_tsv_fragments(&tsv);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "nobox");
        assert!(fragments[0].position.is_none());
    }

    #[test]
    fn tsv_parser_handles_empty_output() {
        assert!(parse_tsv_fragments("").is_empty());
        assert!(parse_tsv_fragments(HEADER).is_empty());
    }

    #[test]
    fn version_is_first_nonblank_line() {
        let out = "\ntesseract 5.3.0\n leptonica-1.82.0\n";
        assert_eq!(parse_version_output(out).as_deref(), Some("tesseract 5.3.0"));
        assert_eq!(parse_version_output("  \n"), None);
    }

    #[test]
    fn language_list_skips_header() {
        let out = "List of available languages in \"/usr/share/tessdata/\" (3):\namh\neng\nosd\n";
        assert_eq!(parse_language_list(out), vec!["amh", "eng", "osd"]);
        assert!(parse_language_list("List of available languages (0):\n").is_empty());
    }

    #[test]
    fn missing_binary_is_init_error() {
        let engine = TesseractCli::new("/nonexistent/bin/tesseract-glyphscribe", "eng");
        assert!(matches!(
            engine.recognize(b"bytes"),
            Err(ExtractionError::OcrInit(_))
        ));
        assert!(matches!(engine.engine_version(), Err(ExtractionError::OcrInit(_))));
    }

    #[test]
    fn tessdata_dir_precedes_positional_args() {
        let engine = TesseractCli::new("tesseract", "eng").with_tessdata_dir(Path::new("/opt/td"));
        let args: Vec<&OsStr> = ["page.png", "stdout", "-l", "eng", "tsv"]
            .into_iter()
            .map(OsStr::new)
            .collect();
        let full = engine.command_args(&args);
        assert_eq!(full[0], "--tessdata-dir");
        assert_eq!(full[1], "/opt/td");
        assert_eq!(&full[2..], &args[..]);
    }

    #[test]
    fn no_tessdata_dir_passes_args_through() {
        let engine = TesseractCli::new("tesseract", "eng");
        let args = [OsStr::new("--list-langs")];
        assert_eq!(engine.command_args(&args), vec![OsStr::new("--list-langs")]);
    }

    #[test]
    fn cli_engine_reports_languages() {
        let engine = TesseractCli::new("tesseract", "eng+amh");
        assert_eq!(engine.languages(), "eng+amh");
    }

    #[cfg(feature = "ocr")]
    #[test]
    fn bundled_tesseract_rejects_missing_tessdata() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            BundledTesseract::new(dir.path(), "eng"),
            Err(ExtractionError::TessdataNotFound(_))
        ));
    }
}
