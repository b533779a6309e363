//! Command-line surface: argument parsing and output rendering.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::commands;
use crate::commands::process::BatchSummary;
use crate::commands::results::ResultsPage;
use crate::core_state::CoreState;
use crate::lexicon::LexiconEntry;
use crate::models::{ScriptFamily, ScriptLabel, TargetLanguage};
use crate::pipeline::extraction::{ConfidenceThreshold, DEFAULT_VISION_PROMPT};
use crate::pipeline::processor::PipelineOptions;

#[derive(Debug, Parser)]
#[command(name = "glyphscribe", version, about = "Read modern and ancient scripts from images")]
pub struct Cli {
    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Classify, read, optionally translate and record a batch of images.
    Process(ProcessArgs),
    /// Curate the character lexicon.
    #[command(subcommand)]
    Lexicon(LexiconCommand),
    /// Show the most recent stored results.
    Results {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Check the local Tesseract installation.
    Engine,
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// JPEG or PNG files, processed in the order given.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Skip automatic detection and treat every image as this script.
    #[arg(long, value_enum)]
    pub script: Option<ScriptChoice>,

    /// Minimum OCR confidence, in percent.
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub threshold: u8,

    /// Translate the recognized text.
    #[arg(long)]
    pub translate: bool,

    /// Target language, as a code (fra) or name (French).
    #[arg(long, default_value = "fra", value_parser = parse_language)]
    pub target: TargetLanguage,

    /// Instruction sent with ancient-script images.
    #[arg(long, default_value = DEFAULT_VISION_PROMPT)]
    pub prompt: String,

    /// Replace the recognized text (single image only).
    #[arg(long)]
    pub correction: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScriptChoice {
    Modern,
    Ancient,
    Geez,
    Unknown,
}

impl From<ScriptChoice> for ScriptLabel {
    fn from(choice: ScriptChoice) -> Self {
        match choice {
            ScriptChoice::Modern => ScriptLabel::Modern,
            ScriptChoice::Ancient => ScriptLabel::Ancient { family: None },
            ScriptChoice::Geez => ScriptLabel::Ancient {
                family: Some(ScriptFamily::Ethiopic),
            },
            ScriptChoice::Unknown => ScriptLabel::Unknown,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum LexiconCommand {
    /// Add or replace an entry.
    Add {
        character: String,
        transliteration: String,
        meaning: String,
    },
    /// Find entries by character or transliteration.
    Search { query: String },
    /// Show one entry, or every entry when no character is given.
    Show { character: Option<String> },
}

fn parse_language(input: &str) -> Result<TargetLanguage, String> {
    TargetLanguage::parse_loose(input).ok_or_else(|| {
        let known: Vec<&str> = TargetLanguage::ALL.iter().map(|l| l.as_str()).collect();
        format!("unknown language '{input}', expected one of {}", known.join(", "))
    })
}

impl ProcessArgs {
    pub fn options(&self) -> PipelineOptions {
        PipelineOptions {
            auto_detect: self.script.is_none(),
            manual_label: self.script.map(ScriptLabel::from).unwrap_or(ScriptLabel::Modern),
            threshold: ConfidenceThreshold::from_percent(self.threshold),
            translate: self.translate,
            target_language: self.target,
            vision_prompt: self.prompt.clone(),
            manual_correction: self.correction.clone(),
        }
    }
}

/// Run one parsed command and render its output.
pub fn execute(state: &CoreState, cli: Cli) -> Result<String, String> {
    let json = cli.json;
    match cli.command {
        Command::Process(args) => {
            let summary = commands::process::process_images(state, &args.files, &args.options())?;
            render(json, &summary, render_batch)
        }
        Command::Lexicon(LexiconCommand::Add {
            character,
            transliteration,
            meaning,
        }) => {
            let entry =
                commands::lexicon::add_entry(state, &character, &transliteration, &meaning)?;
            render(json, &entry, |e| format!("Saved {}", render_entry(e)))
        }
        Command::Lexicon(LexiconCommand::Search { query }) => {
            let entries = commands::lexicon::search_entries(state, &query)?;
            render(json, &entries, |e| render_entries(e))
        }
        Command::Lexicon(LexiconCommand::Show { character: Some(c) }) => {
            let entry = commands::lexicon::show_entry(state, &c)?;
            render(json, &entry, render_entry)
        }
        Command::Lexicon(LexiconCommand::Show { character: None }) => {
            let entries = commands::lexicon::list_entries(state)?;
            render(json, &entries, |e| render_entries(e))
        }
        Command::Results { limit } => {
            let page = commands::results::list_results(state, limit)?;
            render(json, &page, render_results)
        }
        Command::Engine => {
            let status = commands::engine::engine_status(state);
            render(json, &status, |s| {
                let mut out = format!(
                    "command: {}\nversion: {}\ninstalled: {}\nconfigured: {}\nremote: {}",
                    s.command,
                    s.version.as_deref().unwrap_or("unavailable"),
                    s.installed_languages.join(", "),
                    s.configured_languages,
                    if s.remote_configured { "configured" } else { "not configured" },
                );
                if !s.missing_languages.is_empty() {
                    out.push_str(&format!("\nmissing: {}", s.missing_languages.join(", ")));
                }
                if let Some(error) = &s.error {
                    out.push_str(&format!("\nerror: {error}"));
                }
                out
            })
        }
    }
}

fn render<T: Serialize>(
    json: bool,
    value: &T,
    text: impl Fn(&T) -> String,
) -> Result<String, String> {
    if json {
        serde_json::to_string_pretty(value).map_err(|e| e.to_string())
    } else {
        Ok(text(value))
    }
}

fn render_entry(entry: &LexiconEntry) -> String {
    format!("{}  {}  {}", entry.character, entry.transliteration, entry.meaning)
}

fn render_entries(entries: &[LexiconEntry]) -> String {
    if entries.is_empty() {
        return "No entries".to_string();
    }
    entries.iter().map(render_entry).collect::<Vec<_>>().join("\n")
}

fn render_batch(summary: &BatchSummary) -> String {
    let mut out = Vec::new();
    for image in &summary.images {
        out.push(format!("== {} [{}]", image.filename, image.status));
        if let Some(script) = &image.script {
            out.push(format!("script: {script}"));
        }
        if let Some(error) = &image.error {
            out.push(format!("error: {error}"));
        }
        if !image.raw_text.is_empty() {
            out.push(format!("text:\n{}", image.raw_text));
        }
        if !image.translated_text.is_empty() {
            out.push(format!("translation:\n{}", image.translated_text));
        }
        if !image.transliteration.is_empty() {
            out.push(format!("transliteration: {}", image.transliteration));
            out.push(format!("meaning: {}", image.meaning));
        }
        out.extend(image.warnings.iter().map(|w| format!("warning: {w}")));
    }
    out.push(format!(
        "{} recorded, {} failed, {} warnings",
        summary.recorded, summary.failed, summary.warnings
    ));
    out.join("\n")
}

fn render_results(page: &ResultsPage) -> String {
    let mut out: Vec<String> = page
        .results
        .iter()
        .map(|r| {
            let first_line = r.record.raw_text.lines().next().unwrap_or_default();
            format!(
                "#{} {} {} {}",
                r.id,
                r.record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                r.record.filename,
                first_line
            )
        })
        .collect();
    out.push(format!("{} of {} results", page.results.len(), page.total));
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("glyphscribe").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn process_defaults() {
        let cli = parse(&["process", "a.png", "b.jpg"]);
        let Command::Process(args) = cli.command else {
            panic!("expected process");
        };
        let options = args.options();
        assert_eq!(args.files.len(), 2);
        assert!(options.auto_detect);
        assert_eq!(options.threshold.percent(), 50);
        assert!(!options.translate);
        assert_eq!(options.target_language, TargetLanguage::French);
        assert_eq!(options.vision_prompt, DEFAULT_VISION_PROMPT);
        assert!(options.manual_correction.is_none());
    }

    #[test]
    fn manual_script_disables_detection() {
        let cli = parse(&[
            "process",
            "--script",
            "geez",
            "--translate",
            "--target",
            "English",
            "x.png",
        ]);
        let Command::Process(args) = cli.command else {
            panic!("expected process");
        };
        let options = args.options();
        assert!(!options.auto_detect);
        assert_eq!(
            options.manual_label,
            ScriptLabel::Ancient {
                family: Some(ScriptFamily::Ethiopic)
            }
        );
        assert_eq!(options.target_language, TargetLanguage::English);
    }

    #[test]
    fn bad_threshold_and_language_rejected() {
        let base = ["glyphscribe", "process", "x.png"];
        assert!(Cli::try_parse_from(base.iter().chain(&["--threshold", "150"])).is_err());
        assert!(Cli::try_parse_from(base.iter().chain(&["--target", "klingon"])).is_err());
        assert!(Cli::try_parse_from(["glyphscribe", "process"]).is_err());
    }

    #[test]
    fn lexicon_subcommands_parse() {
        assert!(matches!(
            parse(&["lexicon", "add", "ሀ", "hä", "first letter"]).command,
            Command::Lexicon(LexiconCommand::Add { .. })
        ));
        assert!(matches!(
            parse(&["lexicon", "show"]).command,
            Command::Lexicon(LexiconCommand::Show { character: None })
        ));
        assert!(parse(&["--json", "results"]).json);
    }

    #[test]
    fn batch_text_lists_warnings() {
        let summary = BatchSummary {
            batch_id: "b".into(),
            recorded: 1,
            failed: 0,
            warnings: 1,
            images: vec![commands::process::ImageSummary {
                filename: "a.png".into(),
                status: "recorded",
                row_id: Some(1),
                script: Some("modern".into()),
                raw_text: "Hello".into(),
                translated_text: String::new(),
                transliteration: String::new(),
                meaning: String::new(),
                warnings: vec!["translation failed: timeout".into()],
                error: None,
            }],
        };
        let text = render_batch(&summary);
        assert!(text.contains("== a.png [recorded]"));
        assert!(text.contains("warning: translation failed: timeout"));
        assert!(text.ends_with("1 recorded, 0 failed, 1 warnings"));
    }
}
