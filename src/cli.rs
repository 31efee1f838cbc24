//! `docxlate` command line: argument parsing, logging setup and the
//! translate / assemble / extract / languages commands.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::batch::{run_batch, BatchDriver, BatchSession, BatchState, RunOutcome, TranslationUnit};
use crate::config::Config;
use crate::document::{self, AssembleOptions, EmptyParagraphPolicy, DEFAULT_OUTPUT_NAME, DOCX_MIME};
use crate::error::{Error, Result};
use crate::languages::{detect_source_language, language_name, resolve_language, LANGUAGES};
use crate::metrics::MetricsRegistry;
use crate::translate::{LanguageTag, TranslationClient};

/// Paragraphs sampled for source-language detection.
const DETECT_SAMPLE_PARAGRAPHS: usize = 20;

#[derive(Parser, Debug)]
#[command(name = "docxlate", version, about, long_about = None)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Translate a .docx or .txt file paragraph by paragraph
    Translate(TranslateArgs),
    /// Rebuild a .docx from a saved (possibly reviewed) session
    Assemble(AssembleArgs),
    /// Print the units that would be translated
    Extract { input: PathBuf },
    /// List known language names and their model tags
    Languages,
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Output .docx path
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_NAME)]
    pub output: PathBuf,

    /// JSON object mapping unit index to replacement text
    #[arg(long)]
    pub edits: Option<PathBuf>,

    /// Keep empty translations as empty paragraphs
    #[arg(long)]
    pub keep_empty: bool,

    /// Heading paragraph placed before the content
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Args, Debug)]
pub struct TranslateArgs {
    pub input: PathBuf,

    /// Target language name or tag (e.g. "French" or "fra_Latn")
    #[arg(short = 't', long)]
    pub target: String,

    /// Source language name or tag, or "auto" to detect it
    #[arg(short = 's', long, default_value = "auto")]
    pub source: String,

    /// Session file updated after every step
    #[arg(long)]
    pub session: Option<PathBuf>,

    /// Continue from the session file instead of starting over
    #[arg(long, requires = "session")]
    pub resume: bool,

    /// Attempts per unit when requests time out
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Pause between consecutive requests, in milliseconds
    #[arg(long)]
    pub step_delay_ms: Option<u64>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct AssembleArgs {
    pub session: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl OutputArgs {
    pub fn assemble_options(&self) -> AssembleOptions {
        let policy = if self.keep_empty {
            EmptyParagraphPolicy::Preserve
        } else {
            EmptyParagraphPolicy::Skip
        };
        let options = AssembleOptions::new(policy);
        match &self.title {
            Some(title) => options.with_title(title.clone()),
            None => options,
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("docxlate=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Translate(args) => translate(args).await,
        Command::Assemble(args) => assemble(args),
        Command::Extract { input } => extract(&input),
        Command::Languages => {
            for (name, tag) in LANGUAGES {
                println!("{name:<24} {tag}");
            }
            Ok(())
        }
    }
}

async fn translate(args: TranslateArgs) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(n) = args.max_retries {
        config.max_retries = n;
    }
    if let Some(ms) = args.step_delay_ms {
        config.step_delay = Duration::from_millis(ms);
    }

    let metrics = Arc::new(MetricsRegistry::new());
    let client = TranslationClient::from_config(&config)?.with_metrics(Arc::clone(&metrics));

    let previous = match &args.session {
        Some(path) if args.resume && path.exists() => Some(BatchSession::load(path)?),
        Some(path) if args.resume => {
            warn!(path = %path.display(), "no session to resume, starting over");
            None
        }
        _ => None,
    };

    let (mut session, mut driver) = match previous {
        Some(session) => {
            let requested = resolve_language(&args.target);
            if requested != session.target {
                warn!(
                    requested = %requested,
                    session = %session.target,
                    "resuming with the session's target language"
                );
            }
            let mut driver = BatchDriver::with_state(
                client,
                session.source.clone(),
                session.target.clone(),
                session.state.clone(),
            )
            .with_metrics(Arc::clone(&metrics));
            driver.resume();
            (session, driver)
        }
        None => {
            let doc = read_document(&args.input)?;
            let target = resolve_language(&args.target);
            let source = pick_source_language(&args.source, &doc.paragraphs)?;
            let mut session =
                BatchSession::new(file_name(&args.input), source.clone(), target.clone(), BatchState::new());
            session.tables_skipped = doc.tables_skipped;

            let mut driver =
                BatchDriver::new(client, source, target).with_metrics(Arc::clone(&metrics));
            driver.start(TranslationUnit::from_paragraphs(doc.paragraphs));
            (session, driver)
        }
    };

    if let Some(path) = &args.output.edits {
        for (index, text) in read_edits(path)? {
            driver.override_unit(index, text)?;
        }
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current unit");
            interrupt.cancel();
        }
    });

    let session_path = args.session.as_deref();
    let outcome = run_batch(&mut driver, &cancel, config.step_delay, |report, state| {
        info!(
            cursor = report.cursor,
            total = report.total,
            index = report.index,
            status = %report.status,
            "unit_progress"
        );
        if let Some(path) = session_path {
            session.state = state.clone();
            if let Err(e) = session.save(path) {
                warn!(error = %e, "session checkpoint failed");
            }
        }
    })
    .await;

    session.state = driver.into_state();
    if let Some(path) = session_path {
        session.save(path)?;
    }
    metrics.log_summary();

    match outcome {
        RunOutcome::Completed => {
            let counts = session.state.counts();
            write_document(&session.state.translations(), &args.output)?;
            println!(
                "translated {} of {} units ({} failed) -> {}",
                counts.done,
                session.state.len(),
                counts.failed,
                args.output.output.display()
            );
        }
        RunOutcome::Cancelled | RunOutcome::Idle => match session_path {
            Some(path) => println!(
                "stopped at unit {} of {}; continue with --session {} --resume",
                session.state.cursor(),
                session.state.len(),
                path.display()
            ),
            None => println!(
                "stopped at unit {} of {}; progress was not saved (no --session)",
                session.state.cursor(),
                session.state.len()
            ),
        },
    }
    Ok(())
}

fn assemble(args: AssembleArgs) -> Result<()> {
    let mut session = BatchSession::load(&args.session)?;
    if let Some(path) = &args.output.edits {
        for (index, text) in read_edits(path)? {
            session.state.override_unit(index, text)?;
        }
    }
    if !session.state.is_finished() {
        warn!(
            cursor = session.state.cursor(),
            units = session.state.len(),
            "session is incomplete; untranslated units are left empty"
        );
    }
    write_document(&session.state.translations(), &args.output)?;
    println!(
        "assembled {} units -> {}",
        session.state.len(),
        args.output.output.display()
    );
    Ok(())
}

fn extract(input: &Path) -> Result<()> {
    let doc = read_document(input)?;
    for (index, paragraph) in doc.paragraphs.iter().enumerate() {
        println!("{index:>4}  {paragraph}");
    }
    if doc.tables_skipped > 0 {
        println!("({} tables not translated)", doc.tables_skipped);
    }
    if doc.blocks_skipped > 0 {
        println!("({} content controls not translated)", doc.blocks_skipped);
    }
    Ok(())
}

fn read_document(path: &Path) -> Result<document::ExtractedDocument> {
    let bytes = std::fs::read(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(document::extract(&file_name(path), &bytes)?)
}

fn write_document(translations: &[String], output: &OutputArgs) -> Result<()> {
    let bytes = document::assemble(translations, &output.assemble_options())?;
    std::fs::write(&output.output, &bytes).map_err(|source| Error::Io {
        path: output.output.display().to_string(),
        source,
    })?;
    info!(
        path = %output.output.display(),
        bytes = bytes.len(),
        mime = DOCX_MIME,
        "document_written"
    );
    Ok(())
}

/// `auto` detects from the first paragraphs; anything else is resolved
/// through the language table.
fn pick_source_language(requested: &str, paragraphs: &[String]) -> Result<LanguageTag> {
    if !requested.trim().eq_ignore_ascii_case("auto") {
        return Ok(resolve_language(requested));
    }
    let sample = paragraphs
        .iter()
        .take(DETECT_SAMPLE_PARAGRAPHS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");
    let tag = detect_source_language(&sample).ok_or(Error::UndetectedLanguage)?;
    info!(
        tag = %tag,
        name = language_name(&tag).unwrap_or("unknown"),
        "source_language_detected"
    );
    Ok(tag)
}

/// Parse an edits file: `{"3": "manual text", ...}`.
pub fn read_edits(path: &Path) -> Result<BTreeMap<usize, String>> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_edits(&raw)
}

pub fn parse_edits(raw: &str) -> Result<BTreeMap<usize, String>> {
    serde_json::from_str(raw).map_err(|e| Error::Edits(e.to_string()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn translate_defaults() {
        let cli = Cli::parse_from(["docxlate", "translate", "in.docx", "--target", "French"]);
        let Command::Translate(args) = cli.command else {
            panic!("expected translate");
        };
        assert_eq!(args.source, "auto");
        assert_eq!(args.output.output, PathBuf::from(DEFAULT_OUTPUT_NAME));
        assert!(!args.resume);
        assert_eq!(
            args.output.assemble_options().empty_paragraphs,
            EmptyParagraphPolicy::Skip
        );
    }

    #[test]
    fn resume_requires_session() {
        let parsed =
            Cli::try_parse_from(["docxlate", "translate", "in.docx", "-t", "French", "--resume"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn keep_empty_and_title_reach_assemble_options() {
        let cli = Cli::parse_from([
            "docxlate",
            "assemble",
            "s.json",
            "--keep-empty",
            "--title",
            "Report",
        ]);
        let Command::Assemble(args) = cli.command else {
            panic!("expected assemble");
        };
        let options = args.output.assemble_options();
        assert_eq!(options.empty_paragraphs, EmptyParagraphPolicy::Preserve);
        assert_eq!(options.title.as_deref(), Some("Report"));
    }

    #[test]
    fn edits_parse_index_keys() {
        let edits = parse_edits(r#"{"0": "Bonjour", "2": "Fin"}"#).unwrap();
        assert_eq!(edits.get(&0).map(String::as_str), Some("Bonjour"));
        assert_eq!(edits.len(), 2);
        assert!(matches!(parse_edits(r#"{"x": "y"}"#), Err(Error::Edits(_))));
    }

    #[test]
    fn explicit_source_skips_detection() {
        let tag = pick_source_language("Hindi", &[]).unwrap();
        assert_eq!(tag.as_str(), "hin_Deva");
        assert!(matches!(
            pick_source_language("auto", &[]),
            Err(Error::UndetectedLanguage)
        ));
    }
}
