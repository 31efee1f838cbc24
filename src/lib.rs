//! docxlate: paragraph-by-paragraph translation of `.docx` and plain-text
//! documents through a hosted NLLB inference endpoint.
//!
//! The pipeline is extract -> batch (one request per unit, retried on
//! timeout, sanitized) -> assemble. A batch advances one unit per
//! `BatchDriver::step()`, can be cancelled at step boundaries, and is
//! persisted as a `BatchSession` so it can be resumed or hand-edited.

pub mod batch;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod languages;
pub mod metrics;
pub mod translate;

pub use batch::{run_batch, BatchDriver, BatchSession, BatchState, RunOutcome, UnitStatus};
pub use config::Config;
pub use document::{assemble, extract, AssembleOptions, EmptyParagraphPolicy};
pub use error::{Error, Result};
pub use translate::{
    sanitize, FailureKind, LanguageTag, TranslationClient, TranslationResult, Translator,
};
