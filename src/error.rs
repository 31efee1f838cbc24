//! Crate-level error type. Per-unit translation failures are not errors;
//! they are carried as `TranslationResult::Failure` values inside a batch.

use thiserror::Error;

use crate::batch::session::SessionError;
use crate::batch::BatchError;
use crate::config::ConfigError;
use crate::document::DocumentError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid edits file: {0}")]
    Edits(String),
    #[error("could not detect source language; pass --source explicitly")]
    UndetectedLanguage,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
