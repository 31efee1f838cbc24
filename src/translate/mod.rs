//! Translation types and the `Translator` seam.
//! `client` talks to the hosted model, `sanitize` cleans its output,
//! `cache` short-circuits repeated paragraphs.

pub mod cache;
pub mod client;
pub mod sanitize;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::config::DecodingParams;

pub use client::{HttpBackend, InferenceBackend, TranslationClient, TransportError};
pub use sanitize::sanitize;

/// Opaque model-specific language/script identifier (e.g. `hin_Deva`).
/// Never interpreted, only passed through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageTag(String);

impl LanguageTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One request to the model. Built fresh per call.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    pub text: String,
    pub source: LanguageTag,
    pub target: LanguageTag,
    pub decoding: DecodingParams,
}

impl TranslationRequest {
    /// Wire body: `{"inputs": .., "parameters": {..}}`.
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({
            "inputs": self.text,
            "parameters": {
                "src_lang": self.source.as_str(),
                "tgt_lang": self.target.as_str(),
                "max_length": self.decoding.max_length,
                "temperature": self.decoding.temperature,
                "do_sample": self.decoding.do_sample,
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    Timeout,
    Network,
    UnexpectedFormat,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network"),
            FailureKind::UnexpectedFormat => write!(f, "unexpected format"),
        }
    }
}

/// Outcome of translating one unit. Never partially populated.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationResult {
    Success(String),
    Failure { kind: FailureKind, message: String },
}

impl TranslationResult {
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        TranslationResult::Failure {
            kind,
            message: message.into(),
        }
    }
}

/// Anything that can translate a single unit (the HTTP client, or a double in tests).
pub trait Translator: Send + Sync {
    fn translate(
        &self,
        text: &str,
        source: &LanguageTag,
        target: &LanguageTag,
    ) -> impl Future<Output = TranslationResult> + Send;
}
