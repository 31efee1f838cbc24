//! Hosted-model translation client.
//! One POST per attempt; timeouts are retried with exponential backoff,
//! every other failure is surfaced immediately.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::cache::{CacheKey, TranslationCache};
use super::{FailureKind, LanguageTag, TranslationRequest, TranslationResult, Translator};
use crate::config::{Config, ConfigError, DecodingParams};
use crate::metrics::{metric_names, MetricsRegistry};

/// Transport-level failure, before any response body is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Timeout(String),
    /// Connection errors and non-2xx statuses.
    Network(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Timeout(msg) => write!(f, "request timed out: {msg}"),
            TransportError::Network(msg) => write!(f, "network error: {msg}"),
        }
    }
}

/// Sends one JSON body to the inference endpoint and returns the raw 2xx body.
pub trait InferenceBackend: Send + Sync {
    fn post(
        &self,
        body: &serde_json::Value,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;
}

/// reqwest-backed backend: bearer auth, JSON body, per-request timeout.
pub struct HttpBackend {
    http: reqwest::Client,
    endpoint: String,
    api_token: String,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(1)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else {
        TransportError::Network(e.to_string())
    }
}

impl InferenceBackend for HttpBackend {
    async fn post(&self, body: &serde_json::Value) -> Result<String, TransportError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(TransportError::Network(format!(
                "unexpected status {}: {}",
                status,
                body_text.chars().take(200).collect::<String>()
            )));
        }

        resp.text().await.map_err(map_reqwest_error)
    }
}

/// Translation client over any [`InferenceBackend`].
pub struct TranslationClient<B = HttpBackend> {
    backend: B,
    decoding: DecodingParams,
    max_retries: u32,
    backoff_unit: Duration,
    cache: Option<TranslationCache>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl TranslationClient<HttpBackend> {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::with_backend(HttpBackend::new(config)?, config))
    }
}

impl<B: InferenceBackend> TranslationClient<B> {
    pub fn with_backend(backend: B, config: &Config) -> Self {
        Self {
            backend,
            decoding: config.decoding,
            max_retries: config.max_retries,
            backoff_unit: config.backoff_unit,
            cache: TranslationCache::new(config.cache_capacity, config.cache_ttl),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Translate one unit, making at most `max_retries` attempts on timeout.
    pub async fn translate_with_retries(
        &self,
        text: &str,
        source: &LanguageTag,
        target: &LanguageTag,
        max_retries: u32,
    ) -> TranslationResult {
        if text.trim().is_empty() {
            return TranslationResult::Success(String::new());
        }

        let cache_key = CacheKey::new(source, target, text);
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.lookup(&cache_key)) {
            debug!(chars = text.chars().count(), "translation_cache_hit");
            return TranslationResult::Success(hit);
        }

        let request = TranslationRequest {
            text: text.to_string(),
            source: source.clone(),
            target: target.clone(),
            decoding: self.decoding,
        };
        let body = request.to_body();
        let request_id = uuid::Uuid::new_v4().to_string();
        let attempts_allowed = max_retries.max(1);
        let start = Instant::now();
        let mut attempt: u32 = 0;

        let result = loop {
            attempt += 1;
            match self.backend.post(&body).await {
                Ok(raw) => break parse_response(&raw),
                Err(TransportError::Timeout(msg)) => {
                    if attempt >= attempts_allowed {
                        break TranslationResult::failure(
                            FailureKind::Timeout,
                            format!("timed out after {attempt} attempts: {msg}"),
                        );
                    }
                    let wait = backoff_delay(self.backoff_unit, attempt - 1);
                    warn!(
                        %request_id,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        "request timeout, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(TransportError::Network(msg)) => {
                    break TranslationResult::failure(FailureKind::Network, msg);
                }
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_duration(metric_names::TRANSLATE_REQUEST, start.elapsed());
            metrics.record(metric_names::TRANSLATE_ATTEMPTS, attempt as f64);
        }

        match &result {
            TranslationResult::Success(translated) => {
                if let Some(cache) = &self.cache {
                    cache.store(cache_key, translated.clone());
                }
                info!(
                    %request_id,
                    attempt,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "translate_done"
                );
            }
            TranslationResult::Failure { kind, message } => {
                warn!(%request_id, attempt, kind = %kind, error = %message, "translate_failed");
            }
        }

        result
    }
}

impl<B: InferenceBackend> Translator for TranslationClient<B> {
    async fn translate(
        &self,
        text: &str,
        source: &LanguageTag,
        target: &LanguageTag,
    ) -> TranslationResult {
        self.translate_with_retries(text, source, target, self.max_retries)
            .await
    }
}

/// `2^retry * unit`, saturating.
pub fn backoff_delay(unit: Duration, retry: u32) -> Duration {
    let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
    unit.saturating_mul(factor)
}

/// Expected body: a non-empty array whose first element carries `translation_text`.
fn parse_response(raw: &str) -> TranslationResult {
    let parsed: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            return TranslationResult::failure(
                FailureKind::UnexpectedFormat,
                format!("response is not JSON ({e}): {}", snippet(raw)),
            )
        }
    };

    let text = parsed
        .as_array()
        .and_then(|items| items.first())
        .and_then(|first| first.get("translation_text"))
        .and_then(|t| t.as_str());

    match text {
        Some(t) => TranslationResult::Success(t.to_string()),
        None => TranslationResult::failure(
            FailureKind::UnexpectedFormat,
            format!("missing translation_text: {}", snippet(raw)),
        ),
    }
}

fn snippet(raw: &str) -> String {
    raw.chars().take(200).collect()
}
