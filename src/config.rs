//! Process-wide configuration, resolved once at startup.
//! Token and endpoint are mandatory; everything else has a default.

use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

pub const ENV_API_TOKEN: &str = "TRANSLATE_API_TOKEN";
pub const ENV_ENDPOINT: &str = "TRANSLATE_ENDPOINT";
pub const ENV_MAX_RETRIES: &str = "TRANSLATE_MAX_RETRIES";
pub const ENV_TIMEOUT_SECS: &str = "TRANSLATE_TIMEOUT_SECS";
pub const ENV_BACKOFF_MS: &str = "TRANSLATE_BACKOFF_MS";
pub const ENV_MAX_LENGTH: &str = "TRANSLATE_MAX_LENGTH";
pub const ENV_TEMPERATURE: &str = "TRANSLATE_TEMPERATURE";
pub const ENV_DO_SAMPLE: &str = "TRANSLATE_DO_SAMPLE";
pub const ENV_STEP_DELAY_MS: &str = "TRANSLATE_STEP_DELAY_MS";
pub const ENV_CACHE_CAPACITY: &str = "TRANSLATE_CACHE_CAPACITY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration missing: {0} is not set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Decoding parameters forwarded verbatim in every request body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodingParams {
    pub max_length: u32,
    pub temperature: f32,
    pub do_sample: bool,
}

impl Default for DecodingParams {
    fn default() -> Self {
        Self {
            max_length: 400,
            temperature: 0.7,
            do_sample: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_token: String,
    pub endpoint: String,
    /// Total attempts made when every request times out.
    pub max_retries: u32,
    pub request_timeout: Duration,
    /// Backoff delay before retry `n` is `2^n * backoff_unit`.
    pub backoff_unit: Duration,
    pub decoding: DecodingParams,
    /// Pacing delay the batch runner sleeps between steps.
    pub step_delay: Duration,
    /// LRU capacity for the translation cache; 0 disables caching.
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
}

impl Config {
    /// Minimal config with defaults for everything but the mandatory fields.
    pub fn new(api_token: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            endpoint: endpoint.into(),
            max_retries: 3,
            request_timeout: Duration::from_secs(30),
            backoff_unit: Duration::from_millis(1000),
            decoding: DecodingParams::default(),
            step_delay: Duration::from_millis(500),
            cache_capacity: 512,
            cache_ttl: Duration::from_secs(3600),
        }
    }

    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let api_token = required(ENV_API_TOKEN)?;
        let endpoint = required(ENV_ENDPOINT)?;
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: ENV_ENDPOINT,
                value: endpoint,
                reason: "expected an http(s) URL".into(),
            });
        }

        let mut config = Self::new(api_token, endpoint);

        if let Some(v) = parse_opt::<u32, _>(&lookup, ENV_MAX_RETRIES)? {
            config.max_retries = v;
        }
        if let Some(v) = parse_opt::<u64, _>(&lookup, ENV_TIMEOUT_SECS)? {
            config.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_opt::<u64, _>(&lookup, ENV_BACKOFF_MS)? {
            config.backoff_unit = Duration::from_millis(v);
        }
        if let Some(v) = parse_opt::<u32, _>(&lookup, ENV_MAX_LENGTH)? {
            config.decoding.max_length = v;
        }
        if let Some(v) = parse_opt::<f32, _>(&lookup, ENV_TEMPERATURE)? {
            config.decoding.temperature = v;
        }
        if let Some(v) = parse_opt::<bool, _>(&lookup, ENV_DO_SAMPLE)? {
            config.decoding.do_sample = v;
        }
        if let Some(v) = parse_opt::<u64, _>(&lookup, ENV_STEP_DELAY_MS)? {
            config.step_delay = Duration::from_millis(v);
        }
        if let Some(v) = parse_opt::<usize, _>(&lookup, ENV_CACHE_CAPACITY)? {
            config.cache_capacity = v;
        }

        info!(
            endpoint = %config.endpoint,
            max_retries = config.max_retries,
            timeout_secs = config.request_timeout.as_secs(),
            "config_loaded"
        );
        Ok(config)
    }
}

fn parse_opt<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

fn load_dotenv() {
    for env_file in [".env.local", ".env"] {
        if Path::new(env_file).exists() {
            match dotenv::from_filename(env_file) {
                Ok(_) => {
                    info!(file = env_file, "dotenv_loaded");
                    return;
                }
                Err(e) => warn!(file = env_file, error = %e, "dotenv load failed"),
            }
        }
    }
}
