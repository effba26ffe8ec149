//! Startup configuration
//!
//! Everything is read from the environment once. A missing credential stops
//! the process before the server binds.

use crate::llm::GenerationConfig;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_SESSION_TTL_SECS: u64 = 1800;

/// Fatal configuration problems
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set. Configure the API key before starting the assistant.")]
    MissingCredential(&'static str),
    #[error("Invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub port: u16,
    pub request_timeout: Duration,
    /// Idle time after which a session and its transcript are dropped
    pub session_ttl: Duration,
    pub generation: GenerationConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingCredential("GEMINI_API_KEY"))?;

        let defaults = GenerationConfig::default();
        let generation = GenerationConfig {
            temperature: parse_var(&lookup, "SOLARTECH_TEMPERATURE", defaults.temperature)?,
            top_p: parse_var(&lookup, "SOLARTECH_TOP_P", defaults.top_p)?,
            top_k: parse_var(&lookup, "SOLARTECH_TOP_K", defaults.top_k)?,
            max_output_tokens: parse_var(
                &lookup,
                "SOLARTECH_MAX_OUTPUT_TOKENS",
                defaults.max_output_tokens,
            )?,
        };

        let session_ttl = parse_var(
            &lookup,
            "SOLARTECH_SESSION_TTL_SECS",
            DEFAULT_SESSION_TTL_SECS,
        )?;
        if session_ttl == 0 {
            return Err(ConfigError::Invalid {
                var: "SOLARTECH_SESSION_TTL_SECS",
                value: session_ttl.to_string(),
                reason: "must be at least one second".to_string(),
            });
        }

        Ok(Self {
            api_key,
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: lookup("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            port: parse_var(&lookup, "SOLARTECH_PORT", DEFAULT_PORT)?,
            request_timeout: Duration::from_secs(parse_var(
                &lookup,
                "SOLARTECH_REQUEST_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
            session_ttl: Duration::from_secs(session_ttl),
            generation,
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
