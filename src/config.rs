//! Environment-driven configuration.
//!
//! Settings are loaded once at startup; a missing required credential is a
//! fatal [`ConfigError`] and the process must not start.

use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use crate::providers::market::DEFAULT_MARKET_API_URL;

/// Fatal configuration problems detected at startup.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("missing required environment variable {name}")]
    #[diagnostic(
        code(cropflow::config::missing_var),
        help("Set the variable in the environment or a .env file.")
    )]
    MissingVar { name: &'static str },

    #[error("environment variable {name} has invalid value {value:?}")]
    #[diagnostic(code(cropflow::config::invalid_var))]
    InvalidVar { name: &'static str, value: String },
}

/// Runtime settings for the advisory workflow.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Credential handed to the real text-generation client.
    pub generation_api_key: String,
    /// Deadline for one text-generation call.
    pub generation_timeout: Duration,
    /// Deadline for one data-provider call.
    pub provider_timeout: Duration,
    /// Messages of history restored per run.
    pub history_limit: usize,
    /// Market-price API endpoint.
    pub market_api_url: String,
    /// Superstep concurrency; `None` means host parallelism.
    pub concurrency_limit: Option<usize>,
}

impl Settings {
    /// Load settings from the environment (and `.env`, if present).
    ///
    /// `CROPFLOW_GENERATION_API_KEY` is required; everything else has a
    /// default.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let generation_api_key = std::env::var("CROPFLOW_GENERATION_API_KEY")
            .map_err(|_| ConfigError::MissingVar {
                name: "CROPFLOW_GENERATION_API_KEY",
            })?;

        Ok(Self {
            generation_api_key,
            generation_timeout: Duration::from_millis(parse_or(
                "CROPFLOW_GENERATION_TIMEOUT_MS",
                20_000,
            )?),
            provider_timeout: Duration::from_millis(parse_or(
                "CROPFLOW_PROVIDER_TIMEOUT_MS",
                10_000,
            )?),
            history_limit: parse_or("CROPFLOW_HISTORY_LIMIT", 20)? as usize,
            market_api_url: std::env::var("CROPFLOW_MARKET_API_URL")
                .unwrap_or_else(|_| DEFAULT_MARKET_API_URL.to_string()),
            concurrency_limit: optional_parse("CROPFLOW_CONCURRENCY")?.map(|n| n as usize),
        })
    }

    /// Settings for runs wired entirely with injected collaborators (tests,
    /// offline demos); no credential required.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            generation_api_key: String::new(),
            generation_timeout: Duration::from_secs(20),
            provider_timeout: Duration::from_secs(10),
            history_limit: 20,
            market_api_url: DEFAULT_MARKET_API_URL.to_string(),
            concurrency_limit: None,
        }
    }
}

fn parse_or(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    Ok(optional_parse(name)?.unwrap_or(default))
}

fn optional_parse(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar { name, value }),
        Err(_) => Ok(None),
    }
}
