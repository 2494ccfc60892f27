//! External collaborator seams.
//!
//! The orchestration core consumes every external capability through an
//! async trait defined here: text generation, profile store, sensor feed,
//! weather feed, market-price feed, and the chat-history store. Each call is
//! independently failable with [`ProviderError`]; nodes bound calls with
//! [`bounded`] so a hung collaborator degrades instead of stalling the run.
//!
//! Shipped implementations:
//! - [`mock`] — canned/simulated providers for tests and offline runs
//! - [`market`] — `reqwest`-backed market-price API client
//! - [`history`] — in-memory chat-history store
//! - [`history_sqlite`] — durable sqlite chat-history store (feature
//!   `sqlite`, default on)

pub mod history;
#[cfg(feature = "sqlite")]
pub mod history_sqlite;
pub mod market;
pub mod mock;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of an external collaborator call.
#[derive(Debug, Error, Diagnostic)]
pub enum ProviderError {
    /// The call exceeded its deadline.
    #[error("{provider} timed out after {timeout_ms} ms")]
    #[diagnostic(code(cropflow::provider::timeout))]
    Timeout {
        provider: &'static str,
        timeout_ms: u64,
    },

    /// The collaborator could not be reached or refused the call.
    #[error("{provider} unavailable: {message}")]
    #[diagnostic(code(cropflow::provider::unavailable))]
    Unavailable {
        provider: &'static str,
        message: String,
    },

    /// The collaborator answered with a payload we cannot interpret.
    #[error("{provider} returned a malformed payload: {message}")]
    #[diagnostic(code(cropflow::provider::malformed))]
    Malformed {
        provider: &'static str,
        message: String,
    },

    /// JSON (de)serialization failure at the seam.
    #[error(transparent)]
    #[diagnostic(code(cropflow::provider::serde_json))]
    Serde(#[from] serde_json::Error),

    /// History database failure.
    #[cfg(feature = "sqlite")]
    #[error("history database error: {0}")]
    #[diagnostic(code(cropflow::provider::database))]
    Database(#[from] sqlx::Error),
}

/// Bound a provider future by a deadline, mapping elapse to
/// [`ProviderError::Timeout`].
pub async fn bounded<F, T>(
    provider: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout {
            provider,
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

// ============================================================================
// Record types
// ============================================================================

/// A farmer's stored profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FarmerProfile {
    pub farmer_id: String,
    pub name: String,
    pub location: String,
    pub state: String,
    pub land_size_acres: f64,
    pub crops: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// One reading from the field sensor array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub temperature: f64,
    pub humidity: f64,
    pub soil_moisture: i64,
    pub rainfall_mm: f64,
    pub gas_level: i64,
    pub timestamp: DateTime<Utc>,
}

/// Current weather conditions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp_c: f64,
    pub humidity: f64,
    pub rain_mm: f64,
}

/// One forecast window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub date: String,
    pub summary: String,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub rain_mm: f64,
}

/// Weather for a location: best-effort, never raised for an unknown place —
/// missing pieces are represented, not thrown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now: Option<CurrentConditions>,
    #[serde(default)]
    pub forecast: Vec<ForecastEntry>,
    /// Set when forecast retrieval failed; rendered as an error line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_error: Option<String>,
}

/// One row of the market-price API response. Field names follow the wire
/// format of the upstream service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketRecord {
    #[serde(rename = "Commodity")]
    pub commodity: String,
    #[serde(rename = "Market")]
    pub market: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Min Price")]
    pub min_price: String,
    #[serde(rename = "Max Price")]
    pub max_price: String,
    #[serde(rename = "Modal Price")]
    pub modal_price: String,
}

/// A market-price lookup result: data rows, or an error tag from the API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub commodity: String,
    pub state: String,
    pub market: String,
    #[serde(default)]
    pub data: Vec<MarketRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One persisted chat message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub user_id: String,
    pub session_id: String,
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Collaborator traits
// ============================================================================

/// Text generation: one instruction/payload pair in, generated text out.
///
/// The engine treats this as an opaque capability; implementations may call
/// any model. Mirrors the single-call `invoke` shape of LLM client layers.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, instruction: &str, payload: &str) -> Result<String, ProviderError>;
}

/// Farmer profile lookup.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn profile(&self, user_id: &str) -> Result<FarmerProfile, ProviderError>;
}

/// Latest reading from the farmer's sensor array.
#[async_trait]
pub trait SensorFeed: Send + Sync {
    async fn latest(&self, user_id: &str) -> Result<SensorReading, ProviderError>;
}

/// Weather for a location. Must tolerate unknown locations by returning a
/// best-effort or error-tagged report rather than failing.
#[async_trait]
pub trait WeatherFeed: Send + Sync {
    async fn report(&self, location: &str) -> Result<WeatherReport, ProviderError>;
}

/// Market price lookup for a commodity in a state/market.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    async fn quote(
        &self,
        commodity: &str,
        state: &str,
        market: &str,
    ) -> Result<MarketQuote, ProviderError>;
}

/// Chat-history persistence, keyed by (user, session).
///
/// A turn's two messages must be appended atomically: two concurrent turns
/// for the same session never interleave a partial turn.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// The most recent `limit` messages, oldest first.
    async fn recent(
        &self,
        user_id: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, ProviderError>;

    /// Persist one completed turn (user message + assistant reply).
    async fn save_turn(
        &self,
        user_id: &str,
        session_id: &str,
        user_message: &str,
        assistant_message: &str,
    ) -> Result<(), ProviderError>;
}
