//! HTTP client for the agricultural market-price API.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{MarketFeed, MarketQuote, MarketRecord, ProviderError};

/// Default upstream endpoint.
pub const DEFAULT_MARKET_API_URL: &str = "https://agmarket-api-main.onrender.com/request";

/// `reqwest`-backed [`MarketFeed`].
///
/// Transport and HTTP-status failures surface as
/// [`ProviderError::Unavailable`]; the market node degrades them into an
/// error-tagged field so the rest of the run proceeds.
#[derive(Clone, Debug)]
pub struct AgmarketClient {
    http: reqwest::Client,
    base_url: String,
}

impl AgmarketClient {
    /// Build a client with a bounded request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Unavailable {
                provider: "market",
                message: e.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl MarketFeed for AgmarketClient {
    async fn quote(
        &self,
        commodity: &str,
        state: &str,
        market: &str,
    ) -> Result<MarketQuote, ProviderError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("commodity", commodity),
                ("state", state),
                ("market", market),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProviderError::Unavailable {
                provider: "market",
                message: e.to_string(),
            })?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed {
                provider: "market",
                message: e.to_string(),
            })?;

        // The upstream answers either with a bare array of rows or an
        // object wrapping them under "data".
        let data: Vec<MarketRecord> = match &payload {
            Value::Array(_) => serde_json::from_value(payload.clone())?,
            Value::Object(map) if map.contains_key("data") => {
                serde_json::from_value(map["data"].clone())?
            }
            _ => Vec::new(),
        };

        Ok(MarketQuote {
            commodity: commodity.to_string(),
            state: state.to_string(),
            market: market.to_string(),
            data,
            error: None,
        })
    }
}
