//! Fetch nodes: one provider call each, degraded on failure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{error_value, generate_bounded, keys, profile_from_snapshot};
use crate::channels::errors::{ErrorDetails, ErrorEvent};
use crate::format::render_history;
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::providers::{
    HistoryStore, MarketFeed, ProfileStore, SensorFeed, TextGenerator, WeatherFeed, bounded,
};
use crate::state::StateSnapshot;
use crate::utils::collections::new_context_map;

fn provider_error_event(node: &str, step: u64, message: String) -> ErrorEvent {
    ErrorEvent::node(node, step, ErrorDetails::msg(message)).with_tag("provider")
}

/// Restores recent conversation history and produces a brief summary of it.
///
/// The summary is one bounded generation call; its failure degrades to an
/// empty summary while the restored history is kept.
pub struct ChatHistoryNode {
    history: Arc<dyn HistoryStore>,
    generator: Arc<dyn TextGenerator>,
    limit: usize,
    timeout: Duration,
}

impl ChatHistoryNode {
    const SUMMARY_INSTRUCTION: &'static str = "Summarize this farmer-assistant chat briefly. \
        Keep goals, crops, and unresolved items. <= 120 words.";

    pub fn new(
        history: Arc<dyn HistoryStore>,
        generator: Arc<dyn TextGenerator>,
        limit: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            history,
            generator,
            limit,
            timeout,
        }
    }
}

#[async_trait]
impl Node for ChatHistoryNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let user_id = snapshot
            .context_str(keys::USER_ID)
            .ok_or(NodeError::MissingInput { what: "user_id" })?
            .to_string();
        let session_id = snapshot
            .context_str(keys::SESSION_ID)
            .ok_or(NodeError::MissingInput { what: "session_id" })?
            .to_string();

        let mut context = new_context_map();
        let mut errors: Vec<ErrorEvent> = Vec::new();

        match bounded(
            "history",
            self.timeout,
            self.history.recent(&user_id, &session_id, self.limit),
        )
        .await
        {
            Ok(messages) => {
                context.insert(keys::HISTORY.to_string(), serde_json::to_value(&messages)?);
                let summary = if messages.is_empty() {
                    String::new()
                } else {
                    let rendered = render_history(&messages);
                    match generate_bounded(
                        &self.generator,
                        self.timeout,
                        Self::SUMMARY_INSTRUCTION,
                        &rendered,
                    )
                    .await
                    {
                        Ok(text) => text.trim().to_string(),
                        Err(err) => {
                            tracing::warn!(error = %err, "history summary degraded");
                            errors.push(
                                ErrorEvent::node(
                                    &ctx.node_id,
                                    ctx.step,
                                    ErrorDetails::msg(err.to_string()),
                                )
                                .with_tag("generation"),
                            );
                            String::new()
                        }
                    }
                };
                context.insert(keys::HISTORY_SUMMARY.to_string(), Value::String(summary));
                ctx.emit("fetch", format!("restored {} history messages", messages.len()))?;
            }
            Err(err) => {
                tracing::warn!(error = %err, "chat history unavailable");
                context.insert(keys::HISTORY.to_string(), error_value(&err));
                context.insert(
                    keys::HISTORY_SUMMARY.to_string(),
                    Value::String(String::new()),
                );
                errors.push(provider_error_event(&ctx.node_id, ctx.step, err.to_string()));
                ctx.emit("fetch", "chat history unavailable")?;
            }
        }

        let mut partial = NodePartial::new()
            .with_context(context)
            .with_trace(vec!["chat_history".to_string()]);
        if !errors.is_empty() {
            partial = partial.with_errors(errors);
        }
        Ok(partial)
    }
}

/// Looks up the farmer's profile.
pub struct ProfileNode {
    profiles: Arc<dyn ProfileStore>,
    timeout: Duration,
}

impl ProfileNode {
    pub fn new(profiles: Arc<dyn ProfileStore>, timeout: Duration) -> Self {
        Self { profiles, timeout }
    }
}

#[async_trait]
impl Node for ProfileNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let user_id = snapshot
            .context_str(keys::USER_ID)
            .ok_or(NodeError::MissingInput { what: "user_id" })?
            .to_string();

        let mut context = new_context_map();
        let mut errors: Vec<ErrorEvent> = Vec::new();

        match bounded("profile", self.timeout, self.profiles.profile(&user_id)).await {
            Ok(profile) => {
                context.insert(keys::PROFILE.to_string(), serde_json::to_value(&profile)?);
                ctx.emit("fetch", format!("profile loaded for {}", profile.name))?;
            }
            Err(err) => {
                tracing::warn!(error = %err, "profile unavailable");
                context.insert(keys::PROFILE.to_string(), error_value(&err));
                errors.push(provider_error_event(&ctx.node_id, ctx.step, err.to_string()));
                ctx.emit("fetch", "profile unavailable")?;
            }
        }

        let mut partial = NodePartial::new()
            .with_context(context)
            .with_trace(vec!["profile".to_string()]);
        if !errors.is_empty() {
            partial = partial.with_errors(errors);
        }
        Ok(partial)
    }
}

/// Fetches the latest sensor reading.
pub struct SensorNode {
    sensors: Arc<dyn SensorFeed>,
    timeout: Duration,
}

impl SensorNode {
    pub fn new(sensors: Arc<dyn SensorFeed>, timeout: Duration) -> Self {
        Self { sensors, timeout }
    }
}

#[async_trait]
impl Node for SensorNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let user_id = snapshot
            .context_str(keys::USER_ID)
            .ok_or(NodeError::MissingInput { what: "user_id" })?
            .to_string();

        let mut context = new_context_map();
        let mut errors: Vec<ErrorEvent> = Vec::new();

        match bounded("sensors", self.timeout, self.sensors.latest(&user_id)).await {
            Ok(reading) => {
                context.insert(keys::SENSORS.to_string(), serde_json::to_value(&reading)?);
                ctx.emit("fetch", "sensor reading loaded")?;
            }
            Err(err) => {
                tracing::warn!(error = %err, "sensor feed unavailable");
                context.insert(keys::SENSORS.to_string(), error_value(&err));
                errors.push(provider_error_event(&ctx.node_id, ctx.step, err.to_string()));
                ctx.emit("fetch", "sensor feed unavailable")?;
            }
        }

        let mut partial = NodePartial::new()
            .with_context(context)
            .with_trace(vec!["sensors".to_string()]);
        if !errors.is_empty() {
            partial = partial.with_errors(errors);
        }
        Ok(partial)
    }
}

/// Fetches weather for the farmer's location.
///
/// Prefers the location extracted from the message; falls back to the
/// profile location, then to "Unknown" (the feed tolerates unresolvable
/// locations by contract).
pub struct WeatherNode {
    weather: Arc<dyn WeatherFeed>,
    timeout: Duration,
}

impl WeatherNode {
    pub fn new(weather: Arc<dyn WeatherFeed>, timeout: Duration) -> Self {
        Self { weather, timeout }
    }
}

#[async_trait]
impl Node for WeatherNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let location = snapshot
            .context_str(keys::LOCATION)
            .filter(|loc| !loc.is_empty())
            .map(str::to_string)
            .or_else(|| profile_from_snapshot(&snapshot).map(|p| p.location))
            .unwrap_or_else(|| "Unknown".to_string());

        let mut context = new_context_map();
        let mut errors: Vec<ErrorEvent> = Vec::new();

        match bounded("weather", self.timeout, self.weather.report(&location)).await {
            Ok(report) => {
                context.insert(keys::WEATHER.to_string(), serde_json::to_value(&report)?);
                ctx.emit("fetch", format!("weather loaded for {location}"))?;
            }
            Err(err) => {
                tracing::warn!(error = %err, location, "weather unavailable");
                context.insert(keys::WEATHER.to_string(), error_value(&err));
                errors.push(provider_error_event(&ctx.node_id, ctx.step, err.to_string()));
                ctx.emit("fetch", "weather unavailable")?;
            }
        }

        let mut partial = NodePartial::new()
            .with_context(context)
            .with_trace(vec!["weather".to_string()]);
        if !errors.is_empty() {
            partial = partial.with_errors(errors);
        }
        Ok(partial)
    }
}

/// Fetches a market-price quote for the crop under analysis.
pub struct MarketNode {
    market: Arc<dyn MarketFeed>,
    timeout: Duration,
}

impl MarketNode {
    pub fn new(market: Arc<dyn MarketFeed>, timeout: Duration) -> Self {
        Self { market, timeout }
    }
}

#[async_trait]
impl Node for MarketNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let commodity = super::crop_under_review(&snapshot);
        let profile = profile_from_snapshot(&snapshot);
        let state = profile
            .as_ref()
            .map(|p| p.state.clone())
            .unwrap_or_else(|| "Unknown".to_string());
        let market = profile
            .as_ref()
            .map(|p| p.location.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        let mut context = new_context_map();
        let mut errors: Vec<ErrorEvent> = Vec::new();

        match bounded(
            "market",
            self.timeout,
            self.market.quote(&commodity, &state, &market),
        )
        .await
        {
            Ok(quote) => {
                context.insert(keys::MARKET.to_string(), serde_json::to_value(&quote)?);
                ctx.emit("fetch", format!("market quote loaded for {commodity}"))?;
            }
            Err(err) => {
                tracing::warn!(error = %err, commodity, "market feed unavailable");
                context.insert(keys::MARKET.to_string(), error_value(&err));
                errors.push(provider_error_event(&ctx.node_id, ctx.step, err.to_string()));
                ctx.emit("fetch", "market feed unavailable")?;
            }
        }

        let mut partial = NodePartial::new()
            .with_context(context)
            .with_trace(vec!["market".to_string()]);
        if !errors.is_empty() {
            partial = partial.with_errors(errors);
        }
        Ok(partial)
    }
}
