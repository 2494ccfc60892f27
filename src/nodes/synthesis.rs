//! The fan-in synthesis node.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{generate_bounded, keys};
use crate::channels::errors::{ErrorDetails, ErrorEvent};
use crate::format::{clean_response, format_market_price, format_weather};
use crate::intent::{Section, intents_from_value};
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::providers::{HistoryStore, MarketQuote, TextGenerator, WeatherReport, bounded};
use crate::state::StateSnapshot;
use crate::utils::collections::new_context_map;

/// Fans every branch result into one farmer-facing reply.
///
/// Context sections are included per the intent-set predicates, the
/// generated text is normalized through [`clean_response`], and the
/// completed turn is persisted to the history store. Generation failure here
/// is fatal for the run; a failed history save is logged and recorded but
/// never blocks the reply.
pub struct SynthesisNode {
    generator: Arc<dyn TextGenerator>,
    history: Arc<dyn HistoryStore>,
    timeout: Duration,
}

impl SynthesisNode {
    const INSTRUCTION: &'static str =
        "Farmer-facing assistant. Concise bullets and a final Action line.";

    pub fn new(
        generator: Arc<dyn TextGenerator>,
        history: Arc<dyn HistoryStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            generator,
            history,
            timeout,
        }
    }

    fn section_text(snapshot: &StateSnapshot, key: &str) -> String {
        snapshot
            .context_str(key)
            .unwrap_or_default()
            .to_string()
    }

    fn weather_text(snapshot: &StateSnapshot) -> String {
        match snapshot.context_value(keys::WEATHER).cloned() {
            Some(value) => match serde_json::from_value::<WeatherReport>(value) {
                Ok(report) => format_weather(&report),
                Err(_) => "Weather data unavailable.".to_string(),
            },
            None => "Weather data unavailable.".to_string(),
        }
    }

    fn market_text(snapshot: &StateSnapshot) -> String {
        match snapshot.context_value(keys::MARKET).cloned() {
            Some(value) => match serde_json::from_value::<MarketQuote>(value) {
                Ok(quote) => format_market_price(&quote),
                Err(_) => crate::format::MARKET_DATA_UNAVAILABLE.to_string(),
            },
            None => crate::format::MARKET_DATA_UNAVAILABLE.to_string(),
        }
    }

    fn sensors_text(snapshot: &StateSnapshot) -> String {
        snapshot
            .context_value(keys::SENSORS)
            .map(Value::to_string)
            .unwrap_or_default()
    }
}

#[async_trait]
impl Node for SynthesisNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let message = snapshot
            .context_str(keys::MESSAGE)
            .ok_or(NodeError::MissingInput { what: "message" })?
            .to_string();
        let user_id = snapshot
            .context_str(keys::USER_ID)
            .ok_or(NodeError::MissingInput { what: "user_id" })?
            .to_string();
        let session_id = snapshot
            .context_str(keys::SESSION_ID)
            .ok_or(NodeError::MissingInput { what: "session_id" })?
            .to_string();

        let intents = intents_from_value(snapshot.context_value(keys::INTENTS));

        let mut parts: Vec<(&str, String)> = Vec::new();
        if Section::History.wants(&intents) {
            parts.push(("History", Self::section_text(&snapshot, keys::HISTORY_SUMMARY)));
        }
        if Section::CropHealth.wants(&intents) {
            parts.push(("Crop health", Self::section_text(&snapshot, keys::CROP_ANALYSIS)));
        }
        if Section::DiseaseRisk.wants(&intents) {
            parts.push(("Disease", Self::section_text(&snapshot, keys::DISEASE_RISK)));
        }
        if Section::Plan.wants(&intents) {
            parts.push(("Plan", Self::section_text(&snapshot, keys::PLAN)));
        }
        if Section::Weather.wants(&intents) {
            parts.push(("Weather", Self::weather_text(&snapshot)));
        }
        if Section::Sensors.wants(&intents) {
            parts.push(("Sensors", Self::sensors_text(&snapshot)));
        }
        if Section::Market.wants(&intents) {
            parts.push(("Market price", Self::market_text(&snapshot)));
        }

        let profile = snapshot
            .context_value(keys::PROFILE)
            .cloned()
            .unwrap_or(Value::Null);
        let context_block = parts
            .iter()
            .map(|(label, text)| format!("{label}: {text}"))
            .collect::<Vec<_>>()
            .join("\n");
        let payload = format!(
            "User query: {message}\nFarmer profile: {profile}\nContext parts:\n{context_block}\n<= 180 words."
        );

        // The one failure in the graph with no degraded substitute: the
        // caller gets a single reported error instead of a partial reply.
        let generated =
            generate_bounded(&self.generator, self.timeout, Self::INSTRUCTION, &payload)
                .await
                .map_err(|err| NodeError::Generation {
                    message: err.to_string(),
                })?;
        let reply = clean_response(&generated);

        ctx.emit("synthesize", "reply generated")?;

        let mut errors: Vec<ErrorEvent> = Vec::new();
        if let Err(err) = bounded(
            "history",
            self.timeout,
            self.history
                .save_turn(&user_id, &session_id, &message, &reply),
        )
        .await
        {
            tracing::warn!(error = %err, "failed to persist chat turn");
            errors.push(
                ErrorEvent::node(&ctx.node_id, ctx.step, ErrorDetails::msg(err.to_string()))
                    .with_tag("persistence"),
            );
        }

        let mut context = new_context_map();
        context.insert(
            keys::FINAL_RESPONSE.to_string(),
            Value::String(reply.clone()),
        );

        let mut partial = NodePartial::new()
            .with_messages(vec![Message::assistant(&reply)])
            .with_context(context)
            .with_trace(vec!["synthesis".to_string()]);
        if !errors.is_empty() {
            partial = partial.with_errors(errors);
        }
        Ok(partial)
    }
}
