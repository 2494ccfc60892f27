//! Reasoning nodes: one generation call each, degraded on failure.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{crop_under_review, generate_bounded, keys, profile_from_snapshot};
use crate::channels::errors::{ErrorDetails, ErrorEvent};
use crate::intent::{Intent, intents_to_value, parse_intents};
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::providers::TextGenerator;
use crate::state::StateSnapshot;
use crate::utils::collections::new_context_map;

fn generation_error_event(node: &str, step: u64, message: String) -> ErrorEvent {
    ErrorEvent::node(node, step, ErrorDetails::msg(message)).with_tag("generation")
}

fn summary_of(snapshot: &StateSnapshot) -> String {
    snapshot
        .context_str(keys::HISTORY_SUMMARY)
        .unwrap_or_default()
        .to_string()
}

fn field_json(snapshot: &StateSnapshot, key: &str) -> Value {
    snapshot.context_value(key).cloned().unwrap_or(Value::Null)
}

/// Classifies the farmer's message into one or more intents.
///
/// A failed classification degrades to `{advice}` so every downstream
/// section predicate still has a set to evaluate.
pub struct IntentNode {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl IntentNode {
    const INSTRUCTION: &'static str = "You triage farmer queries. Reply with every intent that \
        applies, comma separated, from: status | weather | disease | plan | market | advice.";

    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }
}

#[async_trait]
impl Node for IntentNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let message = snapshot
            .context_str(keys::MESSAGE)
            .ok_or(NodeError::MissingInput { what: "message" })?;
        let payload = format!("User message: {message}");

        let mut errors: Vec<ErrorEvent> = Vec::new();
        let intents: BTreeSet<Intent> =
            match generate_bounded(&self.generator, self.timeout, Self::INSTRUCTION, &payload)
                .await
            {
                Ok(raw) => parse_intents(&raw),
                Err(err) => {
                    tracing::warn!(error = %err, "intent classification degraded to advice");
                    errors.push(generation_error_event(&ctx.node_id, ctx.step, err.to_string()));
                    [Intent::Advice].into_iter().collect()
                }
            };

        ctx.emit(
            "classify",
            format!(
                "intents: {}",
                intents
                    .iter()
                    .map(Intent::as_str)
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        )?;

        let mut context = new_context_map();
        context.insert(keys::INTENTS.to_string(), intents_to_value(&intents));

        let mut partial = NodePartial::new()
            .with_context(context)
            .with_trace(vec!["intent".to_string()]);
        if !errors.is_empty() {
            partial = partial.with_errors(errors);
        }
        Ok(partial)
    }
}

/// Extracts the crop and location mentioned in the message.
///
/// Values the model reports as unknown are simply omitted; downstream
/// readers fall back to the profile.
pub struct ContextExtractNode {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl ContextExtractNode {
    const INSTRUCTION: &'static str = "Extract the crop and the location mentioned in the \
        farmer's message. Reply exactly as: crop=<name or unknown>; location=<place or unknown>.";

    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    fn parse(raw: &str) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        for part in raw.split(';') {
            let mut kv = part.splitn(2, '=');
            let (Some(key), Some(value)) = (kv.next(), kv.next()) else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() || value.eq_ignore_ascii_case("unknown") {
                continue;
            }
            match key.trim().to_ascii_lowercase().as_str() {
                "crop" => fields.push((keys::CROP, value.to_lowercase())),
                "location" => fields.push((keys::LOCATION, value.to_string())),
                _ => {}
            }
        }
        fields
    }
}

#[async_trait]
impl Node for ContextExtractNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let message = snapshot
            .context_str(keys::MESSAGE)
            .ok_or(NodeError::MissingInput { what: "message" })?;
        let payload = format!("User message: {message}");

        let mut context = new_context_map();
        let mut errors: Vec<ErrorEvent> = Vec::new();

        match generate_bounded(&self.generator, self.timeout, Self::INSTRUCTION, &payload).await {
            Ok(raw) => {
                for (key, value) in Self::parse(&raw) {
                    context.insert(key.to_string(), Value::String(value));
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "context extraction degraded to profile defaults");
                errors.push(generation_error_event(&ctx.node_id, ctx.step, err.to_string()));
            }
        }

        ctx.emit("classify", "crop/location extraction finished")?;

        let mut partial = NodePartial::new()
            .with_context(context)
            .with_trace(vec!["context_extract".to_string()]);
        if !errors.is_empty() {
            partial = partial.with_errors(errors);
        }
        Ok(partial)
    }
}

/// Compares sensor readings against inferred ideals for the crop.
pub struct CropHealthNode {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl CropHealthNode {
    const INSTRUCTION: &'static str = "You are an expert agronomist. From your knowledge, infer \
        ideal environmental ranges for the specified crop (temperature, humidity, soil moisture, \
        rainfall if relevant). Compare those inferred ideals with the provided sensor readings. \
        Point out any risks or deviations and provide practical, field-ready advice. Be concise \
        and avoid hedging.";

    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }
}

#[async_trait]
impl Node for CropHealthNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let crop = crop_under_review(&snapshot);
        let payload = format!(
            "Recent chat summary: {}\nCrop: {}\nFarmer context: {}\nSensors: {}\n\
             Output: 3-5 bullets and a line starting with 'Action:'",
            summary_of(&snapshot),
            crop,
            field_json(&snapshot, keys::PROFILE),
            field_json(&snapshot, keys::SENSORS),
        );

        let mut errors: Vec<ErrorEvent> = Vec::new();
        let analysis =
            match generate_bounded(&self.generator, self.timeout, Self::INSTRUCTION, &payload)
                .await
            {
                Ok(text) => text.trim().to_string(),
                Err(err) => {
                    tracing::warn!(error = %err, crop, "crop health analysis degraded");
                    errors.push(generation_error_event(&ctx.node_id, ctx.step, err.to_string()));
                    String::new()
                }
            };

        ctx.emit("analyze", format!("crop health assessed for {crop}"))?;

        let mut context = new_context_map();
        context.insert(keys::CROP_ANALYSIS.to_string(), Value::String(analysis));

        let mut partial = NodePartial::new()
            .with_context(context)
            .with_trace(vec!["crop_health".to_string()]);
        if !errors.is_empty() {
            partial = partial.with_errors(errors);
        }
        Ok(partial)
    }
}

/// Estimates near-term disease risks for the crop.
pub struct DiseaseRiskNode {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl DiseaseRiskNode {
    const INSTRUCTION: &'static str =
        "Plant pathologist. Estimate near-term disease risks and preventive actions.";

    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }
}

#[async_trait]
impl Node for DiseaseRiskNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let crop = crop_under_review(&snapshot);
        let payload = format!(
            "Recent chat summary: {}\nCrop: {}\nSensors: {}\nWeather: {}",
            summary_of(&snapshot),
            crop,
            field_json(&snapshot, keys::SENSORS),
            field_json(&snapshot, keys::WEATHER),
        );

        let mut errors: Vec<ErrorEvent> = Vec::new();
        let assessment =
            match generate_bounded(&self.generator, self.timeout, Self::INSTRUCTION, &payload)
                .await
            {
                Ok(text) => text.trim().to_string(),
                Err(err) => {
                    tracing::warn!(error = %err, crop, "disease risk assessment degraded");
                    errors.push(generation_error_event(&ctx.node_id, ctx.step, err.to_string()));
                    String::new()
                }
            };

        ctx.emit("analyze", format!("disease risk assessed for {crop}"))?;

        let mut context = new_context_map();
        context.insert(keys::DISEASE_RISK.to_string(), Value::String(assessment));

        let mut partial = NodePartial::new()
            .with_context(context)
            .with_trace(vec!["disease_risk".to_string()]);
        if !errors.is_empty() {
            partial = partial.with_errors(errors);
        }
        Ok(partial)
    }
}

/// Prepares a near-term seasonal operations plan.
pub struct SeasonPlanNode {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl SeasonPlanNode {
    const INSTRUCTION: &'static str = "You prepare seasonal crop operation plans.";

    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }
}

#[async_trait]
impl Node for SeasonPlanNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let crop = crop_under_review(&snapshot);
        let location = snapshot
            .context_str(keys::LOCATION)
            .map(str::to_string)
            .or_else(|| profile_from_snapshot(&snapshot).map(|p| p.location))
            .unwrap_or_else(|| "Unknown".to_string());
        let payload = format!(
            "Crop: {}\nLocation: {}\nWeather summary: {}\n\
             Output: near-term 2-4 week plan (sow/fertilize/irrigate/spray/harvest cues).",
            crop,
            location,
            field_json(&snapshot, keys::WEATHER),
        );

        let mut errors: Vec<ErrorEvent> = Vec::new();
        let plan =
            match generate_bounded(&self.generator, self.timeout, Self::INSTRUCTION, &payload)
                .await
            {
                Ok(text) => text.trim().to_string(),
                Err(err) => {
                    tracing::warn!(error = %err, crop, "season plan degraded");
                    errors.push(generation_error_event(&ctx.node_id, ctx.step, err.to_string()));
                    String::new()
                }
            };

        ctx.emit("analyze", format!("season plan prepared for {crop}"))?;

        let mut context = new_context_map();
        context.insert(keys::PLAN.to_string(), Value::String(plan));

        let mut partial = NodePartial::new()
            .with_context(context)
            .with_trace(vec!["season_plan".to_string()]);
        if !errors.is_empty() {
            partial = partial.with_errors(errors);
        }
        Ok(partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_parse_skips_unknowns() {
        let fields = ContextExtractNode::parse("crop=Wheat; location=unknown");
        assert_eq!(fields, vec![(keys::CROP, "wheat".to_string())]);
    }

    #[test]
    fn extraction_parse_reads_both_fields() {
        let fields = ContextExtractNode::parse("crop=maize; location=Kota");
        assert_eq!(
            fields,
            vec![
                (keys::CROP, "maize".to_string()),
                (keys::LOCATION, "Kota".to_string()),
            ]
        );
    }

    #[test]
    fn extraction_parse_tolerates_garbage() {
        assert!(ContextExtractNode::parse("no structured output").is_empty());
    }
}
