//! Graph wiring and the caller-facing entry point.
//!
//! [`AdvisoryWorkflow`] compiles the advisory graph once (per process, or
//! per configuration change) and serves any number of concurrent
//! [`submit_message`](AdvisoryWorkflow::submit_message) calls against it:
//! each call builds a fresh run state, invokes the compiled app, and reads
//! the final response field.

use std::sync::Arc;

use serde_json::json;
use tracing::instrument;

use crate::app::App;
use crate::config::Settings;
use crate::graphs::{GraphBuilder, GraphCompileError};
use crate::nodes::{
    ChatHistoryNode, ContextExtractNode, CropHealthNode, DiseaseRiskNode, IntentNode, MarketNode,
    ProfileNode, SeasonPlanNode, SensorNode, SynthesisNode, WeatherNode, keys,
};
use crate::providers::{
    HistoryStore, MarketFeed, ProfileStore, SensorFeed, TextGenerator, WeatherFeed,
};
use crate::runtimes::{RunnerError, RuntimeConfig};
use crate::state::RunState;
use crate::types::NodeKind;

/// Returned when the terminal field was never written.
pub const FALLBACK_REPLY: &str = "Sorry, something went wrong.";

/// Returned when the run itself failed.
pub const ERROR_REPLY: &str =
    "Sorry, something went wrong while answering that. Please try again.";

/// The external collaborators the workflow is wired with.
#[derive(Clone)]
pub struct Collaborators {
    pub generator: Arc<dyn TextGenerator>,
    pub profiles: Arc<dyn ProfileStore>,
    pub sensors: Arc<dyn SensorFeed>,
    pub weather: Arc<dyn WeatherFeed>,
    pub market: Arc<dyn MarketFeed>,
    pub history: Arc<dyn HistoryStore>,
}

/// The compiled advisory workflow.
pub struct AdvisoryWorkflow {
    app: App,
}

impl AdvisoryWorkflow {
    /// Compile the advisory graph against the given collaborators.
    ///
    /// Topology (Start/End virtual):
    ///
    /// ```text
    /// Start -> chat_history -> {intent, context_extract} -> profile
    /// profile -> {sensors, weather, market}
    /// sensors -> crop_health            sensors, weather -> disease_risk
    /// weather -> season_plan
    /// {crop_health, disease_risk, season_plan, market} -> synthesis -> End
    /// ```
    pub fn new(
        collaborators: Collaborators,
        settings: &Settings,
    ) -> Result<Self, GraphCompileError> {
        let Collaborators {
            generator,
            profiles,
            sensors,
            weather,
            market,
            history,
        } = collaborators;

        let provider_timeout = settings.provider_timeout;
        let generation_timeout = settings.generation_timeout;

        let app = GraphBuilder::new()
            .add_node(
                "chat_history".into(),
                ChatHistoryNode::new(
                    history.clone(),
                    generator.clone(),
                    settings.history_limit,
                    provider_timeout,
                ),
            )
            .add_node(
                "intent".into(),
                IntentNode::new(generator.clone(), generation_timeout),
            )
            .add_node(
                "context_extract".into(),
                ContextExtractNode::new(generator.clone(), generation_timeout),
            )
            .add_node(
                "profile".into(),
                ProfileNode::new(profiles, provider_timeout),
            )
            .add_node("sensors".into(), SensorNode::new(sensors, provider_timeout))
            .add_node("weather".into(), WeatherNode::new(weather, provider_timeout))
            .add_node("market".into(), MarketNode::new(market, provider_timeout))
            .add_node(
                "crop_health".into(),
                CropHealthNode::new(generator.clone(), generation_timeout),
            )
            .add_node(
                "disease_risk".into(),
                DiseaseRiskNode::new(generator.clone(), generation_timeout),
            )
            .add_node(
                "season_plan".into(),
                SeasonPlanNode::new(generator.clone(), generation_timeout),
            )
            .add_node(
                "synthesis".into(),
                SynthesisNode::new(generator, history, generation_timeout),
            )
            .add_edge(NodeKind::Start, "chat_history".into())
            .add_edge("chat_history".into(), "intent".into())
            .add_edge("chat_history".into(), "context_extract".into())
            .add_edge("intent".into(), "profile".into())
            .add_edge("context_extract".into(), "profile".into())
            .add_edge("profile".into(), "sensors".into())
            .add_edge("profile".into(), "weather".into())
            .add_edge("profile".into(), "market".into())
            .add_edge("sensors".into(), "crop_health".into())
            .add_edge("sensors".into(), "disease_risk".into())
            .add_edge("weather".into(), "disease_risk".into())
            .add_edge("weather".into(), "season_plan".into())
            .add_edge("crop_health".into(), "synthesis".into())
            .add_edge("disease_risk".into(), "synthesis".into())
            .add_edge("season_plan".into(), "synthesis".into())
            .add_edge("market".into(), "synthesis".into())
            .add_edge("synthesis".into(), NodeKind::End)
            .with_runtime_config(
                RuntimeConfig::default().with_concurrency_limit(settings.concurrency_limit),
            )
            .compile()?;

        Ok(Self { app })
    }

    /// The compiled app, for direct invocation or inspection.
    #[must_use]
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Answer one farmer message.
    ///
    /// Always returns a body: on a run failure the caller receives a short
    /// error string, never a panic or a stack trace.
    #[instrument(skip(self, message))]
    pub async fn submit_message(&self, user_id: &str, session_id: &str, message: &str) -> String {
        match self.run(user_id, session_id, message).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(error = %err, "advisory run failed");
                ERROR_REPLY.to_string()
            }
        }
    }

    async fn run(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<String, RunnerError> {
        let initial = RunState::builder()
            .with_user_message(message)
            .with_context(keys::USER_ID, json!(user_id))
            .with_context(keys::SESSION_ID, json!(session_id))
            .with_context(keys::MESSAGE, json!(message))
            .build();

        let final_state = self.app.invoke(initial).await?;
        let snapshot = final_state.snapshot();
        Ok(snapshot
            .context_str(keys::FINAL_RESPONSE)
            .map(str::to_string)
            .unwrap_or_else(|| FALLBACK_REPLY.to_string()))
    }
}
