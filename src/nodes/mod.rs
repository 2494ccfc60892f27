//! The advisory node set.
//!
//! Two families, matching the two shapes of work in the graph:
//!
//! - **Fetch nodes** ([`fetch`]): call one data provider bounded by a
//!   timeout, wrap the result under a named context field, append one trace
//!   entry. A provider failure substitutes an error-tagged value so sibling
//!   branches and the synthesis node proceed with partial information.
//! - **Reasoning nodes** ([`reasoning`], [`synthesis`]): build a two-part
//!   prompt (fixed instruction + state-derived payload), invoke the text
//!   generator exactly once, post-process, and write one output field. Only
//!   the synthesis node's generation failure is fatal to the run.

pub mod fetch;
pub mod reasoning;
pub mod synthesis;

pub use fetch::{ChatHistoryNode, MarketNode, ProfileNode, SensorNode, WeatherNode};
pub use reasoning::{ContextExtractNode, CropHealthNode, DiseaseRiskNode, IntentNode, SeasonPlanNode};
pub use synthesis::SynthesisNode;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use crate::providers::{FarmerProfile, ProviderError, TextGenerator, bounded};
use crate::state::StateSnapshot;

/// Context field names shared by the nodes, the workflow wiring and tests.
pub mod keys {
    pub const USER_ID: &str = "user_id";
    pub const SESSION_ID: &str = "session_id";
    pub const MESSAGE: &str = "message";
    pub const HISTORY: &str = "history";
    pub const HISTORY_SUMMARY: &str = "history_summary";
    pub const INTENTS: &str = "intents";
    pub const CROP: &str = "crop";
    pub const LOCATION: &str = "location";
    pub const PROFILE: &str = "profile";
    pub const SENSORS: &str = "sensors";
    pub const WEATHER: &str = "weather";
    pub const MARKET: &str = "market";
    pub const CROP_ANALYSIS: &str = "crop_analysis";
    pub const DISEASE_RISK: &str = "disease_risk";
    pub const PLAN: &str = "plan";
    pub const FINAL_RESPONSE: &str = "final_response";
}

/// The error-tagged substitute written when a provider call fails.
pub(crate) fn error_value(err: &ProviderError) -> Value {
    json!({ "error": err.to_string() })
}

/// The profile record, if the profile node produced a well-formed one.
pub(crate) fn profile_from_snapshot(snapshot: &StateSnapshot) -> Option<FarmerProfile> {
    snapshot
        .context_value(keys::PROFILE)
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
}

/// The crop under analysis: the extracted crop when present, otherwise the
/// first profile crop, otherwise "unknown crop".
pub(crate) fn crop_under_review(snapshot: &StateSnapshot) -> String {
    if let Some(crop) = snapshot.context_str(keys::CROP)
        && !crop.is_empty()
    {
        return crop.to_string();
    }
    profile_from_snapshot(snapshot)
        .and_then(|profile| profile.crops.first().cloned())
        .unwrap_or_else(|| "unknown crop".to_string())
}

/// One bounded text-generation call.
pub(crate) async fn generate_bounded(
    generator: &Arc<dyn TextGenerator>,
    timeout: Duration,
    instruction: &str,
    payload: &str,
) -> Result<String, ProviderError> {
    bounded("generation", timeout, generator.generate(instruction, payload)).await
}
