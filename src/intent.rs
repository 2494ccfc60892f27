//! Intent classification labels and section predicates.
//!
//! The intent node classifies a farmer message into one or more labels; the
//! synthesis node decides which context sections to include by evaluating an
//! explicit predicate per section against the classified set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One classification label for a farmer query.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// "How are my fields doing" style status checks.
    Status,
    /// Weather questions.
    Weather,
    /// Disease and pest concerns.
    Disease,
    /// Seasonal operation planning.
    Plan,
    /// Market price questions.
    Market,
    /// General advice, the catch-all.
    Advice,
}

impl Intent {
    pub const ALL: [Intent; 6] = [
        Intent::Status,
        Intent::Weather,
        Intent::Disease,
        Intent::Plan,
        Intent::Market,
        Intent::Advice,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Status => "status",
            Intent::Weather => "weather",
            Intent::Disease => "disease",
            Intent::Plan => "plan",
            Intent::Market => "market",
            Intent::Advice => "advice",
        }
    }

    /// Parse one lower-cased label; "price" is an alias for market.
    #[must_use]
    pub fn parse(label: &str) -> Option<Intent> {
        match label {
            "status" => Some(Intent::Status),
            "weather" => Some(Intent::Weather),
            "disease" => Some(Intent::Disease),
            "plan" => Some(Intent::Plan),
            "market" | "price" => Some(Intent::Market),
            "advice" => Some(Intent::Advice),
            _ => None,
        }
    }
}

/// Parse the raw classifier output into an intent set.
///
/// The text is lower-cased and split on non-alphabetic characters; every
/// recognized label joins the set. An empty result falls back to `{advice}`
/// so downstream predicates always have something to evaluate.
#[must_use]
pub fn parse_intents(raw: &str) -> BTreeSet<Intent> {
    let lowered = raw.to_lowercase();
    let mut set: BTreeSet<Intent> = lowered
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter_map(Intent::parse)
        .collect();
    if set.is_empty() {
        set.insert(Intent::Advice);
    }
    set
}

/// Read an intent set back out of a run-state context value.
///
/// Missing or malformed values fall back to `{advice}`.
#[must_use]
pub fn intents_from_value(value: Option<&Value>) -> BTreeSet<Intent> {
    let mut set: BTreeSet<Intent> = value
        .and_then(Value::as_array)
        .map(|labels| {
            labels
                .iter()
                .filter_map(Value::as_str)
                .filter_map(Intent::parse)
                .collect()
        })
        .unwrap_or_default();
    if set.is_empty() {
        set.insert(Intent::Advice);
    }
    set
}

/// Serialize an intent set for the run-state context.
#[must_use]
pub fn intents_to_value(intents: &BTreeSet<Intent>) -> Value {
    Value::Array(
        intents
            .iter()
            .map(|i| Value::String(i.as_str().to_string()))
            .collect(),
    )
}

/// An optional context section of the synthesis prompt.
///
/// Each section carries an explicit predicate over the classified intent
/// set; a pure market/price query, for example, omits every agronomy
/// section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    History,
    CropHealth,
    DiseaseRisk,
    Plan,
    Weather,
    Sensors,
    Market,
}

impl Section {
    /// Whether the section belongs in the synthesis prompt for this intent
    /// set.
    #[must_use]
    pub fn wants(&self, intents: &BTreeSet<Intent>) -> bool {
        use Intent::*;
        let any_of = |labels: &[Intent]| labels.iter().any(|label| intents.contains(label));
        match self {
            Section::History => true,
            Section::CropHealth | Section::DiseaseRisk | Section::Sensors => {
                any_of(&[Status, Disease, Advice])
            }
            Section::Plan => any_of(&[Plan, Advice]),
            Section::Weather => any_of(&[Weather, Plan, Disease, Advice]),
            Section::Market => intents.contains(&Market),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_labels() {
        let set = parse_intents("weather, plan");
        assert_eq!(set, [Intent::Weather, Intent::Plan].into_iter().collect());
    }

    #[test]
    fn price_aliases_market() {
        let set = parse_intents("Market Price");
        assert_eq!(set, [Intent::Market].into_iter().collect());
    }

    #[test]
    fn unknown_output_falls_back_to_advice() {
        assert_eq!(
            parse_intents("???"),
            [Intent::Advice].into_iter().collect()
        );
        assert_eq!(
            intents_from_value(None),
            [Intent::Advice].into_iter().collect()
        );
    }

    #[test]
    fn market_only_query_omits_agronomy_sections() {
        let set = parse_intents("market");
        assert!(Section::Market.wants(&set));
        assert!(!Section::CropHealth.wants(&set));
        assert!(!Section::DiseaseRisk.wants(&set));
        assert!(!Section::Plan.wants(&set));
        assert!(!Section::Sensors.wants(&set));
        assert!(Section::History.wants(&set));
    }

    #[test]
    fn advice_includes_everything_but_market() {
        let set = parse_intents("advice");
        assert!(Section::CropHealth.wants(&set));
        assert!(Section::Weather.wants(&set));
        assert!(!Section::Market.wants(&set));
    }

    #[test]
    fn value_round_trip() {
        let set = parse_intents("disease weather");
        let value = intents_to_value(&set);
        assert_eq!(intents_from_value(Some(&value)), set);
    }
}
