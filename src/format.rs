//! Prompt-ready formatting and response cleaning.
//!
//! Pure, synchronous helpers: structured records in, readable text out.
//! Every function degrades gracefully on missing fields and never panics on
//! caller input.

use std::sync::LazyLock;

use regex::Regex;

use crate::message::Message;
use crate::providers::{MarketQuote, StoredMessage, WeatherReport};

static BULLET_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[*\-\u{2022}]+\s*").expect("bullet pattern"));
static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*+").expect("emphasis pattern"));
static ACTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^action:").expect("action line pattern"));
static ACTION_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*action:[^.!?]*[.!?]?\s*$").expect("action tail pattern"));

/// The fixed sentence used when no market rows are available.
pub const MARKET_DATA_UNAVAILABLE: &str = "Market price data not available.";

/// Render a market quote as one readable line.
///
/// An empty result list or an error-tagged quote yields the fixed
/// "not available" sentence; otherwise the first (most relevant) row's
/// commodity, market, date and min/max/modal prices are formatted.
#[must_use]
pub fn format_market_price(quote: &MarketQuote) -> String {
    if quote.error.is_some() {
        return MARKET_DATA_UNAVAILABLE.to_string();
    }
    let Some(record) = quote.data.first() else {
        return MARKET_DATA_UNAVAILABLE.to_string();
    };
    format!(
        "{} at {} on {}: min {}, max {}, modal {} (per quintal).",
        record.commodity,
        record.market,
        record.date,
        record.min_price,
        record.max_price,
        record.modal_price
    )
}

/// Render a weather report: a current-conditions line plus the forecast
/// list, or an error line when forecast retrieval failed. Never raises;
/// missing pieces degrade to partial output.
#[must_use]
pub fn format_weather(report: &WeatherReport) -> String {
    let mut out = match &report.now {
        Some(now) => format!(
            "Current conditions in {}: {:.1} C, {:.0}% humidity, {:.1} mm rain.",
            report.location, now.temp_c, now.humidity, now.rain_mm
        ),
        None => format!("Current conditions in {} are unavailable.", report.location),
    };

    if let Some(error) = &report.forecast_error {
        out.push_str(&format!(" Forecast unavailable: {error}."));
    } else if report.forecast.is_empty() {
        out.push_str(" No forecast data.");
    } else {
        out.push_str(" Forecast:");
        for entry in &report.forecast {
            out.push_str(&format!(
                " {}: {}, {:.0}-{:.0} C, {:.1} mm rain.",
                entry.date, entry.summary, entry.temp_min_c, entry.temp_max_c, entry.rain_mm
            ));
        }
    }
    out
}

/// Normalize generated text before it reaches the user.
///
/// Strips per-line bullet markers and emphasis markup, drops lines that are
/// themselves an "Action:" directive, joins everything into one paragraph,
/// and removes a trailing "Action:" sentence (case-insensitive).
#[must_use]
pub fn clean_response(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line = BULLET_PREFIX.replace(line, "");
        let line = EMPHASIS.replace_all(&line, "");
        let line = line.trim();
        if line.is_empty() || ACTION_LINE.is_match(line) {
            continue;
        }
        lines.push(line.to_string());
    }

    let joined = lines.join(" ");
    ACTION_TAIL.replace(&joined, "").trim().to_string()
}

/// Render stored history for the summary prompt.
#[must_use]
pub fn render_history(messages: &[StoredMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let speaker = if m.role == Message::ASSISTANT {
                "Assistant"
            } else {
                "User"
            };
            format!("{speaker}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{CurrentConditions, MarketRecord};

    fn empty_quote() -> MarketQuote {
        MarketQuote {
            commodity: "wheat".into(),
            state: "rajasthan".into(),
            market: "kota".into(),
            data: vec![],
            error: None,
        }
    }

    #[test]
    fn market_price_without_rows_is_unavailable() {
        assert_eq!(format_market_price(&empty_quote()), MARKET_DATA_UNAVAILABLE);
    }

    #[test]
    fn market_price_formats_first_row() {
        let mut quote = empty_quote();
        quote.data.push(MarketRecord {
            commodity: "Wheat".into(),
            market: "Kota".into(),
            date: "2025-01-01".into(),
            min_price: "2000".into(),
            max_price: "2200".into(),
            modal_price: "2100".into(),
        });
        let line = format_market_price(&quote);
        for expected in ["Wheat", "Kota", "2025-01-01", "2000", "2200", "2100"] {
            assert!(line.contains(expected), "missing {expected} in {line:?}");
        }
    }

    #[test]
    fn clean_response_strips_bullets_and_action() {
        let cleaned = clean_response("- **Action:** do X\n- Point one\n* Point two");
        assert_eq!(cleaned, "Point one Point two");
    }

    #[test]
    fn clean_response_drops_trailing_action_sentence() {
        let cleaned = clean_response("Irrigate in the morning. Action: spray this week");
        assert_eq!(cleaned, "Irrigate in the morning.");
    }

    #[test]
    fn weather_degrades_without_forecast() {
        let report = WeatherReport {
            location: "kota".into(),
            now: Some(CurrentConditions {
                temp_c: 29.0,
                humidity: 72.0,
                rain_mm: 0.0,
            }),
            forecast: vec![],
            forecast_error: Some("lookup failed".into()),
        };
        let rendered = format_weather(&report);
        assert!(rendered.contains("Current conditions in kota"));
        assert!(rendered.contains("Forecast unavailable"));
    }
}
