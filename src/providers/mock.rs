//! Canned and simulated providers for tests and offline runs.

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;

use super::{
    CurrentConditions, FarmerProfile, ForecastEntry, MarketFeed, MarketQuote, MarketRecord,
    ProfileStore, ProviderError, SensorFeed, SensorReading, TextGenerator, WeatherFeed,
    WeatherReport,
};

/// A generator that always answers with the same text.
#[derive(Clone, Debug)]
pub struct CannedGenerator {
    reply: String,
}

impl CannedGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, _instruction: &str, _payload: &str) -> Result<String, ProviderError> {
        Ok(self.reply.clone())
    }
}

/// A generator scripted per instruction: the first rule whose needle occurs
/// in the instruction wins, otherwise the fallback reply is returned.
#[derive(Clone, Debug, Default)]
pub struct ScriptedGenerator {
    rules: Vec<(String, String)>,
    fallback: String,
}

impl ScriptedGenerator {
    #[must_use]
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            fallback: fallback.into(),
        }
    }

    /// Reply with `reply` whenever the instruction contains `needle`.
    #[must_use]
    pub fn on(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push((needle.into(), reply.into()));
        self
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, instruction: &str, _payload: &str) -> Result<String, ProviderError> {
        for (needle, reply) in &self.rules {
            if instruction.contains(needle.as_str()) {
                return Ok(reply.clone());
            }
        }
        Ok(self.fallback.clone())
    }
}

/// A profile store returning one fixed profile.
#[derive(Clone, Debug)]
pub struct StaticProfileStore {
    profile: FarmerProfile,
}

impl StaticProfileStore {
    pub fn new(profile: FarmerProfile) -> Self {
        Self { profile }
    }
}

impl Default for StaticProfileStore {
    fn default() -> Self {
        Self {
            profile: FarmerProfile {
                farmer_id: "farmer123".to_string(),
                name: "Ravi".to_string(),
                location: "kota".to_string(),
                state: "rajasthan".to_string(),
                land_size_acres: 3.2,
                crops: vec!["wheat".to_string()],
                updated_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl ProfileStore for StaticProfileStore {
    async fn profile(&self, _user_id: &str) -> Result<FarmerProfile, ProviderError> {
        Ok(self.profile.clone())
    }
}

/// A sensor feed producing readings jittered around a field baseline.
#[derive(Clone, Debug, Default)]
pub struct SimulatedSensorFeed;

#[async_trait]
impl SensorFeed for SimulatedSensorFeed {
    async fn latest(&self, _user_id: &str) -> Result<SensorReading, ProviderError> {
        let mut rng = rand::rng();
        Ok(SensorReading {
            temperature: 24.0 + rng.random_range(-2.0..2.0),
            humidity: 68.0 + rng.random_range(-5.0..5.0),
            soil_moisture: 520 + rng.random_range(-80i64..80),
            rainfall_mm: rng.random_range(0.0..3.0),
            gas_level: 140,
            timestamp: Utc::now(),
        })
    }
}

/// A weather feed answering with fixed fair-weather conditions.
#[derive(Clone, Debug, Default)]
pub struct CannedWeatherFeed;

#[async_trait]
impl WeatherFeed for CannedWeatherFeed {
    async fn report(&self, location: &str) -> Result<WeatherReport, ProviderError> {
        Ok(WeatherReport {
            location: location.to_string(),
            now: Some(CurrentConditions {
                temp_c: 29.0,
                humidity: 72.0,
                rain_mm: 0.0,
            }),
            forecast: vec![
                ForecastEntry {
                    date: "day 1".to_string(),
                    summary: "No rain expected, light winds".to_string(),
                    temp_min_c: 26.0,
                    temp_max_c: 33.0,
                    rain_mm: 0.0,
                },
                ForecastEntry {
                    date: "day 2".to_string(),
                    summary: "Partly cloudy".to_string(),
                    temp_min_c: 25.0,
                    temp_max_c: 32.0,
                    rain_mm: 0.4,
                },
            ],
            forecast_error: None,
        })
    }
}

/// A market feed answering with fixed quote rows.
#[derive(Clone, Debug)]
pub struct CannedMarketFeed {
    records: Vec<MarketRecord>,
}

impl CannedMarketFeed {
    pub fn new(records: Vec<MarketRecord>) -> Self {
        Self { records }
    }
}

impl Default for CannedMarketFeed {
    fn default() -> Self {
        Self {
            records: vec![MarketRecord {
                commodity: "Wheat".to_string(),
                market: "Kota".to_string(),
                date: "2025-01-01".to_string(),
                min_price: "2000".to_string(),
                max_price: "2200".to_string(),
                modal_price: "2100".to_string(),
            }],
        }
    }
}

#[async_trait]
impl MarketFeed for CannedMarketFeed {
    async fn quote(
        &self,
        commodity: &str,
        state: &str,
        market: &str,
    ) -> Result<MarketQuote, ProviderError> {
        Ok(MarketQuote {
            commodity: commodity.to_string(),
            state: state.to_string(),
            market: market.to_string(),
            data: self.records.clone(),
            error: None,
        })
    }
}
