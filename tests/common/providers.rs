use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cropflow::providers::mock::ScriptedGenerator;
use cropflow::providers::{
    HistoryStore, ProviderError, SensorFeed, SensorReading, StoredMessage, TextGenerator,
};

/// The scripted generator used by the end-to-end tests: one rule per
/// reasoning instruction, bullet-formatted synthesis output so cleaning is
/// observable.
pub fn advisory_generator(intent_reply: &str) -> ScriptedGenerator {
    ScriptedGenerator::new("ok")
        .on("triage farmer queries", intent_reply)
        .on("Extract the crop", "crop=wheat; location=kota")
        .on("Summarize this farmer-assistant chat", "Earlier the farmer asked about wheat.")
        .on("expert agronomist", "- Moisture adequate\n- Action: none")
        .on("Plant pathologist", "Low rust risk this week.")
        .on("seasonal crop operation plans", "Week 1: irrigate. Week 2: fertilize.")
        .on(
            "Farmer-facing assistant",
            "- **Point one**\n- Point two\nAction: irrigate tomorrow",
        )
}

/// Fails whenever the instruction contains the configured needle; delegates
/// to the inner script otherwise.
pub struct FailingGenerator {
    pub fail_when: &'static str,
    pub inner: ScriptedGenerator,
}

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, instruction: &str, payload: &str) -> Result<String, ProviderError> {
        if instruction.contains(self.fail_when) {
            return Err(ProviderError::Unavailable {
                provider: "generation",
                message: "scripted failure".to_string(),
            });
        }
        self.inner.generate(instruction, payload).await
    }
}

/// Records every (instruction, payload) pair before delegating.
pub struct RecordingGenerator {
    pub inner: ScriptedGenerator,
    pub calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingGenerator {
    pub fn new(inner: ScriptedGenerator) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The payload of the first call whose instruction contains `needle`.
    pub fn payload_for(&self, needle: &str) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(instruction, _)| instruction.contains(needle))
            .map(|(_, payload)| payload.clone())
    }
}

#[async_trait]
impl TextGenerator for RecordingGenerator {
    async fn generate(&self, instruction: &str, payload: &str) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((instruction.to_string(), payload.to_string()));
        self.inner.generate(instruction, payload).await
    }
}

/// A sensor feed that always fails.
#[derive(Clone, Debug, Default)]
pub struct FailingSensorFeed;

#[async_trait]
impl SensorFeed for FailingSensorFeed {
    async fn latest(&self, _user_id: &str) -> Result<SensorReading, ProviderError> {
        Err(ProviderError::Unavailable {
            provider: "sensors",
            message: "feed offline".to_string(),
        })
    }
}

/// A sensor feed that hangs longer than any sane timeout.
#[derive(Clone, Debug)]
pub struct SlowSensorFeed {
    pub delay: Duration,
}

#[async_trait]
impl SensorFeed for SlowSensorFeed {
    async fn latest(&self, _user_id: &str) -> Result<SensorReading, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Err(ProviderError::Unavailable {
            provider: "sensors",
            message: "too late anyway".to_string(),
        })
    }
}

/// Wraps a history store; reads succeed, writes fail.
pub struct SaveFailingHistory<S> {
    pub inner: S,
}

#[async_trait]
impl<S: HistoryStore> HistoryStore for SaveFailingHistory<S> {
    async fn recent(
        &self,
        user_id: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, ProviderError> {
        self.inner.recent(user_id, session_id, limit).await
    }

    async fn save_turn(
        &self,
        _user_id: &str,
        _session_id: &str,
        _user_message: &str,
        _assistant_message: &str,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unavailable {
            provider: "history",
            message: "write refused".to_string(),
        })
    }
}
