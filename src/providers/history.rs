//! In-memory chat-history store.
//!
//! A keyed append-only log behind a mutex. Suitable for tests and offline
//! runs; the durable counterpart lives in
//! [`history_sqlite`](crate::providers::history_sqlite).

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rustc_hash::FxHashMap;

use super::{HistoryStore, ProviderError, StoredMessage};
use crate::message::Message;

/// Per-(user, session) append-only message log.
///
/// A turn's two messages are appended under one lock, so concurrent turns
/// for the same session never interleave a partial turn.
#[derive(Clone, Default)]
pub struct InMemoryHistoryStore {
    inner: Arc<Mutex<FxHashMap<String, Vec<StoredMessage>>>>,
}

impl InMemoryHistoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(user_id: &str, session_id: &str) -> String {
        format!("{user_id}:{session_id}")
    }

    /// Total number of stored messages for a session (test hook).
    #[must_use]
    pub fn message_count(&self, user_id: &str, session_id: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .get(&Self::key(user_id, session_id))
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn recent(
        &self,
        user_id: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, ProviderError> {
        let guard = self.inner.lock().unwrap();
        let mut log = guard
            .get(&Self::key(user_id, session_id))
            .cloned()
            .unwrap_or_default();
        drop(guard);

        // Appends are already time-ordered; the stable sort keeps same-stamp
        // turn pairs in insertion order.
        log.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        let start = log.len().saturating_sub(limit);
        Ok(log[start..].to_vec())
    }

    async fn save_turn(
        &self,
        user_id: &str,
        session_id: &str,
        user_message: &str,
        assistant_message: &str,
    ) -> Result<(), ProviderError> {
        let now = Utc::now();
        let mut guard = self.inner.lock().unwrap();
        let log = guard.entry(Self::key(user_id, session_id)).or_default();
        log.push(StoredMessage {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            role: Message::USER.to_string(),
            content: user_message.to_string(),
            timestamp: now,
        });
        log.push(StoredMessage {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            role: Message::ASSISTANT.to_string(),
            content: assistant_message.to_string(),
            timestamp: now,
        });
        Ok(())
    }
}
