//! Durable sqlite-backed chat-history store.
//!
//! One row per message; a turn's two inserts run inside a single
//! transaction. Retrieval orders by timestamp descending (insertion id as
//! tiebreak), truncates to the limit, and reverses to present oldest-first.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::{HistoryStore, ProviderError, StoredMessage};
use crate::message::Message;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS chat_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    session_id TEXT NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    timestamp TEXT NOT NULL
)";

const SESSION_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_chat_messages_session
    ON chat_messages (user_id, session_id, timestamp)";

/// Sqlite-backed [`HistoryStore`].
#[derive(Clone)]
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// Open (creating if missing) a database file and ensure the schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::with_pool(pool).await
    }

    /// Connect with a database URL (e.g. `sqlite://history.db`).
    pub async fn connect(url: &str) -> Result<Self, ProviderError> {
        let pool = SqlitePool::connect(url).await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, ProviderError> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        sqlx::query(SESSION_INDEX).execute(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn recent(
        &self,
        user_id: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, ProviderError> {
        let rows = sqlx::query(
            "SELECT user_id, session_id, role, content, timestamp
             FROM chat_messages
             WHERE user_id = ?1 AND session_id = ?2
             ORDER BY timestamp DESC, id DESC
             LIMIT ?3",
        )
        .bind(user_id)
        .bind(session_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            let raw_timestamp: String = row.try_get("timestamp")?;
            let timestamp = DateTime::parse_from_rfc3339(&raw_timestamp)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| ProviderError::Malformed {
                    provider: "history",
                    message: format!("bad timestamp {raw_timestamp:?}: {e}"),
                })?;
            messages.push(StoredMessage {
                user_id: row.try_get("user_id")?,
                session_id: row.try_get("session_id")?,
                role: row.try_get("role")?,
                content: row.try_get("content")?,
                timestamp,
            });
        }
        messages.reverse();
        Ok(messages)
    }

    async fn save_turn(
        &self,
        user_id: &str,
        session_id: &str,
        user_message: &str,
        assistant_message: &str,
    ) -> Result<(), ProviderError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO chat_messages (user_id, session_id, role, content, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(user_id)
        .bind(session_id)
        .bind(Message::USER)
        .bind(user_message)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "INSERT INTO chat_messages (user_id, session_id, role, content, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(user_id)
        .bind(session_id)
        .bind(Message::ASSISTANT)
        .bind(assistant_message)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }
}
