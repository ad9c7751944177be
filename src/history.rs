//! Message-persistence collaborator.
//!
//! The engine reads and writes conversational state exclusively through
//! `MessageStore`; chat creation and the rest of the conversation schema
//! belong to the host application.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::errors::RagError;
use crate::llm::ChatMessage;

const MAX_HISTORY_LIMIT: usize = 1000;

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append one message to a chat and return its id.
    async fn create_message(
        &self,
        owner_id: &str,
        chat_id: &str,
        role: &str,
        content: &str,
    ) -> Result<String, RagError>;

    /// The most recent `limit` messages of a chat, oldest-first.
    async fn recent_history(&self, chat_id: &str, limit: usize)
        -> Result<Vec<ChatMessage>, RagError>;
}

pub struct SqliteMessageStore {
    pool: SqlitePool,
}

impl SqliteMessageStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, RagError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(RagError::messages)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), RagError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                chat_id TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                role TEXT NOT NULL CHECK(role IN ('system', 'user', 'assistant')),
                content TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(RagError::messages)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_chat ON messages(chat_id)")
            .execute(&self.pool)
            .await
            .map_err(RagError::messages)?;

        Ok(())
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn create_message(
        &self,
        owner_id: &str,
        chat_id: &str,
        role: &str,
        content: &str,
    ) -> Result<String, RagError> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO messages (id, chat_id, owner_id, role, content)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&id)
        .bind(chat_id)
        .bind(owner_id)
        .bind(role)
        .bind(content)
        .execute(&self.pool)
        .await
        .map_err(RagError::messages)?;

        Ok(id)
    }

    async fn recent_history(
        &self,
        chat_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, RagError> {
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT) as i64;

        let rows = sqlx::query(
            "SELECT role, content FROM messages
             WHERE chat_id = ?1
             ORDER BY rowid DESC
             LIMIT ?2",
        )
        .bind(chat_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::messages)?;

        // fetched newest-first, returned oldest-first
        Ok(rows
            .into_iter()
            .rev()
            .map(|row| ChatMessage {
                role: row.get("role"),
                content: row.get("content"),
            })
            .collect())
    }
}
