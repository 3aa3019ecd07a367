use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use compass_core::{ConversationState, InteractionLogEntry};
use parking_lot::RwLock;
use sqlx::{Row, SqlitePool};

pub trait SessionStateRepository: Send + Sync {
    async fn load_state(&self, session_id: &str) -> Result<Option<ConversationState>>;
    async fn upsert_state(&self, state: &ConversationState) -> Result<()>;
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Append-only sink for per-turn interaction records. The conversation flow
/// never reads entries back; failures are for the caller to swallow.
pub trait InteractionLogSink: Send + Sync {
    async fn append(&self, entry: &InteractionLogEntry) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    states: Arc<RwLock<HashMap<String, ConversationState>>>,
    log: Arc<RwLock<Vec<InteractionLogEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logged_entries(&self) -> Vec<InteractionLogEntry> {
        self.log.read().clone()
    }
}

impl SessionStateRepository for MemoryStore {
    async fn load_state(&self, session_id: &str) -> Result<Option<ConversationState>> {
        Ok(self.states.read().get(session_id).cloned())
    }

    async fn upsert_state(&self, state: &ConversationState) -> Result<()> {
        self.states
            .write()
            .insert(state.session_id.clone(), state.clone());
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut removed = 0_u64;
        self.states.write().retain(|_, state| {
            let keep = state.expires_at > now;
            if !keep {
                removed += 1;
            }
            keep
        });

        Ok(removed)
    }
}

impl InteractionLogSink for MemoryStore {
    async fn append(&self, entry: &InteractionLogEntry) -> Result<()> {
        self.log.write().push(entry.clone());
        Ok(())
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .with_context(|| format!("failed connecting to sqlite at {}", database_url))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_states (
              session_id TEXT PRIMARY KEY,
              original_input TEXT NOT NULL,
              pending_json TEXT NOT NULL,
              expires_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS interaction_log (
              id TEXT PRIMARY KEY,
              timestamp TEXT NOT NULL,
              user_input TEXT NOT NULL,
              assistant_reasoning TEXT NOT NULL,
              detected_services_json TEXT NOT NULL,
              final_recommendations_json TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl SessionStateRepository for SqliteStore {
    async fn load_state(&self, session_id: &str) -> Result<Option<ConversationState>> {
        let row = sqlx::query(
            r#"
            SELECT session_id, original_input, pending_json, expires_at
            FROM conversation_states
            WHERE session_id = ?1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let pending_json: String = row.get("pending_json");
        let pending_matches = serde_json::from_str(&pending_json).unwrap_or_default();

        let state = ConversationState {
            session_id: row.get("session_id"),
            original_input: row.get("original_input"),
            pending_matches,
            expires_at: row
                .get::<String, _>("expires_at")
                .parse()
                .unwrap_or_else(|_| Utc::now()),
        };

        Ok(Some(state))
    }

    async fn upsert_state(&self, state: &ConversationState) -> Result<()> {
        let pending_json = serde_json::to_string(&state.pending_matches)?;

        sqlx::query(
            r#"
            INSERT INTO conversation_states (session_id, original_input, pending_json, expires_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(session_id) DO UPDATE SET
              original_input=excluded.original_input,
              pending_json=excluded.pending_json,
              expires_at=excluded.expires_at
            "#,
        )
        .bind(&state.session_id)
        .bind(&state.original_input)
        .bind(pending_json)
        .bind(state.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM conversation_states WHERE expires_at < ?1")
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

impl InteractionLogSink for SqliteStore {
    async fn append(&self, entry: &InteractionLogEntry) -> Result<()> {
        let detected_json = serde_json::to_string(&entry.detected_services)?;
        let recommendations_json = serde_json::to_string(&entry.final_recommendations)?;

        sqlx::query(
            r#"
            INSERT INTO interaction_log
              (id, timestamp, user_input, assistant_reasoning,
               detected_services_json, final_recommendations_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&entry.id)
        .bind(entry.timestamp.to_rfc3339())
        .bind(&entry.user_input)
        .bind(&entry.assistant_reasoning)
        .bind(detected_json)
        .bind(recommendations_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub async fn sqlite(database_url: &str) -> Result<Self> {
        let sqlite = SqliteStore::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }

    /// `COMPASS_DATABASE_URL` selects sqlite; unset means in-memory.
    pub async fn from_env() -> Result<Self> {
        match std::env::var("COMPASS_DATABASE_URL") {
            Ok(database_url) if !database_url.trim().is_empty() => {
                Self::sqlite(database_url.trim()).await
            }
            _ => Ok(Self::memory()),
        }
    }
}

impl SessionStateRepository for Store {
    async fn load_state(&self, session_id: &str) -> Result<Option<ConversationState>> {
        match self {
            Store::Memory(store) => store.load_state(session_id).await,
            Store::Sqlite(store) => store.load_state(session_id).await,
        }
    }

    async fn upsert_state(&self, state: &ConversationState) -> Result<()> {
        match self {
            Store::Memory(store) => store.upsert_state(state).await,
            Store::Sqlite(store) => store.upsert_state(state).await,
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        match self {
            Store::Memory(store) => store.purge_expired(now).await,
            Store::Sqlite(store) => store.purge_expired(now).await,
        }
    }
}

impl InteractionLogSink for Store {
    async fn append(&self, entry: &InteractionLogEntry) -> Result<()> {
        match self {
            Store::Memory(store) => store.append(entry).await,
            Store::Sqlite(store) => store.append(entry).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn memory_store_round_trips_state() {
        let store = MemoryStore::new();
        let state = ConversationState::new("s1", Utc::now() + Duration::hours(1));

        store.upsert_state(&state).await.unwrap();
        let loaded = store.load_state("s1").await.unwrap().unwrap();
        assert_eq!(loaded.session_id, "s1");
        assert!(!loaded.is_awaiting_confirmation());

        assert!(store.load_state("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn purge_removes_only_expired_states() {
        let store = MemoryStore::new();
        let now = Utc::now();

        store
            .upsert_state(&ConversationState::new("old", now - Duration::hours(1)))
            .await
            .unwrap();
        store
            .upsert_state(&ConversationState::new("fresh", now + Duration::hours(1)))
            .await
            .unwrap();

        let removed = store.purge_expired(now).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.load_state("old").await.unwrap().is_none());
        assert!(store.load_state("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn log_entries_append_in_order() {
        let store = MemoryStore::new();
        for index in 0..3 {
            store
                .append(&InteractionLogEntry {
                    id: format!("entry-{index}"),
                    timestamp: Utc::now(),
                    user_input: "input".to_string(),
                    assistant_reasoning: String::new(),
                    detected_services: Vec::new(),
                    final_recommendations: Vec::new(),
                })
                .await
                .unwrap();
        }

        let ids: Vec<_> = store
            .logged_entries()
            .into_iter()
            .map(|entry| entry.id)
            .collect();
        assert_eq!(ids, vec!["entry-0", "entry-1", "entry-2"]);
    }
}
