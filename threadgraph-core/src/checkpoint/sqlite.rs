use super::{dedup_in_order, prepare_write, Checkpoint, CheckpointStore};
use crate::graph::Phase;
use crate::types::{Message, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS checkpoints (
        seq        INTEGER PRIMARY KEY AUTOINCREMENT,
        id         TEXT NOT NULL UNIQUE,
        thread_id  TEXT NOT NULL,
        step       INTEGER NOT NULL,
        next_phase TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (thread_id, step)
    )",
    "CREATE TABLE IF NOT EXISTS checkpoint_writes (
        seq           INTEGER PRIMARY KEY AUTOINCREMENT,
        checkpoint_id TEXT NOT NULL REFERENCES checkpoints(id),
        thread_id     TEXT NOT NULL,
        message_id    TEXT NOT NULL,
        data          TEXT NOT NULL,
        UNIQUE (thread_id, message_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_checkpoint_writes_thread
        ON checkpoint_writes (thread_id, seq)",
];

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Checkpoints in an SQLite file.
///
/// The handle wraps a connection pool and is cheap to clone; every clone may
/// be used from any task.
#[derive(Debug, Clone)]
pub struct SqliteCheckpointStore {
    pool: SqlitePool,
    // Serializes read-validate-write cycles issued through this process.
    write_lock: Arc<Mutex<()>>,
}

impl SqliteCheckpointStore {
    /// Open or create the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect_with(options)
            .await?;
        info!(path = %path.as_ref().display(), "opened sqlite checkpoint store");
        Self::from_pool(pool).await
    }

    /// Private in-memory database, for tests and throwaway sessions.
    pub async fn open_in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // One connection kept forever: the database dies with it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// Use an existing pool, creating the schema if needed.
    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn decode_message(data: &str) -> StoreResult<Message> {
    Ok(serde_json::from_str(data)?)
}

fn parse_timestamp(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {}: {}", value, e)))
}

async fn load_messages(conn: &mut SqliteConnection, thread_id: &str) -> StoreResult<Vec<Message>> {
    let rows = sqlx::query("SELECT data FROM checkpoint_writes WHERE thread_id = ? ORDER BY seq")
        .bind(thread_id)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| decode_message(&row.try_get::<String, _>("data")?))
        .collect()
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn put(
        &self,
        thread_id: &str,
        messages: &[Message],
        next: Phase,
    ) -> StoreResult<Option<Checkpoint>> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let existing = load_messages(&mut *tx, thread_id).await?;
        let fresh = prepare_write(thread_id, &existing, messages)?;
        if fresh.is_empty() {
            return Ok(None);
        }

        let step: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM checkpoints WHERE thread_id = ?")
            .bind(thread_id)
            .fetch_one(&mut *tx)
            .await?;

        let checkpoint = Checkpoint {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.to_string(),
            step: step as u64,
            next,
            messages: fresh,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO checkpoints (id, thread_id, step, next_phase, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&checkpoint.id)
        .bind(thread_id)
        .bind(step)
        .bind(next.as_str())
        .bind(checkpoint.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for message in &checkpoint.messages {
            sqlx::query(
                "INSERT INTO checkpoint_writes (checkpoint_id, thread_id, message_id, data)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&checkpoint.id)
            .bind(thread_id)
            .bind(&message.id)
            .bind(serde_json::to_string(message)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(thread_id, step, next = %next, count = checkpoint.messages.len(), "checkpoint written");
        Ok(Some(checkpoint))
    }

    async fn read(&self, thread_id: &str) -> StoreResult<Vec<Message>> {
        let mut conn = self.pool.acquire().await?;
        load_messages(&mut *conn, thread_id).await
    }

    async fn history(&self, thread_id: &str) -> StoreResult<Vec<Checkpoint>> {
        let mut conn = self.pool.acquire().await?;

        let writes = sqlx::query(
            "SELECT checkpoint_id, data FROM checkpoint_writes WHERE thread_id = ? ORDER BY seq",
        )
        .bind(thread_id)
        .fetch_all(&mut *conn)
        .await?;
        let mut messages_by_checkpoint: HashMap<String, Vec<Message>> = HashMap::new();
        for row in &writes {
            let checkpoint_id: String = row.try_get("checkpoint_id")?;
            let message = decode_message(&row.try_get::<String, _>("data")?)?;
            messages_by_checkpoint
                .entry(checkpoint_id)
                .or_default()
                .push(message);
        }

        let rows = sqlx::query(
            "SELECT id, step, next_phase, created_at FROM checkpoints
             WHERE thread_id = ? ORDER BY step",
        )
        .bind(thread_id)
        .fetch_all(&mut *conn)
        .await?;

        rows.iter()
            .map(|row| {
                let id: String = row.try_get("id")?;
                let step: i64 = row.try_get("step")?;
                let next_phase: String = row.try_get("next_phase")?;
                let created_at: String = row.try_get("created_at")?;
                Ok(Checkpoint {
                    messages: messages_by_checkpoint.remove(&id).unwrap_or_default(),
                    id,
                    thread_id: thread_id.to_string(),
                    step: step as u64,
                    next: Phase::from_str(&next_phase).map_err(StoreError::Corrupt)?,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    async fn list_threads(&self) -> StoreResult<Vec<String>> {
        let thread_ids: Vec<String> =
            sqlx::query_scalar("SELECT thread_id FROM checkpoints ORDER BY seq")
                .fetch_all(&self.pool)
                .await?;
        Ok(dedup_in_order(thread_ids))
    }
}
