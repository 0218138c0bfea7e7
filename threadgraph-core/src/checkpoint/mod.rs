//! Per-thread message history, persisted as a sequence of checkpoints.

mod memory;
mod sqlite;
mod tests;

pub use memory::MemoryCheckpointStore;
pub use sqlite::SqliteCheckpointStore;

use crate::graph::Phase;
use crate::types::{validate_append, Message, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Debug;

/// One write to a thread: the messages it added and where the thread stands after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub thread_id: String,
    /// 0-based position among the thread's checkpoints
    pub step: u64,
    pub next: Phase,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of a thread as seen through its checkpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadState {
    pub thread_id: String,
    pub messages: Vec<Message>,
    pub next: Phase,
    pub checkpoint_count: usize,
}

/// Append-only storage of thread histories.
///
/// Implementations must be safe to share between tasks; turns on the same
/// thread are expected to be serialized by the caller.
#[async_trait]
pub trait CheckpointStore: Send + Sync + Debug {
    /// Write `messages` as a new checkpoint of `thread_id`.
    ///
    /// Messages whose id is already stored for the thread are dropped. When
    /// nothing is left, nothing is written and `None` is returned. Writes that
    /// would orphan a tool result fail with [`StoreError::Integrity`].
    async fn put(
        &self,
        thread_id: &str,
        messages: &[Message],
        next: Phase,
    ) -> StoreResult<Option<Checkpoint>>;

    /// All checkpoints of a thread in write order; empty for unknown threads.
    async fn history(&self, thread_id: &str) -> StoreResult<Vec<Checkpoint>>;

    /// Distinct thread ids in order of first appearance.
    async fn list_threads(&self) -> StoreResult<Vec<String>>;

    /// Ordered message history of a thread; empty for unknown threads.
    async fn read(&self, thread_id: &str) -> StoreResult<Vec<Message>> {
        Ok(self
            .history(thread_id)
            .await?
            .into_iter()
            .flat_map(|checkpoint| checkpoint.messages)
            .collect())
    }

    /// Append messages, deriving the thread's next phase from the result.
    async fn append(
        &self,
        thread_id: &str,
        messages: &[Message],
    ) -> StoreResult<Option<Checkpoint>> {
        let mut history = self.read(thread_id).await?;
        history.extend(messages.iter().cloned());
        self.put(thread_id, messages, Phase::from_history(&history))
            .await
    }

    async fn get_state(&self, thread_id: &str) -> StoreResult<ThreadState> {
        let history = self.history(thread_id).await?;
        let next = history.last().map(|c| c.next).unwrap_or(Phase::Start);
        let checkpoint_count = history.len();
        let messages = history.into_iter().flat_map(|c| c.messages).collect();
        Ok(ThreadState {
            thread_id: thread_id.to_string(),
            messages,
            next,
            checkpoint_count,
        })
    }
}

/// Drops already-stored or repeated messages and checks tool pairing.
pub(crate) fn prepare_write(
    thread_id: &str,
    existing: &[Message],
    messages: &[Message],
) -> StoreResult<Vec<Message>> {
    let mut seen: HashSet<&str> = existing.iter().map(|m| m.id.as_str()).collect();
    let fresh: Vec<Message> = messages
        .iter()
        .filter(|m| seen.insert(m.id.as_str()))
        .cloned()
        .collect();

    validate_append(existing, &fresh).map_err(|reason| StoreError::Integrity {
        thread_id: thread_id.to_string(),
        reason,
    })?;
    Ok(fresh)
}

/// Keeps the first occurrence of every id, preserving order.
pub(crate) fn dedup_in_order<I>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}
