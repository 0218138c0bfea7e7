use super::{dedup_in_order, prepare_write, Checkpoint, CheckpointStore};
use crate::graph::Phase;
use crate::types::{Message, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Process-local checkpoint log, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    log: RwLock<Vec<Checkpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn put(
        &self,
        thread_id: &str,
        messages: &[Message],
        next: Phase,
    ) -> StoreResult<Option<Checkpoint>> {
        let mut log = self.log.write().await;
        let existing: Vec<Message> = log
            .iter()
            .filter(|c| c.thread_id == thread_id)
            .flat_map(|c| c.messages.iter().cloned())
            .collect();

        let fresh = prepare_write(thread_id, &existing, messages)?;
        if fresh.is_empty() {
            return Ok(None);
        }

        let step = log.iter().filter(|c| c.thread_id == thread_id).count() as u64;
        let checkpoint = Checkpoint {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.to_string(),
            step,
            next,
            messages: fresh,
            created_at: Utc::now(),
        };
        debug!(thread_id, step, next = %next, count = checkpoint.messages.len(), "checkpoint written");
        log.push(checkpoint.clone());
        Ok(Some(checkpoint))
    }

    async fn history(&self, thread_id: &str) -> StoreResult<Vec<Checkpoint>> {
        let log = self.log.read().await;
        Ok(log
            .iter()
            .filter(|c| c.thread_id == thread_id)
            .cloned()
            .collect())
    }

    async fn list_threads(&self) -> StoreResult<Vec<String>> {
        let log = self.log.read().await;
        Ok(dedup_in_order(log.iter().map(|c| c.thread_id.clone())))
    }
}
