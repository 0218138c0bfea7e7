use crate::checkpoint::CheckpointStore;
use crate::types::{Message, StoreResult};
use std::sync::Arc;

/// Read-only view of the threads a store knows about.
#[derive(Debug, Clone)]
pub struct ThreadDirectory {
    store: Arc<dyn CheckpointStore>,
}

impl ThreadDirectory {
    pub fn new(store: Arc<dyn CheckpointStore>) -> Self {
        Self { store }
    }

    /// Every thread id in order of first appearance. Scans the store on each call.
    pub async fn list(&self) -> StoreResult<Vec<String>> {
        self.store.list_threads().await
    }

    /// Full history of a thread; empty if it was never written.
    pub async fn load(&self, thread_id: &str) -> StoreResult<Vec<Message>> {
        self.store.read(thread_id).await
    }
}
