//! In-memory checkpoint store, for tests and short-lived processes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::checkpoint::Checkpoint;
use crate::error::Result;
use crate::store::CheckpointStore;

#[derive(Clone, Default)]
pub struct InMemoryCheckpointStore {
    checkpoints: Arc<RwLock<HashMap<String, Checkpoint>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, checkpoint: Checkpoint) -> Result<()> {
        self.checkpoints
            .write()
            .await
            .insert(checkpoint.workflow_id.clone(), checkpoint);
        Ok(())
    }

    async fn load(&self, workflow_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self.checkpoints.read().await.get(workflow_id).cloned())
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.checkpoints.read().await.keys().cloned().collect())
    }

    async fn delete(&self, workflow_id: &str) -> Result<()> {
        self.checkpoints.write().await.remove(workflow_id);
        Ok(())
    }
}
