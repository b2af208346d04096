//! The `CheckpointStore` seam: any persistence backend the graph engine
//! can resume from.

use async_trait::async_trait;

use crate::checkpoint::Checkpoint;
use crate::error::Result;

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn save(&self, checkpoint: Checkpoint) -> Result<()>;

    /// `None` if no checkpoint has been saved for `workflow_id`.
    async fn load(&self, workflow_id: &str) -> Result<Option<Checkpoint>>;

    async fn list(&self) -> Result<Vec<String>>;

    async fn delete(&self, workflow_id: &str) -> Result<()>;
}
