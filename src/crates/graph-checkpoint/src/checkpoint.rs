//! The checkpoint record, flattened from the richer channel-versioned
//! model a Pregel-style runtime needs down to the flat snapshot a
//! single-worklist runtime needs: step counter, full state, and the set
//! of nodes that have already succeeded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub workflow_id: String,
    pub step: usize,
    pub state: Value,
    pub completed_nodes: Vec<String>,
    pub status: WorkflowStatus,
    pub timestamp: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(workflow_id: impl Into<String>, step: usize, state: Value) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            step,
            state,
            completed_nodes: Vec::new(),
            status: WorkflowStatus::Running,
            timestamp: Utc::now(),
        }
    }

    pub fn with_completed_nodes(mut self, completed_nodes: Vec<String>) -> Self {
        self.completed_nodes = completed_nodes;
        self
    }

    pub fn with_status(mut self, status: WorkflowStatus) -> Self {
        self.status = status;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_round_trips_through_json() {
        let checkpoint = Checkpoint::new("wf-1", 3, serde_json::json!({"counter": 3}))
            .with_completed_nodes(vec!["a".to_string(), "b".to_string()])
            .with_status(WorkflowStatus::Completed);

        let encoded = serde_json::to_string(&checkpoint).unwrap();
        let decoded: Checkpoint = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded.workflow_id, "wf-1");
        assert_eq!(decoded.step, 3);
        assert_eq!(decoded.completed_nodes, vec!["a", "b"]);
        assert_eq!(decoded.status, WorkflowStatus::Completed);
    }
}
