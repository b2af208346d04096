//! Events emitted by a compiled graph's streaming execution.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::node::NodeId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum StreamEvent {
    NodeStarted { node: NodeId },
    NodeCompleted { node: NodeId, partial_state: Value },
    NodeFailed { node: NodeId, error: String },
    StateUpdated { state: Value },
    WorkflowCompleted { state: Value },
    WorkflowFailed { error: String },
}
