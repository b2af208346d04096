//! The terminal outcome of a single workflow run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Completed,
    Failed,
    Cancelled,
    IterationExhausted,
    Timeout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub state: Value,
    pub completed_nodes: Vec<String>,
    pub steps: usize,
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn completed(state: Value, completed_nodes: Vec<String>, steps: usize) -> Self {
        Self {
            status: ExecutionStatus::Completed,
            state,
            completed_nodes,
            steps,
            error: None,
        }
    }

    pub fn failed(
        state: Value,
        completed_nodes: Vec<String>,
        steps: usize,
        status: ExecutionStatus,
        error: impl Into<String>,
    ) -> Self {
        Self {
            status,
            state,
            completed_nodes,
            steps,
            error: Some(error.into()),
        }
    }
}
