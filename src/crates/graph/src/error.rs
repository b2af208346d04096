//! Graph-engine error taxonomy.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    /// Compile-time structure failure: dangling edge, unreachable node,
    /// duplicate name, missing or ambiguous entry point.
    #[error("graph validation failed: {0}")]
    Validation(String),

    /// A node exhausted its retries.
    #[error("node `{node}` execution failed: {error}")]
    NodeExecution { node: String, error: String },

    /// A conditional edge's router returned a key absent from its branch map.
    #[error("router at `{node}` returned unmapped key `{key}`")]
    RoutingMissing { node: String, key: String },

    /// The worklist activated more nodes than the configured budget allows.
    #[error("iteration budget of {0} exceeded")]
    IterationBudgetExceeded(usize),

    /// The run's total timeout elapsed before completion.
    #[error("workflow timed out")]
    Timeout,

    /// The run was cancelled cooperatively.
    #[error("workflow cancelled")]
    Cancelled,

    /// A state-schema merge was attempted against an unknown field.
    #[error("state error: {0}")]
    State(String),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] graph_checkpoint::CheckpointError),
}
