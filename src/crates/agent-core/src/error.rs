//! Agent-runtime error taxonomy. Agents never raise these to the
//! orchestrator in normal operation: they set their state to `Error` and
//! return an error-bearing reply instead. This type exists for the cases
//! that are genuinely programmer errors (bad construction) or for callers
//! that want the underlying cause.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("llm error: {0}")]
    Llm(#[from] llm::LlmError),

    #[error("tool error: {0}")]
    Tool(String),

    #[error("iteration budget exhausted after {0} turns")]
    IterationBudgetExhausted(usize),

    #[error("configuration error: {0}")]
    Config(String),
}
