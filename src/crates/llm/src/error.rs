//! Error taxonomy for the LLM client.
//!
//! Mirrors the kinds in the error handling design: `Config`, `Transport`
//! (retryable), `Upstream` (non-retryable 4xx), and `Timeout`.

use thiserror::Error;

/// Result type for LLM client operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur when talking to an OpenAI-compatible backend.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Missing or invalid configuration (endpoint, key, model) at construction.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network failure, 5xx, or 429. Retried with exponential backoff by the caller.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Retries exhausted for a transport-class failure.
    #[error("transport retries exhausted after {attempts} attempts: {source}")]
    TransportExhausted {
        attempts: u32,
        #[source]
        source: Box<LlmError>,
    },

    /// Non-retryable 4xx (other than 429) or a model refusal.
    #[error("upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// Response body did not match the expected wire shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Request, or the enclosing call, exceeded its deadline.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The in-flight request was cancelled cooperatively.
    #[error("request cancelled")]
    Cancelled,

    /// Serialization/deserialization failure unrelated to the wire response shape.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LlmError {
    /// Whether a fresh attempt of the same request is worth making.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Transport(_))
            || matches!(self, LlmError::Upstream { status, .. } if *status == 429 || *status >= 500)
    }
}
