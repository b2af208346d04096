//! Bus-level error taxonomy.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BusError>;

#[derive(Debug, Error)]
pub enum BusError {
    /// `send`'s receiver is not a currently-registered agent.
    #[error("routing error: unknown agent `{0}`")]
    RoutingError(String),

    /// Enqueue on a full inbox under the non-drop policy.
    #[error("backpressure: inbox for `{0}` is full")]
    Backpressure(String),

    /// `request_reply` received no matching response before its deadline.
    #[error("timed out waiting for reply to correlation id `{0}`")]
    Timeout(String),

    /// An agent id was registered twice.
    #[error("agent `{0}` is already registered")]
    AlreadyRegistered(String),
}

impl BusError {
    /// `send` retries `Backpressure`; a routing failure means the
    /// receiver will never show up mid-retry, so it is not retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BusError::Backpressure(_))
    }
}
