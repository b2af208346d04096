//! Configuration for the OpenAI-compatible backend.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};

/// Configuration for the single concrete backend this client ships:
/// an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`.
    pub endpoint: String,

    /// Bearer token sent as `Authorization: Bearer <key>`.
    pub api_key: String,

    /// Model name/identifier.
    pub model: String,

    /// Default request timeout; overridable per-call via `ChatConfig::timeout_override`.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Maximum retry attempts for transport/429/5xx failures (not counting the first try).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Token-bucket capacity: requests allowed per `rate_interval`.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: usize,

    /// Token-bucket refill interval.
    #[serde(default = "default_rate_interval")]
    pub rate_interval: Duration,
}

impl OpenAiConfig {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: default_timeout(),
            max_retries: default_max_retries(),
            rate_limit: default_rate_limit(),
            rate_interval: default_rate_interval(),
        }
    }

    /// Build from environment variables, failing with `LlmError::Config` if
    /// any required setting is missing. The core reads endpoint/key/model
    /// indirectly through this constructor; it never touches `std::env` itself.
    pub fn from_env(endpoint_var: &str, key_var: &str, model_var: &str) -> Result<Self> {
        let endpoint = std::env::var(endpoint_var)
            .map_err(|_| LlmError::Config(format!("missing env var: {endpoint_var}")))?;
        let api_key = std::env::var(key_var)
            .map_err(|_| LlmError::Config(format!("missing env var: {key_var}")))?;
        let model = std::env::var(model_var)
            .map_err(|_| LlmError::Config(format!("missing env var: {model_var}")))?;
        Ok(Self::new(endpoint, api_key, model))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: usize, rate_interval: Duration) -> Self {
        self.rate_limit = rate_limit;
        self.rate_interval = rate_interval;
        self
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_retries() -> u32 {
    3
}

fn default_rate_limit() -> usize {
    60
}

fn default_rate_interval() -> Duration {
    Duration::from_secs(60)
}
