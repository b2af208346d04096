//! Node identity and the executor contract a graph's nodes implement.

use std::fmt;
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;
use tooling::async_utils::retry::RetryPolicy;

use crate::error::Result;

pub type NodeId = String;

/// The work a node performs: read the accumulated state, produce a
/// partial update to merge back in. Boxed so `GraphBuilder::add_node`
/// can hold a heterogeneous set of closures/functions.
pub type NodeFn = Box<dyn Fn(Value) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// Per-node execution policy: retry behavior on failure and a wall-clock
/// budget for a single invocation.
#[derive(Clone)]
pub struct NodeConfig {
    pub retry: RetryPolicy,
    pub timeout: Option<Duration>,
    /// If true, a node that exhausts its retries yields an empty update
    /// and the workflow continues rather than failing outright.
    pub continue_on_error: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::new(1),
            timeout: None,
            continue_on_error: false,
        }
    }
}

impl NodeConfig {
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }
}

pub struct NodeSpec {
    pub id: NodeId,
    pub executor: NodeFn,
    pub config: NodeConfig,
}

impl fmt::Debug for NodeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSpec").field("id", &self.id).finish_non_exhaustive()
    }
}
