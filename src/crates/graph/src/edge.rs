//! Edge variants connecting graph nodes.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::node::NodeId;

/// Virtual terminal node. Any edge target equal to this string ends the
/// workflow instead of enqueuing further work.
pub const END: &str = "__end__";

/// A conditional edge's router: inspects the current state, returns a
/// branch key that indexes into the edge's branch map.
pub type RouterFn = Box<dyn Fn(&Value) -> String + Send + Sync>;

pub enum Edge {
    /// Unconditional hand-off to a single target.
    Fixed(NodeId),
    /// Router picks one of several named branches.
    Conditional {
        router: RouterFn,
        branches: HashMap<String, NodeId>,
    },
    /// Fans out to every target concurrently.
    Parallel(Vec<NodeId>),
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Fixed(target) => f.debug_tuple("Fixed").field(target).finish(),
            Edge::Conditional { branches, .. } => {
                f.debug_struct("Conditional").field("branches", branches).finish()
            }
            Edge::Parallel(targets) => f.debug_tuple("Parallel").field(targets).finish(),
        }
    }
}
