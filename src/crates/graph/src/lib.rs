//! Declarative state-graph workflow engine.
//!
//! A graph is built node by node with [`builder::GraphBuilder`], validated,
//! then compiled into a [`compiled::CompiledGraph`] that runs a worklist of
//! pending nodes, merging each node's partial output into a schema-typed
//! state via [`state::StateSchema`], and optionally checkpointing progress
//! through a `graph_checkpoint::CheckpointStore`.

pub mod builder;
pub mod compiled;
pub mod edge;
pub mod error;
pub mod event;
pub mod node;
pub mod result;
pub mod state;

pub use builder::{empty_state, GraphBuilder, GraphConfig, ValidationReport};
pub use compiled::CompiledGraph;
pub use edge::{Edge, RouterFn, END};
pub use error::{GraphError, Result};
pub use event::StreamEvent;
pub use node::{NodeConfig, NodeFn, NodeId, NodeSpec};
pub use result::{ExecutionResult, ExecutionStatus};
pub use state::{MergeStrategy, StateSchema};
