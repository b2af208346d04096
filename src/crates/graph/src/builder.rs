//! Declarative graph construction: add nodes and edges, validate the
//! shape, then compile into an executable runtime.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use graph_checkpoint::CheckpointStore;
use serde_json::Value;

use crate::edge::{Edge, RouterFn, END};
use crate::error::{GraphError, Result};
use crate::node::{NodeConfig, NodeFn, NodeId, NodeSpec};
use crate::state::StateSchema;

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Runtime knobs for a compiled graph: how many node activations a run
/// may accumulate before aborting, an optional overall wall-clock
/// budget, and whether to persist checkpoints as the run progresses.
#[derive(Clone)]
pub struct GraphConfig {
    pub iteration_budget: usize,
    pub total_timeout: Option<Duration>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            iteration_budget: 100,
            total_timeout: None,
        }
    }
}

impl GraphConfig {
    pub fn with_iteration_budget(mut self, budget: usize) -> Self {
        self.iteration_budget = budget;
        self
    }

    pub fn with_total_timeout(mut self, timeout: Duration) -> Self {
        self.total_timeout = Some(timeout);
        self
    }
}

/// The frozen, validated shape a `CompiledGraph` executes against.
pub(crate) struct GraphDef {
    pub(crate) nodes: HashMap<NodeId, NodeSpec>,
    pub(crate) edges: HashMap<NodeId, Edge>,
    pub(crate) entry: NodeId,
    pub(crate) exits: HashSet<NodeId>,
    pub(crate) schema: StateSchema,
}

pub struct GraphBuilder {
    nodes: HashMap<NodeId, NodeSpec>,
    edges: HashMap<NodeId, Edge>,
    entry: Option<NodeId>,
    exits: HashSet<NodeId>,
    schema: StateSchema,
}

impl GraphBuilder {
    pub fn new(schema: StateSchema) -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry: None,
            exits: HashSet::new(),
            schema,
        }
    }

    pub fn add_node(
        mut self,
        name: impl Into<String>,
        executor: NodeFn,
        config: NodeConfig,
    ) -> Self {
        let id = name.into();
        self.nodes.insert(
            id.clone(),
            NodeSpec {
                id,
                executor,
                config,
            },
        );
        self
    }

    pub fn add_edge(mut self, src: impl Into<String>, dst: impl Into<String>) -> Self {
        self.edges.insert(src.into(), Edge::Fixed(dst.into()));
        self
    }

    pub fn add_conditional_edge(
        mut self,
        src: impl Into<String>,
        router: RouterFn,
        branches: HashMap<String, NodeId>,
    ) -> Self {
        self.edges
            .insert(src.into(), Edge::Conditional { router, branches });
        self
    }

    pub fn add_parallel_edge(mut self, src: impl Into<String>, targets: Vec<NodeId>) -> Self {
        self.edges.insert(src.into(), Edge::Parallel(targets));
        self
    }

    pub fn set_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry = Some(name.into());
        self
    }

    pub fn set_exit_point(mut self, name: impl Into<String>) -> Self {
        self.exits.insert(name.into());
        self
    }

    fn edge_targets(&self, edge: &Edge) -> Vec<NodeId> {
        match edge {
            Edge::Fixed(target) => vec![target.clone()],
            Edge::Conditional { branches, .. } => branches.values().cloned().collect(),
            Edge::Parallel(targets) => targets.clone(),
        }
    }

    pub fn validate(&self) -> ValidationReport {
        let mut errors = Vec::new();

        let Some(entry) = &self.entry else {
            errors.push("no entry point set".to_string());
            return ValidationReport {
                valid: false,
                errors,
            };
        };

        if !self.nodes.contains_key(entry) {
            errors.push(format!("entry point `{entry}` is not a known node"));
        }

        for exit in &self.exits {
            if !self.nodes.contains_key(exit) {
                errors.push(format!("exit point `{exit}` is not a known node"));
            }
        }

        for (src, edge) in &self.edges {
            if !self.nodes.contains_key(src) {
                errors.push(format!("edge source `{src}` is not a known node"));
            }
            for target in self.edge_targets(edge) {
                if target != END && !self.nodes.contains_key(&target) {
                    errors.push(format!("edge target `{target}` is not a known node"));
                }
            }
        }

        if errors.is_empty() {
            let reachable = self.reachable_from(entry);
            for name in self.nodes.keys() {
                if !reachable.contains(name) {
                    errors.push(format!("node `{name}` is unreachable from the entry point"));
                }
            }
        }

        ValidationReport {
            valid: errors.is_empty(),
            errors,
        }
    }

    fn reachable_from(&self, entry: &str) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        let mut frontier = vec![entry.to_string()];
        seen.insert(entry.to_string());

        while let Some(node) = frontier.pop() {
            let Some(edge) = self.edges.get(&node) else {
                continue;
            };
            for target in self.edge_targets(edge) {
                if target != END && seen.insert(target.clone()) {
                    frontier.push(target);
                }
            }
        }

        seen
    }

    pub fn compile(
        self,
        config: GraphConfig,
        persistence: Option<Arc<dyn CheckpointStore>>,
    ) -> Result<crate::compiled::CompiledGraph> {
        let report = self.validate();
        if !report.valid {
            return Err(GraphError::Validation(report.errors.join("; ")));
        }

        let entry = self.entry.expect("validate() guarantees an entry point");
        let def = GraphDef {
            nodes: self.nodes,
            edges: self.edges,
            entry,
            exits: self.exits,
            schema: self.schema,
        };

        Ok(crate::compiled::CompiledGraph::new(
            Arc::new(def),
            config,
            persistence,
        ))
    }
}

pub fn empty_state() -> Value {
    Value::Object(serde_json::Map::new())
}
