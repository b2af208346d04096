//! The worklist runtime: executes a validated `GraphDef` to completion,
//! optionally streaming progress events and checkpointing as it goes.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use graph_checkpoint::{Checkpoint, CheckpointStore, WorkflowStatus};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::builder::{GraphConfig, GraphDef};
use crate::edge::{Edge, END};
use crate::error::{GraphError, Result};
use crate::event::StreamEvent;
use crate::node::{NodeId, NodeSpec};
use crate::result::{ExecutionResult, ExecutionStatus};

pub struct CompiledGraph {
    def: Arc<GraphDef>,
    config: GraphConfig,
    persistence: Option<Arc<dyn CheckpointStore>>,
}

impl CompiledGraph {
    pub(crate) fn new(
        def: Arc<GraphDef>,
        config: GraphConfig,
        persistence: Option<Arc<dyn CheckpointStore>>,
    ) -> Self {
        Self {
            def,
            config,
            persistence,
        }
    }

    /// Runs a fresh workflow from `initial_state` to completion.
    pub async fn invoke(&self, initial_state: Value) -> Result<ExecutionResult> {
        let workflow_id = self
            .persistence
            .as_ref()
            .map(|_| uuid::Uuid::new_v4().to_string());

        let worklist = VecDeque::from([self.def.entry.clone()]);
        self.run(initial_state, Vec::new(), worklist, 0, workflow_id.as_deref(), None)
            .await
    }

    /// Runs a fresh workflow, emitting a `StreamEvent` for every
    /// transition. The returned stream ends once the workflow completes,
    /// fails, or the receiver is dropped (cooperative cancellation).
    pub fn stream(&self, initial_state: Value) -> UnboundedReceiverStream<StreamEvent> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let def = self.def.clone();
        let config = self.config.clone();
        let persistence = self.persistence.clone();

        tokio::spawn(async move {
            let workflow_id = persistence.as_ref().map(|_| uuid::Uuid::new_v4().to_string());
            let worklist = VecDeque::from([def.entry.clone()]);
            let result = run_to_completion(
                &def,
                &config,
                persistence.as_ref(),
                initial_state,
                Vec::new(),
                worklist,
                0,
                workflow_id.as_deref(),
                Some(&tx),
            )
            .await;

            match result {
                Ok(outcome) if outcome.status == ExecutionStatus::Completed => {
                    let _ = tx.send(StreamEvent::WorkflowCompleted {
                        state: outcome.state,
                    });
                }
                Ok(outcome) => {
                    let _ = tx.send(StreamEvent::WorkflowFailed {
                        error: outcome.error.unwrap_or_default(),
                    });
                }
                Err(err) => {
                    let _ = tx.send(StreamEvent::WorkflowFailed {
                        error: err.to_string(),
                    });
                }
            }
        });

        UnboundedReceiverStream::new(rx)
    }

    /// Resumes a previously checkpointed run. The pending frontier is
    /// recomputed by re-evaluating each completed node's outgoing edge
    /// against the checkpointed state, since routing decisions are a
    /// pure function of state and the checkpoint does not separately
    /// persist the worklist.
    pub async fn resume(&self, workflow_id: &str) -> Result<ExecutionResult> {
        let store = self
            .persistence
            .as_ref()
            .ok_or_else(|| GraphError::State("no checkpoint store configured".to_string()))?;

        let checkpoint = store
            .load(workflow_id)
            .await?
            .ok_or_else(|| GraphError::State(format!("no checkpoint for workflow `{workflow_id}`")))?;

        let mut worklist = VecDeque::new();
        let completed_set: HashSet<&String> = checkpoint.completed_nodes.iter().collect();
        for node in &checkpoint.completed_nodes {
            for target in resolve_next(&self.def, node, &checkpoint.state)? {
                if !completed_set.contains(&target) {
                    worklist.push_back(target);
                }
            }
        }
        if worklist.is_empty() && checkpoint.completed_nodes.is_empty() {
            worklist.push_back(self.def.entry.clone());
        }

        self.run(
            checkpoint.state,
            checkpoint.completed_nodes,
            worklist,
            checkpoint.step,
            Some(workflow_id),
            None,
        )
        .await
    }

    async fn run(
        &self,
        state: Value,
        completed: Vec<String>,
        worklist: VecDeque<NodeId>,
        step: usize,
        workflow_id: Option<&str>,
        events: Option<&UnboundedSender<StreamEvent>>,
    ) -> Result<ExecutionResult> {
        run_to_completion(
            &self.def,
            &self.config,
            self.persistence.as_ref(),
            state,
            completed,
            worklist,
            step,
            workflow_id,
            events,
        )
        .await
    }
}

fn enqueue(target: NodeId, worklist: &mut VecDeque<NodeId>, pending: &mut HashSet<NodeId>) {
    if target == END {
        return;
    }
    if pending.insert(target.clone()) {
        worklist.push_back(target);
    }
}

fn resolve_next(def: &GraphDef, node_id: &str, state: &Value) -> Result<Vec<NodeId>> {
    match def.edges.get(node_id) {
        None => Ok(Vec::new()),
        Some(Edge::Fixed(target)) => Ok(vec![target.clone()]),
        Some(Edge::Conditional { router, branches }) => {
            let key = router(state);
            branches.get(&key).cloned().map(|t| vec![t]).ok_or_else(|| {
                GraphError::RoutingMissing {
                    node: node_id.to_string(),
                    key,
                }
            })
        }
        Some(Edge::Parallel(targets)) => Ok(targets.clone()),
    }
}

async fn execute_node(spec: &NodeSpec, state: Value) -> Result<Value> {
    let policy = &spec.config.retry;
    let mut attempt = 0usize;
    loop {
        let invocation = (spec.executor)(state.clone());
        let outcome = match spec.config.timeout {
            Some(duration) => match tokio::time::timeout(duration, invocation).await {
                Ok(result) => result,
                Err(_) => Err(GraphError::NodeExecution {
                    node: spec.id.clone(),
                    error: "node execution timed out".to_string(),
                }),
            },
            None => invocation.await,
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(err) => {
                if policy.should_retry(attempt + 1) {
                    tokio::time::sleep(policy.calculate_delay(attempt)).await;
                    attempt += 1;
                    continue;
                }
                return Err(GraphError::NodeExecution {
                    node: spec.id.clone(),
                    error: err.to_string(),
                });
            }
        }
    }
}

async fn run_parallel_group(
    def: &GraphDef,
    targets: &[NodeId],
    state: &Value,
) -> Result<Vec<(NodeId, Value)>> {
    let mut futures = FuturesUnordered::new();
    for target in targets {
        let spec = def
            .nodes
            .get(target)
            .ok_or_else(|| GraphError::Validation(format!("unknown node `{target}`")))?;
        let read_view = state.clone();
        let target_id = target.clone();
        futures.push(async move {
            let outcome = execute_node(spec, read_view).await;
            (target_id, outcome)
        });
    }

    let mut results = Vec::with_capacity(targets.len());
    while let Some((target_id, outcome)) = futures.next().await {
        results.push((target_id, outcome?));
    }
    Ok(results)
}

#[allow(clippy::too_many_arguments)]
async fn run_to_completion(
    def: &Arc<GraphDef>,
    config: &GraphConfig,
    persistence: Option<&Arc<dyn CheckpointStore>>,
    mut state: Value,
    mut completed: Vec<String>,
    mut worklist: VecDeque<NodeId>,
    mut step: usize,
    workflow_id: Option<&str>,
    events: Option<&UnboundedSender<StreamEvent>>,
) -> Result<ExecutionResult> {
    let run = run_worklist(
        def,
        config,
        persistence,
        &mut state,
        &mut completed,
        &mut worklist,
        &mut step,
        workflow_id,
        events,
    );

    let outcome = match config.total_timeout {
        Some(duration) => match tokio::time::timeout(duration, run).await {
            Ok(inner) => inner,
            Err(_) => Err(GraphError::Timeout),
        },
        None => run.await,
    };

    match outcome {
        Ok(()) => Ok(ExecutionResult::completed(state, completed, step)),
        Err(GraphError::IterationBudgetExceeded(budget)) => {
            checkpoint_as_failed(persistence, workflow_id, &state, &completed, step).await;
            Ok(ExecutionResult::failed(
                state,
                completed,
                step,
                ExecutionStatus::IterationExhausted,
                format!("iteration budget of {budget} exceeded"),
            ))
        }
        Err(GraphError::Timeout) => {
            checkpoint_as_failed(persistence, workflow_id, &state, &completed, step).await;
            Ok(ExecutionResult::failed(
                state,
                completed,
                step,
                ExecutionStatus::Timeout,
                "workflow timed out",
            ))
        }
        Err(GraphError::Cancelled) => {
            checkpoint_as_failed(persistence, workflow_id, &state, &completed, step).await;
            Ok(ExecutionResult::failed(
                state,
                completed,
                step,
                ExecutionStatus::Cancelled,
                "workflow cancelled",
            ))
        }
        Err(err) => {
            checkpoint_as_failed(persistence, workflow_id, &state, &completed, step).await;
            Ok(ExecutionResult::failed(
                state,
                completed,
                step,
                ExecutionStatus::Failed,
                err.to_string(),
            ))
        }
    }
}

async fn checkpoint_as_failed(
    persistence: Option<&Arc<dyn CheckpointStore>>,
    workflow_id: Option<&str>,
    state: &Value,
    completed: &[String],
    step: usize,
) {
    if let (Some(store), Some(wid)) = (persistence, workflow_id) {
        let checkpoint = Checkpoint::new(wid, step, state.clone())
            .with_completed_nodes(completed.to_vec())
            .with_status(WorkflowStatus::Failed);
        let _ = store.save(checkpoint).await;
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_worklist(
    def: &Arc<GraphDef>,
    config: &GraphConfig,
    persistence: Option<&Arc<dyn CheckpointStore>>,
    state: &mut Value,
    completed: &mut Vec<String>,
    worklist: &mut VecDeque<NodeId>,
    step: &mut usize,
    workflow_id: Option<&str>,
    events: Option<&UnboundedSender<StreamEvent>>,
) -> Result<()> {
    let mut pending: HashSet<NodeId> = worklist.iter().cloned().collect();
    let mut activations = 0usize;

    while let Some(node_id) = worklist.pop_front() {
        pending.remove(&node_id);

        if activations >= config.iteration_budget {
            return Err(GraphError::IterationBudgetExceeded(config.iteration_budget));
        }
        activations += 1;

        let spec = def
            .nodes
            .get(&node_id)
            .ok_or_else(|| GraphError::Validation(format!("unknown node `{node_id}` in worklist")))?;

        if let Some(sink) = events {
            let _ = sink.send(StreamEvent::NodeStarted {
                node: node_id.clone(),
            });
        }

        let outcome = execute_node(spec, state.clone()).await;
        let partial = match outcome {
            Ok(partial) => partial,
            Err(err) if spec.config.continue_on_error => {
                if let Some(sink) = events {
                    let _ = sink.send(StreamEvent::NodeFailed {
                        node: node_id.clone(),
                        error: err.to_string(),
                    });
                }
                completed.push(node_id.clone());
                *step += 1;
                continue;
            }
            Err(err) => {
                if let Some(sink) = events {
                    let _ = sink.send(StreamEvent::NodeFailed {
                        node: node_id.clone(),
                        error: err.to_string(),
                    });
                }
                return Err(err);
            }
        };

        def.schema
            .apply(state, &partial)
            .map_err(|err| GraphError::State(err.to_string()))?;
        completed.push(node_id.clone());
        *step += 1;

        if let Some(sink) = events {
            let _ = sink.send(StreamEvent::NodeCompleted {
                node: node_id.clone(),
                partial_state: partial,
            });
            let _ = sink.send(StreamEvent::StateUpdated {
                state: state.clone(),
            });
        }

        if let (Some(store), Some(wid)) = (persistence, workflow_id) {
            let checkpoint = Checkpoint::new(wid, *step, state.clone())
                .with_completed_nodes(completed.clone());
            store.save(checkpoint).await?;
        }

        if def.exits.contains(&node_id) {
            return Ok(());
        }

        match def.edges.get(&node_id) {
            Some(Edge::Parallel(targets)) => {
                let targets = targets.clone();
                let results = run_parallel_group(def, &targets, state).await?;
                let mut downstream = HashSet::new();
                let mut hit_exit = false;

                for (target_id, target_partial) in results {
                    if let Some(sink) = events {
                        let _ = sink.send(StreamEvent::NodeCompleted {
                            node: target_id.clone(),
                            partial_state: target_partial.clone(),
                        });
                    }
                    def.schema
                        .apply(state, &target_partial)
                        .map_err(|err| GraphError::State(err.to_string()))?;
                    completed.push(target_id.clone());
                    *step += 1;

                    if def.exits.contains(&target_id) {
                        hit_exit = true;
                    }
                    for next in resolve_next(def, &target_id, state)? {
                        downstream.insert(next);
                    }
                }

                if let Some(sink) = events {
                    let _ = sink.send(StreamEvent::StateUpdated {
                        state: state.clone(),
                    });
                }
                if let (Some(store), Some(wid)) = (persistence, workflow_id) {
                    let checkpoint = Checkpoint::new(wid, *step, state.clone())
                        .with_completed_nodes(completed.clone());
                    store.save(checkpoint).await?;
                }

                if hit_exit {
                    return Ok(());
                }
                for next in downstream {
                    enqueue(next, worklist, &mut pending);
                }
            }
            _ => {
                for next in resolve_next(def, &node_id, state)? {
                    enqueue(next, worklist, &mut pending);
                }
            }
        }
    }

    Ok(())
}
