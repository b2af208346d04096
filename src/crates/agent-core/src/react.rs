//! The ReAct agent: a bounded alternation of reasoning and acting.
//!
//! Grounded on `langgraph-prebuilt::agents::react` for the loop shape
//! (bounded iterations, agent/tool alternation). The teacher's ReAct
//! drives structured `tool_calls`; this one drives the textual
//! `Thought/Action/Observation/Final Answer` protocol the spec requires,
//! via the lenient parser in `parser.rs`.

use serde_json::Value;

use crate::agent::BaseAgent;
use crate::error::{AgentError, Result};
use crate::parser::{parse_react_step, ReActStep};

pub const DEFAULT_MAX_ITERATIONS: usize = 5;

const REACT_SYSTEM_PROMPT: &str = "You reason step by step. At each turn emit exactly one of:\n\
Thought: <your reasoning>\n\
Action: <tool_name>(<json or key=value arguments>)\n\
Final Answer: <your answer>\n\
Only emit Final Answer once you are done.";

/// Final status of a ReAct run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReActStatus {
    /// A `Final Answer:` (or unparseable fallback) was reached.
    Completed,
    /// `max_iterations` turns were consumed without a final answer; the
    /// most recent assistant text is returned as a best-effort answer.
    Truncated,
}

/// One recorded turn of a ReAct run, retained for transcript/debugging use.
#[derive(Debug, Clone)]
pub enum ReActTrace {
    Thought(String),
    Action { tool: String, args: Value, observation: String },
}

#[derive(Debug, Clone)]
pub struct ReActResult {
    pub answer: String,
    pub status: ReActStatus,
    pub trace: Vec<ReActTrace>,
}

/// Bounded thought/action/observation loop on top of a `BaseAgent`.
pub struct ReActAgent {
    pub base: BaseAgent,
    pub max_iterations: usize,
}

impl ReActAgent {
    pub fn new(base: BaseAgent) -> Self {
        Self {
            base,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Runs the loop against `task`, dispatching actions through the
    /// base agent's tool registry if one is attached.
    pub async fn run(&self, task: impl Into<String>) -> Result<ReActResult> {
        self.base.set_system_prompt(REACT_SYSTEM_PROMPT).await;

        let mut trace = Vec::new();
        let mut next_input = task.into();
        let mut last_text = String::new();

        for _ in 0..self.max_iterations {
            let raw = self.base.chat(next_input.clone(), true).await;
            last_text = raw.clone();

            match parse_react_step(&raw) {
                ReActStep::FinalAnswer(answer) => {
                    return Ok(ReActResult {
                        answer,
                        status: ReActStatus::Completed,
                        trace,
                    });
                }
                ReActStep::Thought(thought) => {
                    trace.push(ReActTrace::Thought(thought));
                    next_input = "Continue.".to_string();
                }
                ReActStep::Action { tool, args } => {
                    let observation = self.dispatch(&tool, args.clone()).await;
                    trace.push(ReActTrace::Action {
                        tool,
                        args,
                        observation: observation.clone(),
                    });
                    next_input = format!("Observation: {observation}");
                }
            }
        }

        Ok(ReActResult {
            answer: last_text,
            status: ReActStatus::Truncated,
            trace,
        })
    }

    async fn dispatch(&self, tool: &str, args: Value) -> String {
        let Some(registry) = self.base.tools() else {
            return format!("error: no tool registry attached for `{tool}`");
        };
        let result = registry.execute(tool, args).await;
        if result.success {
            result
                .payload
                .map(|p| p.to_string())
                .unwrap_or_else(|| "null".to_string())
        } else {
            format!("error: {}", result.error.unwrap_or_default())
        }
    }
}

/// Wraps `max_iterations` exhaustion as an explicit error for callers
/// that want `?`-propagation rather than inspecting `ReActStatus`.
pub fn require_completed(result: ReActResult) -> Result<String> {
    match result.status {
        ReActStatus::Completed => Ok(result.answer),
        ReActStatus::Truncated => Err(AgentError::IterationBudgetExhausted(result.trace.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::test_support::{FailingModel, ScriptedModel};
    use crate::agent::AgentState;
    use std::sync::Arc;
    use tooling::{ParameterKind, Tool, ToolParameter, ToolRegistry, ToolSchema};

    struct EchoTool;

    #[async_trait::async_trait]
    impl Tool for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema::new("echo", "echoes the given text").with_parameters(vec![
                ToolParameter::new("text", ParameterKind::String).required(),
            ])
        }

        async fn call(&self, args: Value) -> tooling::Result<Value> {
            Ok(args["text"].clone())
        }
    }

    #[tokio::test]
    async fn completes_on_final_answer() {
        let model = Arc::new(ScriptedModel::new(vec!["Final Answer: 42"]));
        let agent = ReActAgent::new(BaseAgent::new("r", "reasoner", model));

        let result = agent.run("what is the answer?").await.unwrap();
        assert_eq!(result.status, ReActStatus::Completed);
        assert_eq!(result.answer, "42");
    }

    #[tokio::test]
    async fn dispatches_action_then_final_answer() {
        let model = Arc::new(ScriptedModel::new(vec![
            r#"Action: echo(text="hi")"#,
            "Final Answer: done",
        ]));
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();

        let base = BaseAgent::new("r", "reasoner", model).with_tools(registry);
        let agent = ReActAgent::new(base);

        let result = agent.run("say hi").await.unwrap();
        assert_eq!(result.status, ReActStatus::Completed);
        assert_eq!(result.answer, "done");
        assert_eq!(result.trace.len(), 1);
    }

    #[tokio::test]
    async fn truncates_after_max_iterations() {
        let model = Arc::new(ScriptedModel::new(vec!["Thought: still thinking"]));
        let agent = ReActAgent::new(BaseAgent::new("r", "reasoner", model)).with_max_iterations(2);

        let result = agent.run("loop forever").await.unwrap();
        assert_eq!(result.status, ReActStatus::Truncated);
        assert_eq!(result.trace.len(), 2);
    }

    #[tokio::test]
    async fn unparseable_text_treated_as_final_answer() {
        let model = Arc::new(ScriptedModel::new(vec!["just some prose"]));
        let agent = ReActAgent::new(BaseAgent::new("r", "reasoner", model));

        let result = agent.run("go").await.unwrap();
        assert_eq!(result.status, ReActStatus::Completed);
        assert_eq!(result.answer, "just some prose");
    }

    #[tokio::test]
    async fn llm_failure_is_absorbed_as_an_error_bearing_final_answer() {
        let agent = ReActAgent::new(BaseAgent::new("r", "reasoner", Arc::new(FailingModel)));

        let result = agent.run("go").await.unwrap();
        assert_eq!(result.status, ReActStatus::Completed);
        assert!(result.answer.starts_with("error:"));
        assert_eq!(agent.base.state().await, AgentState::Error);
    }
}
