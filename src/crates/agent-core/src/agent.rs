//! The base agent: LLM + optional tool registry + bounded context.
//!
//! Grounded on the builder-pattern construction style used throughout
//! `langgraph-prebuilt::agents::*`; composes `llm::ChatModel` and
//! `tooling::ToolRegistry` rather than reimplementing either.

use std::sync::Arc;

use llm::{ChatConfig, ChatModel, ChatRequest, Message};
use tokio::sync::RwLock;
use tooling::ToolRegistry;

use crate::context::ConversationContext;

/// Lifecycle state of an agent, surfaced so an orchestrator or UI can
/// observe what an agent is doing without inspecting its internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Idle,
    Thinking,
    Acting,
    Done,
    Error,
}

/// Composable building block every concrete strategy (`PlannerAgent`,
/// `ReActAgent`) wraps. Holds identity, the LLM seam, an optional tool
/// registry, bounded context, and default sampling parameters.
#[derive(Clone)]
pub struct BaseAgent {
    pub name: String,
    pub role: String,
    llm: Arc<dyn ChatModel>,
    tools: Option<ToolRegistry>,
    context: ConversationContext,
    state: Arc<RwLock<AgentState>>,
    pub default_config: ChatConfig,
}

impl BaseAgent {
    pub fn new(name: impl Into<String>, role: impl Into<String>, llm: Arc<dyn ChatModel>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            llm,
            tools: None,
            context: ConversationContext::default(),
            state: Arc::new(RwLock::new(AgentState::Idle)),
            default_config: ChatConfig::default(),
        }
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }

    pub async fn set_system_prompt(&self, prompt: impl Into<String>) {
        self.context.set_system_prompt(prompt).await;
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    pub fn tools(&self) -> Option<&ToolRegistry> {
        self.tools.as_ref()
    }

    pub fn llm(&self) -> &Arc<dyn ChatModel> {
        &self.llm
    }

    pub async fn state(&self) -> AgentState {
        *self.state.read().await
    }

    pub(crate) async fn set_state(&self, state: AgentState) {
        *self.state.write().await = state;
    }

    /// Appends a user turn, calls the LLM once with (system + bounded
    /// context), appends the assistant reply, and returns its text.
    /// `remember` controls whether this exchange is kept in context.
    ///
    /// Never raises: an LLM failure is absorbed here, the agent's state
    /// is set to `Error`, and the failure comes back as an error-bearing
    /// string rather than a propagated `Err`, so a caller driving several
    /// agents (an orchestrator mode, a loop) can treat a failed turn as
    /// a value instead of having the whole run short-circuit.
    pub async fn chat(&self, message: impl Into<String>, remember: bool) -> String {
        self.set_state(AgentState::Thinking).await;
        let user_turn = Message::human(message.into());

        let mut history = self.context.render().await;
        history.push(user_turn.clone());

        let mut request = ChatRequest::new(history);
        request.config = self.default_config.clone();

        let response = match self.llm.chat(request).await {
            Ok(response) => response,
            Err(err) => {
                self.set_state(AgentState::Error).await;
                return format!("error: {err}");
            }
        };

        if remember {
            self.context.push(user_turn).await;
            self.context.push(response.message.clone()).await;
        }

        self.set_state(AgentState::Done).await;
        response.message.text().unwrap_or_default().to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{FailingModel, ScriptedModel};
    use super::*;

    #[tokio::test]
    async fn chat_appends_turns_and_remembers_by_default() {
        let model = Arc::new(ScriptedModel::new(vec!["hello there"]));
        let agent = BaseAgent::new("assistant", "helper", model);

        let reply = agent.chat("hi", true).await;
        assert_eq!(reply, "hello there");
        assert_eq!(agent.context().len().await, 2);
        assert_eq!(agent.state().await, AgentState::Done);
    }

    #[tokio::test]
    async fn chat_without_remember_leaves_context_untouched() {
        let model = Arc::new(ScriptedModel::new(vec!["ignored"]));
        let agent = BaseAgent::new("assistant", "helper", model);

        agent.chat("hi", false).await;
        assert_eq!(agent.context().len().await, 0);
    }

    #[tokio::test]
    async fn chat_sets_error_state_and_returns_error_value_on_llm_failure() {
        let agent = BaseAgent::new("assistant", "helper", Arc::new(FailingModel));

        let reply = agent.chat("hi", true).await;
        assert!(reply.starts_with("error:"));
        assert_eq!(agent.state().await, AgentState::Error);
        // The failed turn was never recorded in context.
        assert_eq!(agent.context().len().await, 0);
    }
}
