//! Agent lifecycle, the ReAct reason/act loop, and the planner loop.
//!
//! `BaseAgent` wraps an `llm::ChatModel` with an optional
//! `tooling::ToolRegistry` and a bounded `ConversationContext`.
//! `PlannerAgent` and `ReActAgent` are the two concrete strategies the
//! core ships; `ReActJudge` is a specialised `ReActAgent` used by the
//! orchestrator to arbitrate debates.

pub mod agent;
pub mod context;
pub mod error;
pub mod judge;
pub mod parser;
pub mod planner;
pub mod react;

pub use agent::{AgentState, BaseAgent};
pub use context::ConversationContext;
pub use error::{AgentError, Result};
pub use judge::{DebateTurn, Decision, Judgment, ReActJudge};
pub use parser::{parse_plan, parse_react_step, Plan, PlanStep, ReActStep};
pub use planner::PlannerAgent;
pub use react::{ReActAgent, ReActResult, ReActStatus, ReActTrace};
