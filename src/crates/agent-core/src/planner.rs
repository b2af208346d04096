//! The planner agent: a single-shot strategy that turns a goal into a
//! structured, ordered plan.

use crate::agent::BaseAgent;
use crate::error::Result;
use crate::parser::{parse_plan, Plan};

const PLANNER_SYSTEM_PROMPT: &str = "You are a planning assistant. Given a goal, produce an \
ordered plan as a JSON object: {\"steps\": [{\"description\":.., \"expected_output\":..}, ...], \
\"resources\": [...], \"estimated_cost\": \"...\"}. If you cannot produce JSON, fall back to a \
numbered list of `description -> expected_output` lines.";

/// Single-shot strategy on top of a `BaseAgent`: one call out, one parsed plan back.
pub struct PlannerAgent {
    pub base: BaseAgent,
}

impl PlannerAgent {
    pub fn new(base: BaseAgent) -> Self {
        Self { base }
    }

    pub async fn plan(&self, goal: impl Into<String>) -> Result<Plan> {
        self.base.set_system_prompt(PLANNER_SYSTEM_PROMPT).await;
        let raw = self.base.chat(goal.into(), false).await;
        Ok(parse_plan(&raw))
    }
}
