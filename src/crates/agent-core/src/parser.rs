//! The lenient parser that extracts structured meaning out of free-form
//! LLM text: `Thought/Action/Observation/Final Answer` blocks for the
//! ReAct loop, and ordered-step plans for the planner.
//!
//! Five strategies, tried in order, first success wins: strict JSON,
//! code-block extraction, `<think>` tag strip, regex span, and finally a
//! fallback that treats the whole text as the answer.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// One parsed unit of ReAct output.
#[derive(Debug, Clone, PartialEq)]
pub enum ReActStep {
    Thought(String),
    Action { tool: String, args: Value },
    FinalAnswer(String),
}

static CODE_FENCE: OnceLock<Regex> = OnceLock::new();
static THINK_TAGS: OnceLock<Regex> = OnceLock::new();
static THOUGHT_RE: OnceLock<Regex> = OnceLock::new();
static ACTION_RE: OnceLock<Regex> = OnceLock::new();
static FINAL_RE: OnceLock<Regex> = OnceLock::new();

fn code_fence_re() -> &'static Regex {
    CODE_FENCE.get_or_init(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").unwrap())
}

fn think_tags_re() -> &'static Regex {
    THINK_TAGS.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").unwrap())
}

fn thought_re() -> &'static Regex {
    THOUGHT_RE.get_or_init(|| Regex::new(r"(?i)^\s*Thought:\s*(.+)$").unwrap())
}

fn action_re() -> &'static Regex {
    ACTION_RE.get_or_init(|| Regex::new(r"(?i)Action:\s*([A-Za-z0-9_\-]+)\s*\((.*)\)").unwrap())
}

fn final_re() -> &'static Regex {
    FINAL_RE.get_or_init(|| Regex::new(r"(?is)Final Answer:\s*(.+)").unwrap())
}

/// Parses one turn of ReAct output into the step it represents.
///
/// Strategy order: (1) the whole trimmed text is a JSON object carrying
/// `{"action": ..., "args": ...}` or `{"final_answer": ...}`; (2) the
/// first fenced code block is tried the same way; (3) `<think>` wrappers
/// are stripped before falling through to regex; (4) a regex span looks
/// for `Thought:`/`Action: tool(args)`/`Final Answer:`; (5) anything else
/// is the final answer verbatim.
pub fn parse_react_step(text: &str) -> ReActStep {
    let trimmed = text.trim();

    if let Some(step) = try_json(trimmed) {
        return step;
    }

    if let Some(captures) = code_fence_re().captures(trimmed) {
        if let Some(step) = try_json(captures[1].trim()) {
            return step;
        }
    }

    let stripped = think_tags_re().replace_all(trimmed, "");
    let stripped = stripped.trim();

    if let Some(captures) = final_re().captures(stripped) {
        return ReActStep::FinalAnswer(captures[1].trim().to_string());
    }

    if let Some(captures) = action_re().captures(stripped) {
        let tool = captures[1].to_string();
        let args = parse_loose_args(captures[2].trim());
        return ReActStep::Action { tool, args };
    }

    for line in stripped.lines() {
        if let Some(captures) = thought_re().captures(line) {
            return ReActStep::Thought(captures[1].trim().to_string());
        }
    }

    // Total failure of every structured strategy: the raw text is the answer.
    ReActStep::FinalAnswer(stripped.to_string())
}

fn try_json(text: &str) -> Option<ReActStep> {
    let value: Value = serde_json::from_str(text).ok()?;
    if let Some(answer) = value.get("final_answer").and_then(|v| v.as_str()) {
        return Some(ReActStep::FinalAnswer(answer.to_string()));
    }
    if let Some(thought) = value.get("thought").and_then(|v| v.as_str()) {
        return Some(ReActStep::Thought(thought.to_string()));
    }
    let tool = value.get("action").and_then(|v| v.as_str())?;
    let args = value.get("args").cloned().unwrap_or(Value::Null);
    Some(ReActStep::Action {
        tool: tool.to_string(),
        args,
    })
}

/// `Action: tool(arg1=1, arg2="x")` style argument lists tolerated as a
/// fallback when the model doesn't emit JSON for the action's arguments.
fn parse_loose_args(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Object(Default::default());
    }
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return value;
    }
    let mut map = serde_json::Map::new();
    for part in raw.split(',') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            let key = key.trim().trim_matches('"').to_string();
            let value = value.trim().trim_matches('"');
            let parsed = serde_json::from_str::<Value>(value)
                .unwrap_or_else(|_| Value::String(value.to_string()));
            map.insert(key, parsed);
        }
    }
    Value::Object(map)
}

/// One step of a planner's structured plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep {
    pub description: String,
    pub expected_output: String,
}

/// A single-shot plan: ordered steps, required resources, and an
/// estimated cost string (free-form — "2 LLM calls", "$0.01", etc).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
    pub resources: Vec<String>,
    pub estimated_cost: String,
}

static NUMBERED_STEP: OnceLock<Regex> = OnceLock::new();

fn numbered_step_re() -> &'static Regex {
    NUMBERED_STEP.get_or_init(|| Regex::new(r"(?m)^\s*(?:\d+[.)]|[-*])\s+(.*)$").unwrap())
}

/// Parses a plan out of free-form text, tolerating code fences and either
/// a JSON plan object or a numbered/bulleted step list.
pub fn parse_plan(text: &str) -> Plan {
    let trimmed = text.trim();

    if let Some(plan) = try_json_plan(trimmed) {
        return plan;
    }
    if let Some(captures) = code_fence_re().captures(trimmed) {
        if let Some(plan) = try_json_plan(captures[1].trim()) {
            return plan;
        }
    }

    let stripped = think_tags_re().replace_all(trimmed, "");
    let mut steps = Vec::new();
    for captures in numbered_step_re().captures_iter(&stripped) {
        let line = captures[1].trim();
        if let Some((description, expected)) = line.split_once("->") {
            steps.push(PlanStep {
                description: description.trim().to_string(),
                expected_output: expected.trim().to_string(),
            });
        } else {
            steps.push(PlanStep {
                description: line.to_string(),
                expected_output: String::new(),
            });
        }
    }

    Plan {
        steps,
        resources: Vec::new(),
        estimated_cost: String::new(),
    }
}

fn try_json_plan(text: &str) -> Option<Plan> {
    let value: Value = serde_json::from_str(text).ok()?;
    let steps_value = value.get("steps")?.as_array()?;
    let steps = steps_value
        .iter()
        .map(|s| PlanStep {
            description: s
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            expected_output: s
                .get("expected_output")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        })
        .collect();
    let resources = value
        .get("resources")
        .and_then(|v| v.as_array())
        .map(|a| {
            a.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();
    let estimated_cost = value
        .get("estimated_cost")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    Some(Plan {
        steps,
        resources,
        estimated_cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_final_answer_tag() {
        let step = parse_react_step("Thought: done thinking\nFinal Answer: 42");
        assert_eq!(step, ReActStep::FinalAnswer("42".to_string()));
    }

    #[test]
    fn parses_thought_only() {
        let step = parse_react_step("Thought: I should look this up");
        assert_eq!(step, ReActStep::Thought("I should look this up".to_string()));
    }

    #[test]
    fn parses_action_with_loose_args() {
        let step = parse_react_step(r#"Action: get_weather(city="nyc")"#);
        assert_eq!(
            step,
            ReActStep::Action {
                tool: "get_weather".to_string(),
                args: serde_json::json!({"city": "nyc"}),
            }
        );
    }

    #[test]
    fn strips_think_tags_before_matching() {
        let step = parse_react_step("<think>internal musing</think>Final Answer: done");
        assert_eq!(step, ReActStep::FinalAnswer("done".to_string()));
    }

    #[test]
    fn extracts_json_from_code_fence() {
        let text = "```json\n{\"action\": \"search\", \"args\": {\"q\": \"rust\"}}\n```";
        let step = parse_react_step(text);
        assert_eq!(
            step,
            ReActStep::Action {
                tool: "search".to_string(),
                args: serde_json::json!({"q": "rust"}),
            }
        );
    }

    #[test]
    fn unrecognizable_text_falls_back_to_final_answer() {
        let step = parse_react_step("just some prose with no markers");
        assert_eq!(
            step,
            ReActStep::FinalAnswer("just some prose with no markers".to_string())
        );
    }

    #[test]
    fn parses_numbered_plan() {
        let plan = parse_plan("1. gather data -> raw dataset\n2. analyze -> summary\n");
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].description, "gather data");
        assert_eq!(plan.steps[0].expected_output, "raw dataset");
    }

    #[test]
    fn parses_json_plan() {
        let text = serde_json::json!({
            "steps": [{"description": "gather", "expected_output": "data"}],
            "resources": ["search_tool"],
            "estimated_cost": "2 llm calls",
        })
        .to_string();
        let plan = parse_plan(&text);
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.resources, vec!["search_tool".to_string()]);
        assert_eq!(plan.estimated_cost, "2 llm calls");
    }
}
