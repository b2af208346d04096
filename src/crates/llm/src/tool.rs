//! LLM-facing tool vocabulary: the schema shape sent upstream in
//! `tools`, and the call/result shapes exchanged once the model asks to
//! invoke one. Distinct from `tooling::ToolRegistry`'s richer schema —
//! this is only what the wire dialect needs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A function-calling tool definition as sent in a chat request's `tools` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// The result of executing a tool call, fed back to the model as a `tool` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(call_id: impl Into<String>, result: Value) -> Self {
        Self {
            call_id: call_id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(&self.result).unwrap_or_else(|_| "null".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_builder() {
        let def = ToolDefinition::new("get_weather", "look up current weather")
            .with_parameters(serde_json::json!({"type": "object"}));
        assert_eq!(def.name, "get_weather");
        assert!(def.parameters.is_some());
    }

    #[test]
    fn success_and_error_results() {
        let ok = ToolResult::success("call_1", serde_json::json!({"temp_f": 72}));
        assert!(ok.is_success());

        let err = ToolResult::error("call_2", "not found");
        assert!(!err.is_success());
        assert_eq!(err.error.as_deref(), Some("not found"));
    }
}
