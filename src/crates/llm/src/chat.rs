//! Chat request/config types.

use crate::message::Message;
use crate::tool::ToolDefinition;

/// How the model should decide whether to call a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    None,
    Named(String),
}

impl ToolChoice {
    pub(crate) fn as_wire_value(&self) -> serde_json::Value {
        match self {
            ToolChoice::Auto => serde_json::Value::String("auto".to_string()),
            ToolChoice::None => serde_json::Value::String("none".to_string()),
            ToolChoice::Named(name) => serde_json::json!({
                "type": "function",
                "function": { "name": name },
            }),
        }
    }
}

/// Sampling and tool-use configuration for a single chat call.
#[derive(Debug, Clone, Default)]
pub struct ChatConfig {
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
    pub top_p: Option<f32>,
    pub stop_sequences: Vec<String>,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: Option<ToolChoice>,
    pub timeout_override: Option<std::time::Duration>,
}

/// A single chat request: the conversation so far plus its sampling config.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub config: ChatConfig,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            config: ChatConfig::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.config.top_p = Some(top_p);
        self
    }

    pub fn with_stop_sequences(mut self, stop: Vec<String>) -> Self {
        self.config.stop_sequences = stop;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.config.tools = tools;
        self
    }

    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.config.tool_choice = Some(choice);
        self
    }

    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.timeout_override = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chains_apply() {
        let req = ChatRequest::new(vec![Message::human("hi")])
            .with_temperature(0.2)
            .with_max_tokens(128)
            .with_stop_sequences(vec!["\n\n".into()]);

        assert_eq!(req.config.temperature, Some(0.2));
        assert_eq!(req.config.max_tokens, Some(128));
        assert_eq!(req.config.stop_sequences, vec!["\n\n".to_string()]);
    }
}
