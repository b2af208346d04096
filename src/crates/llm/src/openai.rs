//! The one concrete backend this client ships: an OpenAI-compatible
//! chat-completions endpoint, reached over `reqwest`. Blocking chat,
//! SSE-token streaming, and tool-calling all funnel through here.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use reqwest_eventsource::{Event, EventSource};
use serde_json::{json, Value};
use tooling::async_utils::retry::RetryPolicy;
use tooling::rate_limit::RateLimiter;

use crate::chat::{ChatConfig, ChatRequest};
use crate::config::OpenAiConfig;
use crate::error::{LlmError, Result};
use crate::message::{Message, MessageContent, MessageRole};
use crate::model::ChatModel;
use crate::response::{ChatResponse, UsageMetadata};
use crate::stream::{MessageChunk, MessageChunkStream};
use crate::tool::{ToolCall, ToolDefinition};

/// Chat client for an OpenAI-compatible endpoint. Cheap to clone: the
/// `reqwest::Client` and rate limiter are both internally `Arc`-backed.
#[derive(Clone)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    http: Client,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        let limiter = RateLimiter::new(config.rate_limit, config.rate_interval);
        let retry = RetryPolicy::new(config.max_retries as usize + 1)
            .with_initial_interval(0.5)
            .with_backoff_factor(2.0);
        Self {
            http: Client::new(),
            limiter,
            retry,
            config,
        }
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }

    fn payload(&self, request: &ChatRequest, stream: bool) -> Value {
        let messages: Vec<Value> = request.messages.iter().map(message_to_wire).collect();
        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "stream": stream,
        });
        let obj = body.as_object_mut().unwrap();
        let cfg = &request.config;
        if let Some(t) = cfg.temperature {
            obj.insert("temperature".into(), json!(t));
        }
        if let Some(m) = cfg.max_tokens {
            obj.insert("max_tokens".into(), json!(m));
        }
        if let Some(p) = cfg.top_p {
            obj.insert("top_p".into(), json!(p));
        }
        if !cfg.stop_sequences.is_empty() {
            obj.insert("stop".into(), json!(cfg.stop_sequences));
        }
        if !cfg.tools.is_empty() {
            obj.insert(
                "tools".into(),
                json!(cfg.tools.iter().map(tool_def_to_wire).collect::<Vec<_>>()),
            );
        }
        if let Some(choice) = &cfg.tool_choice {
            obj.insert("tool_choice".into(), choice.as_wire_value());
        }
        body
    }

    fn effective_timeout(&self, cfg: &ChatConfig) -> Duration {
        cfg.timeout_override.unwrap_or(self.config.timeout)
    }

    /// Issue one HTTP attempt, mapping transport/status failures to the
    /// taxonomy in `error.rs`. Does not retry; callers loop.
    async fn attempt(&self, body: &Value, timeout: Duration) -> Result<Value> {
        let resp = self
            .http
            .post(self.url())
            .bearer_auth(&self.config.api_key)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(e.to_string())
                } else {
                    LlmError::Transport(e)
                }
            })?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<Value>()
                .await
                .map_err(|e| LlmError::InvalidResponse(e.to_string()));
        }

        let body_text = resp.text().await.unwrap_or_default();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                message: body_text,
            });
        }
        Err(LlmError::Upstream {
            status: status.as_u16(),
            message: body_text,
        })
    }

    /// Retry loop: retries only errors `LlmError::is_retryable()` flags,
    /// up to `config.max_retries` additional attempts beyond the first.
    async fn send_with_retry(&self, body: &Value, timeout: Duration) -> Result<Value> {
        self.limiter.acquire().await;
        let mut attempt = 0u32;
        loop {
            match self.attempt(body, timeout).await {
                Ok(v) => return Ok(v),
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.retry.calculate_delay(attempt as usize);
                    tracing::debug!(attempt, ?delay, "retrying llm call after transient error");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) if err.is_retryable() => {
                    return Err(LlmError::TransportExhausted {
                        attempts: attempt + 1,
                        source: Box::new(err),
                    })
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let timeout = self.effective_timeout(&request.config);
        let body = self.payload(&request, false);
        let value = self.send_with_retry(&body, timeout).await?;
        parse_chat_response(&value)
    }

    async fn stream(&self, request: ChatRequest) -> Result<MessageChunkStream> {
        self.limiter.acquire().await;
        let body = self.payload(&request, true);

        let req_builder = self
            .http
            .post(self.url())
            .bearer_auth(&self.config.api_key)
            .json(&body);

        let mut source =
            EventSource::new(req_builder).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let stream = async_stream::try_stream! {
            let mut tool_calls: Vec<ToolCall> = Vec::new();
            let mut finish_reason: Option<String> = None;
            let mut usage: Option<UsageMetadata> = None;

            while let Some(event) = source.next().await {
                match event {
                    Ok(Event::Open) => continue,
                    Ok(Event::Message(message)) => {
                        if message.data == "[DONE]" {
                            break;
                        }
                        let frame: Value = serde_json::from_str(&message.data)
                            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
                        let choice = frame.get("choices").and_then(|c| c.get(0));
                        let delta = choice.and_then(|c| c.get("delta"));

                        if let Some(content) = delta.and_then(|d| d.get("content")).and_then(|c| c.as_str()) {
                            if !content.is_empty() {
                                yield MessageChunk::delta(content);
                            }
                        }
                        if let Some(calls) = delta.and_then(|d| d.get("tool_calls")).and_then(|v| v.as_array()) {
                            merge_tool_call_deltas(&mut tool_calls, calls);
                        }
                        if let Some(reason) = choice.and_then(|c| c.get("finish_reason")).and_then(|r| r.as_str()) {
                            finish_reason = Some(reason.to_string());
                        }
                        if let Some(u) = frame.get("usage") {
                            usage = parse_usage(u);
                        }
                    }
                    Err(reqwest_eventsource::Error::StreamEnded) => break,
                    Err(reqwest_eventsource::Error::Transport(inner)) => {
                        Err(LlmError::Transport(inner))?;
                    }
                    Err(other) => {
                        Err(LlmError::InvalidResponse(other.to_string()))?;
                    }
                }
            }

            let mut final_chunk = MessageChunk::finish(finish_reason.unwrap_or_else(|| "stop".to_string()));
            final_chunk.usage = usage;
            if !tool_calls.is_empty() {
                final_chunk.tool_calls = Some(tool_calls);
            }
            yield final_chunk;
        };

        Ok(Box::pin(stream))
    }

    fn clone_box(&self) -> Box<dyn ChatModel> {
        Box::new(self.clone())
    }
}

fn message_to_wire(msg: &Message) -> Value {
    let role = match &msg.role {
        MessageRole::System => "system",
        MessageRole::Human => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Tool => "tool",
        MessageRole::Custom(s) => s.as_str(),
    };
    let mut value = json!({
        "role": role,
        "content": match &msg.content {
            MessageContent::Text(s) => json!(s),
            MessageContent::Parts(parts) => json!(parts),
        },
    });
    let obj = value.as_object_mut().unwrap();
    if let Some(name) = &msg.name {
        obj.insert("name".into(), json!(name));
    }
    if let Some(id) = &msg.tool_call_id {
        obj.insert("tool_call_id".into(), json!(id));
    }
    if let Some(calls) = &msg.tool_calls {
        obj.insert(
            "tool_calls".into(),
            json!(calls
                .iter()
                .map(|c| json!({
                    "id": c.id,
                    "type": "function",
                    "function": { "name": c.name, "arguments": c.arguments.to_string() },
                }))
                .collect::<Vec<_>>()),
        );
    }
    value
}

fn tool_def_to_wire(def: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": def.name,
            "description": def.description,
            "parameters": def.parameters.clone().unwrap_or_else(|| json!({"type": "object", "properties": {}})),
        },
    })
}

fn parse_usage(value: &Value) -> Option<UsageMetadata> {
    let input = value.get("prompt_tokens")?.as_u64()? as usize;
    let output = value.get("completion_tokens")?.as_u64()? as usize;
    Some(UsageMetadata::new(input, output))
}

fn parse_chat_response(value: &Value) -> Result<ChatResponse> {
    let choice = value
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| LlmError::InvalidResponse("missing choices[0]".into()))?;
    let message_value = choice
        .get("message")
        .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message".into()))?;

    let content = message_value
        .get("content")
        .and_then(|c| c.as_str())
        .unwrap_or_default();
    let mut message = Message::assistant(content);

    if let Some(calls) = message_value.get("tool_calls").and_then(|v| v.as_array()) {
        let parsed: Result<Vec<ToolCall>> = calls
            .iter()
            .map(|c| {
                let id = c
                    .get("id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let function = c
                    .get("function")
                    .ok_or_else(|| LlmError::InvalidResponse("tool_call missing function".into()))?;
                let name = function
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let arguments: Value = function
                    .get("arguments")
                    .and_then(|v| v.as_str())
                    .map(|s| serde_json::from_str(s).unwrap_or(Value::Null))
                    .unwrap_or(Value::Null);
                Ok(ToolCall::new(id, name, arguments))
            })
            .collect();
        message.tool_calls = Some(parsed?);
    }

    let finish_reason = choice
        .get("finish_reason")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let usage = value.get("usage").and_then(parse_usage);

    Ok(ChatResponse {
        message,
        finish_reason,
        usage,
        metadata: Default::default(),
    })
}

fn merge_tool_call_deltas(acc: &mut Vec<ToolCall>, deltas: &[Value]) {
    for delta in deltas {
        let index = delta.get("index").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
        while acc.len() <= index {
            acc.push(ToolCall::new("", "", Value::Null));
        }
        let entry = &mut acc[index];
        if let Some(id) = delta.get("id").and_then(|v| v.as_str()) {
            entry.id = id.to_string();
        }
        if let Some(function) = delta.get("function") {
            if let Some(name) = function.get("name").and_then(|v| v.as_str()) {
                entry.name.push_str(name);
            }
            if let Some(args) = function.get("arguments").and_then(|v| v.as_str()) {
                let existing = match &entry.arguments {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                entry.arguments = Value::String(existing + args);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_includes_tools_and_choice() {
        let client = OpenAiClient::new(OpenAiConfig::new("http://localhost", "key", "gpt-4o-mini"));
        let request = ChatRequest::new(vec![Message::human("hi")])
            .with_tools(vec![ToolDefinition::new("get_weather", "weather lookup")])
            .with_tool_choice(crate::chat::ToolChoice::Auto);
        let body = client.payload(&request, false);
        assert_eq!(body["tool_choice"], json!("auto"));
        assert_eq!(body["tools"][0]["function"]["name"], json!("get_weather"));
    }

    #[test]
    fn parse_chat_response_extracts_tool_calls() {
        let value = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{
                        "id": "call_1",
                        "function": { "name": "get_weather", "arguments": "{\"city\":\"nyc\"}" }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3 }
        });
        let response = parse_chat_response(&value).unwrap();
        let calls = response.message.tool_calls.unwrap();
        assert_eq!(calls[0].name, "get_weather");
        assert_eq!(calls[0].arguments, json!({"city": "nyc"}));
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn upstream_4xx_is_not_retryable() {
        let err = LlmError::Upstream { status: 400, message: "bad request".into() };
        assert!(!err.is_retryable());
        let err = LlmError::Upstream { status: 429, message: "rate limited".into() };
        assert!(err.is_retryable());
    }
}
