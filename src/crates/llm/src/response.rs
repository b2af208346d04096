//! Response types returned from a completed chat call.

use std::collections::HashMap;

use serde_json::Value;

use crate::message::Message;

/// Token accounting for a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageMetadata {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

impl UsageMetadata {
    pub fn new(input_tokens: usize, output_tokens: usize) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}

/// The result of a completed, non-streamed chat call.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub message: Message,
    pub finish_reason: Option<String>,
    pub usage: Option<UsageMetadata>,
    pub metadata: HashMap<String, Value>,
}
