//! Token-level streaming types.
//!
//! `chat_stream` hands back a lazy, finite sequence of [`MessageChunk`]s.
//! Content deltas arrive as they're produced by the upstream; tool-call
//! deltas are buffered upstream of this crate's consumer and only surfaced
//! assembled, on the final chunk, alongside usage and the finish reason.

use std::pin::Pin;

use futures::Stream;

use crate::error::LlmError;
use crate::response::UsageMetadata;
use crate::tool::ToolCall;

/// A stream of chunks terminated by a chunk with `is_final = true`, or by
/// an error. Restartable only by issuing a fresh `chat_stream` call.
pub type MessageChunkStream = Pin<Box<dyn Stream<Item = Result<MessageChunk, LlmError>> + Send>>;

/// One increment of a streamed response.
#[derive(Debug, Clone, Default)]
pub struct MessageChunk {
    /// Content delta for this chunk. Empty on the final chunk unless the
    /// upstream folds trailing content into it.
    pub content: String,
    /// Set once the upstream's finish reason arrives.
    pub finish_reason: Option<String>,
    /// Assembled tool calls, populated only on the final chunk.
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Usage totals, populated only on the final chunk (if the upstream reports them).
    pub usage: Option<UsageMetadata>,
    /// Whether this is the terminal chunk of the stream.
    pub is_final: bool,
}

impl MessageChunk {
    pub fn delta(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn finish(finish_reason: impl Into<String>) -> Self {
        Self {
            finish_reason: Some(finish_reason.into()),
            is_final: true,
            ..Default::default()
        }
    }
}
