//! The `ChatModel` trait: the one seam every LLM backend implements.

use async_trait::async_trait;

use crate::chat::ChatRequest;
use crate::error::Result;
use crate::response::ChatResponse;
use crate::stream::MessageChunkStream;
use crate::tool::ToolDefinition;

/// A chat-completions backend. Implementors provide `chat` and `stream`;
/// `chat_with_tools` and `is_available` have useful defaults.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Single blocking call; returns a populated response.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Token-streamed call. Finite; terminates when the upstream finish
    /// reason arrives. Restartable only by calling `stream` again from
    /// the beginning.
    async fn stream(&self, request: ChatRequest) -> Result<MessageChunkStream>;

    /// Identical to `chat` but sets `tool_choice=auto` and documents that
    /// `tool_calls` may be populated on the response.
    async fn chat_with_tools(
        &self,
        mut request: ChatRequest,
        tools: Vec<ToolDefinition>,
    ) -> Result<ChatResponse> {
        request.config.tools = tools;
        request.config.tool_choice = Some(crate::chat::ToolChoice::Auto);
        self.chat(request).await
    }

    /// Cheap reachability probe. Defaults to `true`; backends without a
    /// dedicated health endpoint need not override this.
    async fn is_available(&self) -> Result<bool> {
        Ok(true)
    }

    fn clone_box(&self) -> Box<dyn ChatModel>;
}

impl Clone for Box<dyn ChatModel> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
