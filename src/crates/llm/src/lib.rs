//! OpenAI-compatible chat client.
//!
//! This is the leaf crate of the core: every other crate in the workspace
//! depends on it for the conversational message vocabulary (`Message`),
//! the `ChatModel` seam, and the request/response/tool types that flow
//! through a chat call. It owns local rate limiting and retry with
//! exponential backoff so every backend gets both for free.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::{ChatModel, ChatRequest, Message, OpenAiClient, OpenAiConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OpenAiConfig::from_env(
//!         "OPENAI_BASE_URL",
//!         "OPENAI_API_KEY",
//!         "OPENAI_MODEL",
//!     )?;
//!     let client = OpenAiClient::new(config);
//!
//!     let request = ChatRequest::new(vec![Message::human("Explain quantum computing briefly")])
//!         .with_temperature(0.7);
//!
//!     let response = client.chat(request).await?;
//!     println!("{}", response.message.text().unwrap());
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod config;
pub mod error;
pub mod message;
pub mod model;
pub mod openai;
pub mod response;
pub mod stream;
pub mod tool;

pub use chat::{ChatConfig, ChatRequest, ToolChoice};
pub use config::OpenAiConfig;
pub use error::{LlmError, Result};
pub use message::{Message, MessageContent, MessageRole};
pub use model::ChatModel;
pub use openai::OpenAiClient;
pub use response::{ChatResponse, UsageMetadata};
pub use stream::{MessageChunk, MessageChunkStream};
pub use tool::{ToolCall, ToolDefinition, ToolResult};
