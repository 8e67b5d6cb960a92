//! Chat-completions client used by the explanation loop.

#[cfg(feature = "openai")]
mod openai;
mod types;

#[cfg(feature = "openai")]
pub use openai::OpenAiClient;
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, Choice, FunctionCall, FunctionDefinition, Role,
    ToolCall, ToolChoice, ToolDefinition, Usage,
};

use crate::errors::LlmError;
use async_trait::async_trait;

/// A chat-completions endpoint with tool calling.
///
/// Implementations own timeout and retry policy; callers issue exactly one
/// request per call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends one completion request.
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LlmError>;
}
