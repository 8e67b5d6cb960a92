//! A scripted LLM client.

use crate::errors::LlmError;
use crate::llm::{ChatMessage, ChatRequest, ChatResponse, LlmClient, ToolCall};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// A response carrying a plain assistant answer.
#[must_use]
pub fn assistant_text(content: &str) -> ChatResponse {
    ChatResponse::from_message(ChatMessage::assistant(content))
}

/// A response requesting tool calls.
#[must_use]
pub fn assistant_tool_calls(calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse::from_message(ChatMessage::assistant_tool_calls(None, calls))
}

/// Replays queued responses in order and records every request.
///
/// An exhausted script answers with an `ApiRequest` error.
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<ChatResponse, LlmError>>>,
    requests: Mutex<Vec<ChatRequest>>,
    delay: Option<Duration>,
}

impl ScriptedLlm {
    /// Creates an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a script from successful responses.
    #[must_use]
    pub fn with_responses(responses: impl IntoIterator<Item = ChatResponse>) -> Self {
        let llm = Self::new();
        for response in responses {
            llm.push(Ok(response));
        }
        llm
    }

    /// Sleeps this long before answering each request.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queues a response.
    pub fn push(&self, response: Result<ChatResponse, LlmError>) {
        self.responses.lock().push_back(response);
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        self.requests.lock().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::ApiRequest {
                    message: "script exhausted".to_string(),
                })
            })
    }
}
