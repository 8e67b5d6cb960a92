//! The tool-calling conversation as an explicit state machine.
//!
//! ```text
//! Start --PromptBuilt--> AwaitingModel --FinalAnswer--> Done
//!                        AwaitingModel --ToolCallsRequested--> ExecutingTools
//!                        ExecutingTools --ToolsCompleted--> AwaitingModel
//! Start | AwaitingModel | ExecutingTools --Failed--> Failed
//! ```

use super::prompt::FINAL_ANSWER_INSTRUCTION;
use super::tools::{execute_call, retrieval_tools};
use crate::config::ExplainerConfig;
use crate::context::RunContext;
use crate::errors::{ExplainerError, LlmError, NoResponseError};
use crate::knowledge::KnowledgeIndex;
use crate::llm::{ChatMessage, ChatRequest, LlmClient, ToolChoice};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Prompt not yet sent.
    Start,
    /// Waiting on a model turn.
    AwaitingModel,
    /// Running the requested retrieval calls.
    ExecutingTools,
    /// A final answer was produced.
    Done,
    /// The loop aborted.
    Failed,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::AwaitingModel => "awaiting_model",
            Self::ExecutingTools => "executing_tools",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Inputs that drive the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEvent {
    /// The opening messages are ready.
    PromptBuilt,
    /// The model answered in text, or its calls were ignored.
    FinalAnswer,
    /// The model requested tool calls within the round budget.
    ToolCallsRequested,
    /// Every requested call has a result message.
    ToolsCompleted,
    /// Transport error, a turn with neither content nor calls, or
    /// cancellation.
    Failed,
}

/// The transition table.
///
/// # Errors
///
/// Returns `Internal` for any pair not in the table.
pub fn transition(state: LoopState, event: LoopEvent) -> Result<LoopState, ExplainerError> {
    use LoopEvent as E;
    use LoopState as S;

    match (state, event) {
        (S::Start, E::PromptBuilt) | (S::ExecutingTools, E::ToolsCompleted) => Ok(S::AwaitingModel),
        (S::AwaitingModel, E::FinalAnswer) => Ok(S::Done),
        (S::AwaitingModel, E::ToolCallsRequested) => Ok(S::ExecutingTools),
        (S::Start | S::AwaitingModel | S::ExecutingTools, E::Failed) => Ok(S::Failed),
        (state, event) => Err(ExplainerError::Internal(format!(
            "illegal explanation loop transition: {state} on {event:?}"
        ))),
    }
}

#[derive(Debug)]
struct Tracker {
    state: LoopState,
    history: Vec<LoopState>,
}

impl Tracker {
    fn new() -> Self {
        Self {
            state: LoopState::Start,
            history: vec![LoopState::Start],
        }
    }

    fn advance(&mut self, event: LoopEvent) -> Result<(), ExplainerError> {
        let next = transition(self.state, event)?;
        debug!(from = %self.state, to = %next, "Explanation loop transition");
        self.state = next;
        self.history.push(next);
        Ok(())
    }
}

/// Model and round settings for the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    /// Chat model id.
    pub model: String,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Output token cap.
    pub max_tokens: Option<u32>,
    /// Tool-calling rounds allowed before content is taken as final.
    pub max_tool_rounds: usize,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from(&ExplainerConfig::default())
    }
}

impl From<&ExplainerConfig> for LoopSettings {
    fn from(config: &ExplainerConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: Some(config.temperature),
            max_tokens: Some(config.max_tokens),
            max_tool_rounds: config.max_tool_rounds,
        }
    }
}

/// What a finished loop produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopOutcome {
    /// The model's final text.
    pub content: String,
    /// Model requests issued.
    pub model_turns: usize,
    /// Retrieval calls executed.
    pub tool_calls: usize,
    /// Retrieval calls that degraded to an error result.
    pub retrieval_errors: usize,
    /// Tool-call requests ignored once the round budget was spent.
    pub ignored_tool_calls: usize,
    /// States visited, starting with `Start`.
    pub states: Vec<LoopState>,
    /// Full conversation including the final assistant message.
    pub transcript: Vec<ChatMessage>,
}

#[derive(Debug, Default)]
struct Counters {
    model_turns: usize,
    tool_calls: usize,
    retrieval_errors: usize,
    ignored_tool_calls: usize,
}

/// Runs the retrieval-augmented conversation.
pub struct ExplanationLoop {
    llm: Arc<dyn LlmClient>,
    index: Arc<dyn KnowledgeIndex>,
    settings: LoopSettings,
}

impl fmt::Debug for ExplanationLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplanationLoop")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ExplanationLoop {
    /// Creates a loop over an LLM client and a knowledge index.
    pub fn new(llm: Arc<dyn LlmClient>, index: Arc<dyn KnowledgeIndex>) -> Self {
        Self {
            llm,
            index,
            settings: LoopSettings::default(),
        }
    }

    /// Sets the model and round settings.
    #[must_use]
    pub fn with_settings(mut self, settings: LoopSettings) -> Self {
        self.settings = settings;
        self
    }

    /// The active settings.
    #[must_use]
    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    fn request(&self, messages: &[ChatMessage], rounds_left: bool) -> ChatRequest {
        ChatRequest {
            model: self.settings.model.clone(),
            messages: messages.to_vec(),
            tools: retrieval_tools(),
            tool_choice: Some(if rounds_left {
                ToolChoice::Auto
            } else {
                ToolChoice::None
            }),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }

    /// Drives the conversation from `messages` to a final answer.
    ///
    /// Retrieval failures are fed back to the model as annotated empty
    /// results. Transport errors, turns with no choices or no output at all,
    /// and cancellation abort.
    pub async fn run(
        &self,
        ctx: &RunContext,
        messages: Vec<ChatMessage>,
    ) -> Result<LoopOutcome, ExplainerError> {
        let mut tracker = Tracker::new();
        let mut counters = Counters::default();
        match self.drive(ctx, messages, &mut tracker, &mut counters).await {
            Ok((content, transcript)) => {
                info!(
                    run_id = %ctx.run_id(),
                    model_turns = counters.model_turns,
                    tool_calls = counters.tool_calls,
                    retrieval_errors = counters.retrieval_errors,
                    "Explanation produced"
                );
                Ok(LoopOutcome {
                    content,
                    model_turns: counters.model_turns,
                    tool_calls: counters.tool_calls,
                    retrieval_errors: counters.retrieval_errors,
                    ignored_tool_calls: counters.ignored_tool_calls,
                    states: tracker.history,
                    transcript,
                })
            }
            Err(err) => {
                if let Err(illegal) = tracker.advance(LoopEvent::Failed) {
                    warn!("{}", illegal);
                }
                warn!(run_id = %ctx.run_id(), state = %tracker.state, "Explanation loop failed: {}", err);
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        ctx: &RunContext,
        mut messages: Vec<ChatMessage>,
        tracker: &mut Tracker,
        counters: &mut Counters,
    ) -> Result<(String, Vec<ChatMessage>), ExplainerError> {
        tracker.advance(LoopEvent::PromptBuilt)?;
        let mut rounds = 0;

        loop {
            ctx.check_cancelled()?;
            let rounds_left = rounds < self.settings.max_tool_rounds;
            let request = self.request(&messages, rounds_left);

            counters.model_turns += 1;
            debug!(
                run_id = %ctx.run_id(),
                round = rounds,
                turn = counters.model_turns,
                "Requesting model turn"
            );
            let response = tokio::select! {
                biased;
                () = ctx.cancellation().cancelled() => {
                    return Err(cancelled(ctx));
                }
                response = self.llm.complete(request) => response,
            };
            let response = match response {
                Ok(response) => response,
                Err(LlmError::Cancelled) => return Err(cancelled(ctx)),
                Err(err) => return Err(err.into()),
            };

            let message = response
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message)
                .ok_or_else(|| NoResponseError::new(&self.settings.model))?;
            let calls = message.calls().to_vec();

            if calls.is_empty() || !rounds_left {
                if !calls.is_empty() {
                    counters.ignored_tool_calls += calls.len();
                    warn!(
                        run_id = %ctx.run_id(),
                        ignored = calls.len(),
                        "Tool round budget spent, ignoring further tool calls"
                    );
                }
                if calls.is_empty() && message.content.is_none() {
                    return Err(NoResponseError::new(&self.settings.model).into());
                }
                let content = message.content.unwrap_or_default().trim().to_string();
                tracker.advance(LoopEvent::FinalAnswer)?;
                messages.push(ChatMessage::assistant(content.clone()));
                return Ok((content, messages));
            }

            tracker.advance(LoopEvent::ToolCallsRequested)?;
            rounds += 1;
            messages.push(ChatMessage::assistant_tool_calls(
                message.content.clone(),
                calls.clone(),
            ));

            for call in &calls {
                ctx.check_cancelled()?;
                let execution = execute_call(self.index.as_ref(), call);
                counters.tool_calls += 1;
                if execution.error.is_some() {
                    counters.retrieval_errors += 1;
                }
                debug!(
                    run_id = %ctx.run_id(),
                    tool = %call.function.name,
                    round = rounds,
                    found = execution.response.found,
                    "Tool call executed"
                );
                messages.push(ChatMessage::tool_result(
                    call.id.clone(),
                    execution.response.to_tool_content(),
                ));
            }

            if rounds >= self.settings.max_tool_rounds {
                messages.push(ChatMessage::user(FINAL_ANSWER_INSTRUCTION));
            }
            tracker.advance(LoopEvent::ToolsCompleted)?;
        }
    }
}

fn cancelled(ctx: &RunContext) -> ExplainerError {
    ExplainerError::Cancelled(
        ctx.cancellation()
            .reason()
            .unwrap_or_else(|| "cancelled".to_string()),
    )
}
