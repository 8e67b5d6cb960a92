//! Test doubles for pipelines and the explanation loop.
//!
//! This module provides:
//! - Stages that record, fail or contribute prompt context
//! - A scripted LLM client that replays queued responses
//! - A knowledge index that always fails

mod index;
mod llm;
mod stages;

pub use index::FailingIndex;
pub use llm::{assistant_text, assistant_tool_calls, ScriptedLlm};
pub use stages::{ExecutionLog, FailingStage, RecordingStage, WritingStage, TRACE};
