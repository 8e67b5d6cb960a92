//! Error types for the txexplain pipeline.
//!
//! Registration and validation errors are fatal before any stage runs,
//! stage errors abort the remaining pipeline, and retrieval errors are
//! recovered inside the explanation loop.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The main error type for txexplain operations.
#[derive(Debug, Error)]
pub enum ExplainerError {
    /// A pipeline validation error occurred.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A stage was registered twice.
    #[error("{0}")]
    DuplicateStage(#[from] DuplicateStageError),

    /// A cycle was detected among registered stages.
    #[error("{0}")]
    CycleDetected(#[from] CycleDetectedError),

    /// A declared dependency is not registered (strict mode only).
    #[error("{0}")]
    MissingDependency(#[from] MissingDependencyError),

    /// A stage's `process` returned an error.
    #[error("{0}")]
    StageExecution(#[from] StageExecutionError),

    /// The caller cancelled the request.
    #[error("Pipeline cancelled: {0}")]
    Cancelled(String),

    /// The LLM transport failed.
    #[error("{0}")]
    Llm(#[from] LlmError),

    /// The LLM returned nothing usable.
    #[error("{0}")]
    NoResponse(#[from] NoResponseError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExplainerError {
    /// Returns the name of the stage that failed, if this is a stage error.
    #[must_use]
    pub fn failed_stage(&self) -> Option<&str> {
        match self {
            Self::StageExecution(err) => Some(err.stage.as_str()),
            _ => None,
        }
    }

    /// Returns true if the error was caused by cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "PIPELINE-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when pipeline validation fails.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }
}

/// Error raised when a stage name is registered more than once.
#[derive(Debug, Clone, Error)]
#[error("Stage '{stage}' is already registered")]
pub struct DuplicateStageError {
    /// The duplicated stage name.
    pub stage: String,
    /// Contract error info.
    pub error_info: ContractErrorInfo,
}

impl DuplicateStageError {
    /// Creates a new duplicate stage error.
    #[must_use]
    pub fn new(stage: impl Into<String>) -> Self {
        let stage = stage.into();
        let info = ContractErrorInfo::new(
            "PIPELINE-DUPLICATE",
            format!("Stage '{stage}' registered twice"),
        )
        .with_fix_hint("Give every stage a unique name.")
        .with_context_entry("stage", &stage);

        Self {
            stage,
            error_info: info,
        }
    }
}

/// Error raised when a cycle is detected in the stage graph.
#[derive(Debug, Clone, Error)]
#[error("Cycle detected in pipeline: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of stages forming the cycle, first stage repeated at the end.
    pub cycle_path: Vec<String>,
    /// Contract error info.
    pub error_info: ContractErrorInfo,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        let info = ContractErrorInfo::new(
            "PIPELINE-CYCLE",
            format!("Pipeline contains a dependency cycle: {}", cycle_path.join(" -> ")),
        )
        .with_fix_hint("Remove one of the dependencies in the cycle to break it.");

        Self {
            cycle_path,
            error_info: info,
        }
    }
}

/// Error raised in strict mode when a dependency names an unregistered stage.
#[derive(Debug, Clone, Error)]
#[error("Stage '{stage}' depends on unregistered stage '{dependency}'")]
pub struct MissingDependencyError {
    /// The stage declaring the dependency.
    pub stage: String,
    /// The missing dependency.
    pub dependency: String,
    /// Contract error info.
    pub error_info: ContractErrorInfo,
}

impl MissingDependencyError {
    /// Creates a new missing dependency error.
    #[must_use]
    pub fn new(stage: impl Into<String>, dependency: impl Into<String>) -> Self {
        let stage = stage.into();
        let dependency = dependency.into();
        let info = ContractErrorInfo::new(
            "PIPELINE-MISSING_DEP",
            format!("Dependency '{dependency}' not registered"),
        )
        .with_fix_hint("Register the dependency or disable strict dependency checking.")
        .with_context_entry("stage", &stage);

        Self {
            stage,
            dependency,
            error_info: info,
        }
    }
}

/// Error raised when a stage's `process` fails.
///
/// Wraps the collaborator's error with the failing stage's name.
#[derive(Debug)]
pub struct StageExecutionError {
    /// The failing stage.
    pub stage: String,
    /// The underlying error.
    pub source: anyhow::Error,
}

impl StageExecutionError {
    /// Creates a new stage execution error.
    #[must_use]
    pub fn new(stage: impl Into<String>, source: anyhow::Error) -> Self {
        Self {
            stage: stage.into(),
            source,
        }
    }
}

impl fmt::Display for StageExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stage '{}' failed: {:#}", self.stage, self.source)
    }
}

impl std::error::Error for StageExecutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let err: &(dyn std::error::Error + 'static) = self.source.as_ref();
        Some(err)
    }
}

/// Errors from the LLM transport.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// The HTTP request failed or returned an error status.
    #[error("LLM request failed: {message}")]
    ApiRequest {
        /// Description of the failure.
        message: String,
    },

    /// Authentication was rejected or no API key was configured.
    #[error("LLM authentication failed: {provider}")]
    AuthFailed {
        /// Provider description.
        provider: String,
    },

    /// The provider rate limited the request.
    #[error("LLM rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Suggested wait before retrying.
        retry_after_secs: u64,
    },

    /// The response body could not be parsed.
    #[error("Failed to parse LLM response: {message}")]
    ResponseParse {
        /// Description of the parse failure.
        message: String,
    },

    /// The request was abandoned because the caller cancelled.
    #[error("LLM request cancelled")]
    Cancelled,
}

/// Error raised when the model returns no choices.
#[derive(Debug, Clone, Error)]
#[error("LLM returned no response (model: {model})")]
pub struct NoResponseError {
    /// The model that was queried.
    pub model: String,
}

impl NoResponseError {
    /// Creates a new no-response error.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

/// Errors from a retrieval function call. Never fatal to the explanation loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrievalError {
    /// The model supplied arguments that could not be parsed.
    #[error("Invalid arguments for {function}: {reason}")]
    InvalidArguments {
        /// The function that was called.
        function: String,
        /// Why the arguments were rejected.
        reason: String,
    },

    /// The model called a function that does not exist.
    #[error("Unknown function: {name}")]
    UnknownFunction {
        /// The requested function name.
        name: String,
    },

    /// The search backend failed.
    #[error("Search backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}
