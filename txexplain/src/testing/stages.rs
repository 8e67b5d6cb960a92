//! Test stages.

use crate::baggage::{Baggage, Key};
use crate::context::RunContext;
use crate::stages::{ContextualStage, Stage};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared record of which stages ran, in order.
pub type ExecutionLog = Arc<Mutex<Vec<String>>>;

/// Slot every [`WritingStage`] appends its name to.
pub const TRACE: Key<Vec<String>> = Key::new("trace");

fn owned(deps: &[&str]) -> Vec<String> {
    deps.iter().map(|d| (*d).to_string()).collect()
}

/// A stage that appends its name to a shared log.
#[derive(Debug)]
pub struct RecordingStage {
    name: String,
    dependencies: Vec<String>,
    log: ExecutionLog,
}

impl RecordingStage {
    /// Creates a recording stage.
    #[must_use]
    pub fn new(name: impl Into<String>, dependencies: &[&str], log: &ExecutionLog) -> Self {
        Self {
            name: name.into(),
            dependencies: owned(dependencies),
            log: log.clone(),
        }
    }
}

#[async_trait]
impl Stage for RecordingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    async fn process(&self, _ctx: &RunContext, _baggage: &mut Baggage) -> anyhow::Result<()> {
        self.log.lock().push(self.name.clone());
        Ok(())
    }
}

/// A stage that always fails, after recording that it ran.
#[derive(Debug)]
pub struct FailingStage {
    name: String,
    dependencies: Vec<String>,
    message: String,
    log: Option<ExecutionLog>,
}

impl FailingStage {
    /// Creates a failing stage.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            message: message.into(),
            log: None,
        }
    }

    /// Declares dependencies.
    #[must_use]
    pub fn depends_on(mut self, deps: &[&str]) -> Self {
        self.dependencies = owned(deps);
        self
    }

    /// Records into `log` when run.
    #[must_use]
    pub fn with_log(mut self, log: &ExecutionLog) -> Self {
        self.log = Some(log.clone());
        self
    }
}

#[async_trait]
impl Stage for FailingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    async fn process(&self, _ctx: &RunContext, _baggage: &mut Baggage) -> anyhow::Result<()> {
        if let Some(log) = &self.log {
            log.lock().push(self.name.clone());
        }
        anyhow::bail!("{}", self.message)
    }
}

/// A contextual stage that appends its name to [`TRACE`] and returns a fixed
/// prompt context.
#[derive(Debug)]
pub struct WritingStage {
    name: String,
    dependencies: Vec<String>,
    context: String,
}

impl WritingStage {
    /// Creates a writing stage.
    #[must_use]
    pub fn new(name: impl Into<String>, dependencies: &[&str], context: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: owned(dependencies),
            context: context.into(),
        }
    }
}

#[async_trait]
impl Stage for WritingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    async fn process(&self, _ctx: &RunContext, baggage: &mut Baggage) -> anyhow::Result<()> {
        baggage.get_or_insert_default(&TRACE).push(self.name.clone());
        Ok(())
    }
}

#[async_trait]
impl ContextualStage for WritingStage {
    async fn prompt_context(&self, _ctx: &RunContext, _baggage: &Baggage) -> Option<String> {
        Some(self.context.clone())
    }
}
