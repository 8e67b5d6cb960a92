//! Stage trait and implementations.
//!
//! Stages are the units of enrichment work in a pipeline. A stage declares
//! the stages it depends on, reads and writes [`Baggage`] in `process`, and
//! optionally contributes a snippet of prompt context for the explanation.

mod token_metadata;
mod transaction;

pub use token_metadata::{TokenMetadataSource, TokenMetadataStage};
pub use transaction::{FetchTransactionStage, TransactionSource};

#[cfg(test)]
pub use token_metadata::MockTokenMetadataSource;
#[cfg(test)]
pub use transaction::MockTransactionSource;

use crate::baggage::Baggage;
use crate::context::RunContext;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Names of the built-in and conventional collaborator stages.
pub mod names {
    /// Fetches the raw transaction and receipt.
    pub const FETCH_TRANSACTION: &str = "fetch_transaction";
    /// Resolves token contract metadata.
    pub const TOKEN_METADATA: &str = "token_metadata";
    /// Decodes token and NFT transfers from logs.
    pub const TOKEN_TRANSFERS: &str = "token_transfers";
    /// Classifies participant addresses.
    pub const ADDRESS_ROLES: &str = "address_roles";
    /// Looks up token prices.
    pub const PRICES: &str = "prices";
    /// Derives classification tags.
    pub const TAGS: &str = "tags";
    /// The terminal explanation stage.
    pub const EXPLAIN_TRANSACTION: &str = "explain_transaction";
}

/// Trait for pipeline stages.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the unique name of the stage.
    fn name(&self) -> &str;

    /// Human-readable label used in progress updates.
    fn label(&self) -> &str {
        self.name()
    }

    /// Names of the stages that must run before this one.
    ///
    /// Names that are never registered are ignored unless the pipeline runs
    /// in strict mode.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Executes the stage against the run's shared state.
    async fn process(&self, ctx: &RunContext, baggage: &mut Baggage) -> anyhow::Result<()>;
}

/// A stage that also contributes lightweight text to the explanation prompt.
#[async_trait]
pub trait ContextualStage: Stage {
    /// Returns the stage's prompt context, read after `process` succeeds.
    async fn prompt_context(&self, ctx: &RunContext, baggage: &Baggage) -> Option<String>;
}

/// A registered stage and the capabilities it offers.
#[derive(Debug, Clone)]
pub enum RegisteredStage {
    /// A stage that only enriches the baggage.
    Enrichment(Arc<dyn Stage>),
    /// A stage that enriches the baggage and contributes prompt context.
    WithPromptContext(Arc<dyn ContextualStage>),
}

impl RegisteredStage {
    /// Wraps an enrichment-only stage.
    pub fn enrichment(stage: impl Stage + 'static) -> Self {
        Self::Enrichment(Arc::new(stage))
    }

    /// Wraps a stage with prompt context.
    pub fn contextual(stage: impl ContextualStage + 'static) -> Self {
        Self::WithPromptContext(Arc::new(stage))
    }

    /// The stage's name.
    pub fn name(&self) -> &str {
        match self {
            Self::Enrichment(stage) => stage.name(),
            Self::WithPromptContext(stage) => stage.name(),
        }
    }

    /// The stage's label.
    pub fn label(&self) -> &str {
        match self {
            Self::Enrichment(stage) => stage.label(),
            Self::WithPromptContext(stage) => stage.label(),
        }
    }

    /// The stage's declared dependencies.
    pub fn dependencies(&self) -> Vec<String> {
        match self {
            Self::Enrichment(stage) => stage.dependencies(),
            Self::WithPromptContext(stage) => stage.dependencies(),
        }
    }

    /// Returns true if the stage contributes prompt context.
    pub fn has_prompt_context(&self) -> bool {
        matches!(self, Self::WithPromptContext(_))
    }

    /// Runs the stage.
    pub async fn process(&self, ctx: &RunContext, baggage: &mut Baggage) -> anyhow::Result<()> {
        match self {
            Self::Enrichment(stage) => stage.process(ctx, baggage).await,
            Self::WithPromptContext(stage) => stage.process(ctx, baggage).await,
        }
    }

    /// Reads the stage's prompt context, if it has the capability.
    pub async fn prompt_context(&self, ctx: &RunContext, baggage: &Baggage) -> Option<String> {
        match self {
            Self::Enrichment(_) => None,
            Self::WithPromptContext(stage) => stage.prompt_context(ctx, baggage).await,
        }
    }
}

/// A simple function-based stage.
pub struct FnStage<F>
where
    F: Fn(&mut Baggage) -> anyhow::Result<()> + Send + Sync,
{
    name: String,
    dependencies: Vec<String>,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(&mut Baggage) -> anyhow::Result<()> + Send + Sync,
{
    /// Creates a new function-based stage.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            func,
        }
    }

    /// Declares dependencies.
    #[must_use]
    pub fn depends_on(mut self, deps: &[&str]) -> Self {
        self.dependencies = deps.iter().map(|d| (*d).to_string()).collect();
        self
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(&mut Baggage) -> anyhow::Result<()> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(&mut Baggage) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    async fn process(&self, _ctx: &RunContext, baggage: &mut Baggage) -> anyhow::Result<()> {
        (self.func)(baggage)
    }
}
