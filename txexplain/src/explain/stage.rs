//! The terminal stage that turns enriched baggage into an explanation.

use super::machine::{ExplanationLoop, LoopSettings};
use super::prompt::initial_messages;
use super::result::assemble;
use crate::baggage::{keys, Baggage};
use crate::config::ExplainerConfig;
use crate::context::RunContext;
use crate::knowledge::KnowledgeIndex;
use crate::llm::LlmClient;
use crate::stages::{names, Stage};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Runs the explanation loop over the collected prompt contexts and writes
/// [`keys::EXPLANATION`].
#[derive(Debug)]
pub struct ExplainerStage {
    explainer: ExplanationLoop,
    dependencies: Vec<String>,
    explorer_fallback: String,
}

impl ExplainerStage {
    /// Creates the stage from its collaborators and the configuration.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        index: Arc<dyn KnowledgeIndex>,
        config: &ExplainerConfig,
    ) -> Self {
        let dependencies = [
            names::FETCH_TRANSACTION,
            names::TOKEN_METADATA,
            names::TOKEN_TRANSFERS,
            names::ADDRESS_ROLES,
            names::PRICES,
            names::TAGS,
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self {
            explainer: ExplanationLoop::new(llm, index).with_settings(LoopSettings::from(config)),
            dependencies,
            explorer_fallback: config.explorer_fallback.clone(),
        }
    }

    /// Replaces the declared dependencies.
    #[must_use]
    pub fn depends_on(mut self, deps: &[&str]) -> Self {
        self.dependencies = deps.iter().map(|d| (*d).to_string()).collect();
        self
    }
}

#[async_trait]
impl Stage for ExplainerStage {
    fn name(&self) -> &str {
        names::EXPLAIN_TRANSACTION
    }

    fn label(&self) -> &str {
        "Generating explanation"
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    async fn process(&self, ctx: &RunContext, baggage: &mut Baggage) -> anyhow::Result<()> {
        let contexts = baggage.get(&keys::PROMPT_CONTEXTS).cloned().unwrap_or_default();
        debug!(run_id = %ctx.run_id(), contexts = contexts.len(), "Building explanation prompt");
        let messages = initial_messages(baggage.get(&keys::TRANSACTION), &contexts);

        let outcome = self.explainer.run(ctx, messages).await?;
        let result = assemble(
            baggage,
            &outcome,
            &self.explainer.settings().model,
            &self.explorer_fallback,
        );
        baggage.insert(&keys::EXPLANATION, result);
        Ok(())
    }
}
