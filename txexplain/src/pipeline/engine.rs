//! The sequential pipeline engine.

use super::DependencyGraph;
use crate::baggage::{keys, Baggage};
use crate::context::RunContext;
use crate::core::PromptContribution;
use crate::errors::{
    DuplicateStageError, ExplainerError, MissingDependencyError, PipelineValidationError,
    StageExecutionError,
};
use crate::events::ProgressUpdate;
use crate::stages::{ContextualStage, RegisteredStage, Stage};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Engine options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Fail before running when a declared dependency is not registered.
    #[serde(default)]
    pub strict_dependencies: bool,
}

/// A set of registered stages executed in dependency order.
#[derive(Debug)]
pub struct Pipeline {
    name: String,
    config: PipelineConfig,
    stages: Vec<RegisteredStage>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: PipelineConfig::default(),
            stages: Vec::new(),
        }
    }

    /// Sets the engine options.
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// The pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of registered stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if no stage is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Registered stage names in registration order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(RegisteredStage::name).collect()
    }

    /// Adds a stage.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateStage` if a stage of the same name is already
    /// registered and `Validation` if the name is empty.
    pub fn register(&mut self, stage: RegisteredStage) -> Result<(), ExplainerError> {
        let name = stage.name();
        if name.trim().is_empty() {
            return Err(PipelineValidationError::new("Stage name must not be empty").into());
        }
        if self.stages.iter().any(|s| s.name() == name) {
            return Err(DuplicateStageError::new(name).into());
        }
        debug!(pipeline = %self.name, stage = %name, "Registered stage");
        self.stages.push(stage);
        Ok(())
    }

    /// Registers an enrichment-only stage.
    pub fn register_enrichment(&mut self, stage: impl Stage + 'static) -> Result<(), ExplainerError> {
        self.register(RegisteredStage::enrichment(stage))
    }

    /// Registers a stage that contributes prompt context.
    pub fn register_contextual(
        &mut self,
        stage: impl ContextualStage + 'static,
    ) -> Result<(), ExplainerError> {
        self.register(RegisteredStage::contextual(stage))
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_stage(mut self, stage: RegisteredStage) -> Result<Self, ExplainerError> {
        self.register(stage)?;
        Ok(self)
    }

    fn graph(&self) -> DependencyGraph {
        DependencyGraph::build(
            self.stages
                .iter()
                .map(|stage| (stage.name(), stage.dependencies())),
        )
    }

    fn plan(&self) -> Result<Vec<usize>, ExplainerError> {
        let graph = self.graph();
        if let Some((stage, dependency)) = graph.missing().first() {
            if self.config.strict_dependencies {
                return Err(MissingDependencyError::new(stage, dependency).into());
            }
            for (stage, dependency) in graph.missing() {
                debug!(
                    pipeline = %self.name,
                    stage = %stage,
                    dependency = %dependency,
                    "Ignoring dependency on unregistered stage"
                );
            }
        }
        graph.execution_order().map_err(Into::into)
    }

    /// Validates the pipeline and returns the stage names in the order `run`
    /// would execute them.
    pub fn execution_order(&self) -> Result<Vec<String>, ExplainerError> {
        Ok(self
            .plan()?
            .into_iter()
            .map(|i| self.stages[i].name().to_string())
            .collect())
    }

    /// Runs every stage once in dependency order.
    ///
    /// Returns the enriched baggage, or the first error. On error the partial
    /// baggage is dropped.
    pub async fn run(&self, ctx: &RunContext, mut baggage: Baggage) -> Result<Baggage, ExplainerError> {
        let order = self.plan()?;
        let run_id = ctx.run_id();
        let started = Instant::now();
        info!(
            pipeline = %self.name,
            run_id = %run_id,
            stages = order.len(),
            "Pipeline started"
        );

        for index in order {
            ctx.check_cancelled()?;

            let stage = &self.stages[index];
            let (name, label) = (stage.name(), stage.label());
            ctx.emit(&ProgressUpdate::running(run_id, name, label));
            let stage_started = Instant::now();

            if let Err(err) = stage.process(ctx, &mut baggage).await {
                let elapsed = elapsed_ms(stage_started);
                ctx.emit(&ProgressUpdate::failed(
                    run_id,
                    name,
                    label,
                    elapsed,
                    format!("{err:#}"),
                ));
                warn!(
                    pipeline = %self.name,
                    run_id = %run_id,
                    stage = %name,
                    duration_ms = elapsed,
                    "Stage failed: {:#}", err
                );
                if let Some(ExplainerError::Cancelled(reason)) = err.downcast_ref::<ExplainerError>() {
                    return Err(ExplainerError::Cancelled(reason.clone()));
                }
                return Err(StageExecutionError::new(name, err).into());
            }

            if let Some(context) = stage.prompt_context(ctx, &baggage).await {
                let context = context.trim();
                if !context.is_empty() {
                    baggage
                        .get_or_insert_default(&keys::PROMPT_CONTEXTS)
                        .push(PromptContribution {
                            stage: name.to_string(),
                            context: context.to_string(),
                        });
                }
            }

            let elapsed = elapsed_ms(stage_started);
            ctx.emit(&ProgressUpdate::finished(run_id, name, label, elapsed));
            debug!(
                pipeline = %self.name,
                run_id = %run_id,
                stage = %name,
                duration_ms = elapsed,
                "Stage finished"
            );
        }

        info!(
            pipeline = %self.name,
            run_id = %run_id,
            duration_ms = elapsed_ms(started),
            "Pipeline completed"
        );
        Ok(baggage)
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
