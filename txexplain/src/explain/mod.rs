//! Retrieval-augmented explanation.
//!
//! The [`ExplainerStage`] runs last in a pipeline. It builds a prompt from
//! the contexts the enrichment stages contributed, lets the model call the
//! knowledge-base [retrieval functions](RetrievalFunction), and assembles an
//! [`ExplanationResult`] from the model's answer and the enriched baggage.

mod machine;
mod prompt;
mod result;
mod stage;
mod tools;


pub use machine::{transition, ExplanationLoop, LoopEvent, LoopOutcome, LoopSettings, LoopState};
pub use prompt::{initial_messages, user_prompt, FINAL_ANSWER_INSTRUCTION, SYSTEM_PROMPT};
pub use result::{assemble, build_links, map_status, parse_hex_u64, ExplanationResult};
pub use stage::ExplainerStage;
pub use tools::{execute_call, retrieval_tools, RetrievalFunction, ToolExecution};

use crate::baggage::{keys, Baggage, SnapshotPolicy};
use crate::context::RunContext;
use crate::core::TransactionRequest;
use crate::errors::ExplainerError;
use crate::pipeline::Pipeline;
use tracing::{debug, info};

/// Explains one transaction by running `pipeline` over a fresh baggage
/// seeded with `request`.
///
/// # Errors
///
/// Returns the pipeline's error, or `Internal` if the pipeline finished
/// without an explanation stage writing a result.
pub async fn explain_transaction(
    pipeline: &Pipeline,
    ctx: &RunContext,
    request: TransactionRequest,
) -> Result<ExplanationResult, ExplainerError> {
    info!(
        run_id = %ctx.run_id(),
        network_id = request.network_id,
        hash = %request.hash,
        "Explaining transaction"
    );
    let seeded = Baggage::new().with(&keys::REQUEST, request);
    let mut baggage = pipeline.run(ctx, seeded).await?;

    debug!(
        run_id = %ctx.run_id(),
        baggage = %baggage.sanitized_snapshot(&SnapshotPolicy::default()),
        "Final baggage"
    );

    baggage.take(&keys::EXPLANATION).ok_or_else(|| {
        ExplainerError::Internal(format!(
            "pipeline '{}' finished without writing an explanation",
            pipeline.name()
        ))
    })
}
