//! The context handed to every stage of a run.

use crate::cancellation::CancellationToken;
use crate::errors::ExplainerError;
use crate::events::{NoOpProgressSink, ProgressSink, ProgressUpdate};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Identity, cancellation and progress reporting for one request.
///
/// Cheap to clone; clones share the same token and sink.
#[derive(Clone)]
pub struct RunContext {
    run_id: Uuid,
    network_id: u64,
    started_at: DateTime<Utc>,
    cancel: Arc<CancellationToken>,
    progress: Arc<dyn ProgressSink>,
}

impl RunContext {
    /// Creates a context for a request on `network_id`.
    #[must_use]
    pub fn new(network_id: u64) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            network_id,
            started_at: Utc::now(),
            cancel: Arc::new(CancellationToken::new()),
            progress: Arc::new(NoOpProgressSink),
        }
    }

    /// Shares an existing cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancel = token;
        self
    }

    /// Sets the progress sink.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// The unique id of this run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The chain id the request targets.
    #[must_use]
    pub fn network_id(&self) -> u64 {
        self.network_id
    }

    /// When the context was created.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The request's cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns `Err(Cancelled)` if the caller has cancelled the request.
    pub fn check_cancelled(&self) -> Result<(), ExplainerError> {
        if self.cancel.is_cancelled() {
            let reason = self
                .cancel
                .reason()
                .unwrap_or_else(|| "cancelled".to_string());
            return Err(ExplainerError::Cancelled(reason));
        }
        Ok(())
    }

    pub(crate) fn emit(&self, update: &ProgressUpdate) {
        self.progress.try_emit(update);
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.run_id)
            .field("network_id", &self.network_id)
            .field("started_at", &self.started_at)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
