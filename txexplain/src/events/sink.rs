//! Progress sink trait and implementations.

use crate::core::StageStatus;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn, Level};
use uuid::Uuid;

/// A single stage transition reported to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// The pipeline run this update belongs to.
    pub run_id: Uuid,
    /// Stage name.
    pub stage: String,
    /// Human-readable stage label.
    pub label: String,
    /// Stage status.
    pub status: StageStatus,
    /// When the transition happened.
    pub timestamp: DateTime<Utc>,
    /// Wall time spent in the stage, for terminal updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Error message, for failed stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressUpdate {
    fn new(run_id: Uuid, stage: &str, label: &str, status: StageStatus) -> Self {
        Self {
            run_id,
            stage: stage.to_string(),
            label: label.to_string(),
            status,
            timestamp: Utc::now(),
            duration_ms: None,
            error: None,
        }
    }

    /// A stage has started.
    #[must_use]
    pub fn running(run_id: Uuid, stage: &str, label: &str) -> Self {
        Self::new(run_id, stage, label, StageStatus::Running)
    }

    /// A stage completed successfully.
    #[must_use]
    pub fn finished(run_id: Uuid, stage: &str, label: &str, duration_ms: u64) -> Self {
        let mut update = Self::new(run_id, stage, label, StageStatus::Finished);
        update.duration_ms = Some(duration_ms);
        update
    }

    /// A stage returned an error.
    #[must_use]
    pub fn failed(
        run_id: Uuid,
        stage: &str,
        label: &str,
        duration_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        let mut update = Self::new(run_id, stage, label, StageStatus::Failed);
        update.duration_ms = Some(duration_ms);
        update.error = Some(error.into());
        update
    }
}

/// Receives stage progress updates.
///
/// Implementations must not block and must not panic; errors are logged and
/// dropped.
pub trait ProgressSink: Send + Sync {
    /// Emits an update without blocking.
    fn try_emit(&self, update: &ProgressUpdate);
}

/// A sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressSink;

impl ProgressSink for NoOpProgressSink {
    fn try_emit(&self, _update: &ProgressUpdate) {}
}

/// A sink that logs updates through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingProgressSink {
    level: Level,
}

impl Default for LoggingProgressSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingProgressSink {
    /// Creates a logging sink at the given level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl ProgressSink for LoggingProgressSink {
    fn try_emit(&self, update: &ProgressUpdate) {
        if update.status == StageStatus::Failed {
            warn!(
                run_id = %update.run_id,
                stage = %update.stage,
                duration_ms = ?update.duration_ms,
                error = ?update.error,
                "{} failed", update.label
            );
            return;
        }

        if self.level == Level::DEBUG {
            debug!(
                run_id = %update.run_id,
                stage = %update.stage,
                status = %update.status,
                duration_ms = ?update.duration_ms,
                "{}", update.label
            );
        } else {
            info!(
                run_id = %update.run_id,
                stage = %update.stage,
                status = %update.status,
                duration_ms = ?update.duration_ms,
                "{}", update.label
            );
        }
    }
}

/// A sink that stores every update, for tests.
#[derive(Debug, Default)]
pub struct CollectingProgressSink {
    updates: RwLock<Vec<ProgressUpdate>>,
}

impl CollectingProgressSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected updates.
    #[must_use]
    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.read().clone()
    }

    /// Returns `(stage, status)` pairs in emission order.
    #[must_use]
    pub fn transitions(&self) -> Vec<(String, StageStatus)> {
        self.updates
            .read()
            .iter()
            .map(|u| (u.stage.clone(), u.status))
            .collect()
    }

    /// Returns the number of collected updates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.updates.read().len()
    }

    /// Returns true if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.read().is_empty()
    }
}

impl ProgressSink for CollectingProgressSink {
    fn try_emit(&self, update: &ProgressUpdate) {
        self.updates.write().push(update.clone());
    }
}

/// A sink that forwards updates into a bounded tokio channel.
///
/// Updates are dropped when the channel is full or closed.
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    sender: mpsc::Sender<ProgressUpdate>,
}

impl ChannelProgressSink {
    /// Creates a sink and the receiving half of its channel.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressUpdate>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl ProgressSink for ChannelProgressSink {
    fn try_emit(&self, update: &ProgressUpdate) {
        if let Err(e) = self.sender.try_send(update.clone()) {
            debug!(stage = %update.stage, "Dropped progress update: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingProgressSink::new();
        let run_id = Uuid::new_v4();
        sink.try_emit(&ProgressUpdate::running(run_id, "prices", "Fetching prices"));
        sink.try_emit(&ProgressUpdate::finished(run_id, "prices", "Fetching prices", 12));

        assert_eq!(sink.len(), 2);
        assert_eq!(
            sink.transitions(),
            vec![
                ("prices".to_string(), StageStatus::Running),
                ("prices".to_string(), StageStatus::Finished),
            ]
        );
        assert_eq!(sink.updates()[1].duration_ms, Some(12));
    }

    #[tokio::test]
    async fn test_channel_sink_drops_when_full() {
        let (sink, mut rx) = ChannelProgressSink::channel(1);
        let run_id = Uuid::new_v4();
        sink.try_emit(&ProgressUpdate::running(run_id, "a", "A"));
        sink.try_emit(&ProgressUpdate::running(run_id, "b", "B"));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.stage, "a");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_closed_receiver() {
        let (sink, rx) = ChannelProgressSink::channel(4);
        drop(rx);
        sink.try_emit(&ProgressUpdate::running(Uuid::new_v4(), "a", "A"));
    }

    #[test]
    fn test_failed_update_serializes_error() {
        let update = ProgressUpdate::failed(Uuid::new_v4(), "rpc", "RPC", 3, "timeout");
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "timeout");
    }
}
