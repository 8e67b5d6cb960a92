//! Progress side-channel for pipeline runs.
//!
//! The engine reports every stage transition to a [`ProgressSink`]. Sinks are
//! best-effort: emission never blocks and never fails the run.

mod sink;

pub use sink::{
    ChannelProgressSink, CollectingProgressSink, LoggingProgressSink, NoOpProgressSink,
    ProgressSink, ProgressUpdate,
};
