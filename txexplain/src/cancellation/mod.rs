//! Cooperative cancellation for pipeline runs.
//!
//! A single [`CancellationToken`] is shared by the engine and the explanation
//! loop of one request. The engine polls it between stages; the loop races
//! every model call against [`CancellationToken::cancelled`].

mod token;

pub use token::{CancelCallback, CancellationToken};
