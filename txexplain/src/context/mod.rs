//! Per-request execution context.

mod run;

pub use run::RunContext;
