//! Dependency-ordered pipeline execution.
//!
//! A [`Pipeline`] holds registered stages, computes a topological order from
//! their declared dependencies and runs them one at a time against a single
//! [`Baggage`](crate::baggage::Baggage).

mod dag;
mod engine;

#[cfg(test)]
mod integration_tests;

pub use dag::DependencyGraph;
pub use engine::{Pipeline, PipelineConfig};
