//! # txexplain
//!
//! Explains blockchain transactions in plain language.
//!
//! A request flows through a [`Pipeline`](pipeline::Pipeline) of enrichment
//! stages that share a typed [`Baggage`](baggage::Baggage). Stages can
//! contribute prompt context; the final
//! [`ExplainerStage`](explain::ExplainerStage) hands that context to an LLM,
//! lets it query a local knowledge base through tool calls, and assembles an
//! [`ExplanationResult`](explain::ExplanationResult).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use txexplain::prelude::*;
//!
//! let config = ExplainerConfig::default();
//! let mut pipeline = Pipeline::new("explain").with_config(config.pipeline_config());
//! pipeline.register_contextual(FetchTransactionStage::new(rpc))?;
//! pipeline.register_contextual(TokenMetadataStage::new(tokens, cache))?;
//! pipeline.register_enrichment(ExplainerStage::new(llm, knowledge, &config))?;
//!
//! let ctx = RunContext::new(1);
//! let result = explain_transaction(&pipeline, &ctx, TransactionRequest::new(1, hash)).await?;
//! println!("{}", result.summary);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod baggage;
pub mod cache;
pub mod cancellation;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod explain;
pub mod knowledge;
pub mod llm;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::baggage::{keys, Baggage, Key, SnapshotPolicy};
    pub use crate::cache::{Cache, CacheConfig, CacheDomain, CacheKey, InMemoryCache};
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{ExplainerConfig, LlmConfig};
    pub use crate::context::RunContext;
    pub use crate::core::{
        AddressRole, NetworkInfo, PromptContribution, StageStatus, TokenMetadata, TokenTransfer,
        TransactionData, TransactionRequest,
    };
    pub use crate::errors::{ExplainerError, LlmError, RetrievalError};
    pub use crate::events::{
        ChannelProgressSink, LoggingProgressSink, NoOpProgressSink, ProgressSink, ProgressUpdate,
    };
    pub use crate::explain::{explain_transaction, ExplainerStage, ExplanationResult};
    pub use crate::knowledge::{KnowledgeIndex, KnowledgeRecord, KnowledgeStore, RecordType};
    pub use crate::llm::LlmClient;
    #[cfg(feature = "openai")]
    pub use crate::llm::OpenAiClient;
    pub use crate::observability::{init_logging, LoggingConfig};
    pub use crate::pipeline::{Pipeline, PipelineConfig};
    pub use crate::stages::{
        ContextualStage, FetchTransactionStage, FnStage, RegisteredStage, Stage,
        TokenMetadataSource, TokenMetadataStage, TransactionSource,
    };
}
