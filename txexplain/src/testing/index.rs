//! Knowledge index doubles.

use crate::errors::RetrievalError;
use crate::knowledge::{KnowledgeIndex, RecordType, SearchResponse};

/// An index whose backend is always down.
#[derive(Debug, Clone)]
pub struct FailingIndex {
    message: String,
}

impl FailingIndex {
    /// Creates an index failing with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl KnowledgeIndex for FailingIndex {
    fn search(
        &self,
        _record_type: RecordType,
        _query: &str,
    ) -> Result<SearchResponse, RetrievalError> {
        Err(RetrievalError::Backend {
            message: self.message.clone(),
        })
    }
}
