//! Knowledge records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The kind of fact a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    /// A token contract.
    Token,
    /// A protocol or application.
    Protocol,
    /// A well-known address.
    Address,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token => write!(f, "token"),
            Self::Protocol => write!(f, "protocol"),
            Self::Address => write!(f, "address"),
        }
    }
}

/// One immutable fact in the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    /// Stable identifier.
    pub id: String,
    /// Record type.
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Human title.
    pub title: String,
    /// Free-text body.
    pub content: String,
    /// Search keywords.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Base relevance weight in `[0, 1]`.
    pub relevance: f64,
    /// Type-specific metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl KnowledgeRecord {
    /// Creates a record with full relevance and no keywords or metadata.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        record_type: RecordType,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            record_type,
            title: title.into(),
            content: content.into(),
            keywords: Vec::new(),
            relevance: 1.0,
            metadata: BTreeMap::new(),
        }
    }

    /// Sets the keywords.
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the base relevance, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_relevance(mut self, relevance: f64) -> Self {
        self.relevance = relevance.clamp(0.0, 1.0);
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
