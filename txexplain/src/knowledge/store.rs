//! The in-memory knowledge store.

use super::{score, KnowledgeRecord, RecordType, SearchHit, SearchResponse};
use crate::errors::RetrievalError;
use tracing::debug;

/// Hits must score strictly above this to be returned.
pub const MIN_CONFIDENCE: f64 = 0.1;

/// Maximum hits per search.
pub const MAX_RESULTS: usize = 5;

/// A searchable knowledge source.
#[cfg_attr(test, mockall::automock)]
pub trait KnowledgeIndex: Send + Sync {
    /// Returns up to [`MAX_RESULTS`] records of `record_type`, best first.
    fn search(&self, record_type: RecordType, query: &str) -> Result<SearchResponse, RetrievalError>;
}

/// Records held in insertion order. Read-only once built; share it behind an
/// `Arc` across requests.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeStore {
    records: Vec<KnowledgeRecord>,
}

impl KnowledgeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from records.
    #[must_use]
    pub fn from_records(records: Vec<KnowledgeRecord>) -> Self {
        Self { records }
    }

    /// Appends a record.
    pub fn add(&mut self, record: KnowledgeRecord) {
        self.records.push(record);
    }

    /// Appends many records.
    pub fn extend(&mut self, records: impl IntoIterator<Item = KnowledgeRecord>) {
        self.records.extend(records);
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records of one type.
    #[must_use]
    pub fn count(&self, record_type: RecordType) -> usize {
        self.records
            .iter()
            .filter(|r| r.record_type == record_type)
            .count()
    }

    /// Ranks records of `record_type` against `query`.
    ///
    /// Hits scoring at or below [`MIN_CONFIDENCE`] are dropped; ties keep
    /// insertion order. The query is scored exactly as given; a blank query
    /// matches nothing.
    #[must_use]
    pub fn rank(&self, record_type: RecordType, query: &str) -> Vec<SearchHit> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<SearchHit> = self
            .records
            .iter()
            .filter(|r| r.record_type == record_type)
            .filter_map(|r| {
                let raw = score(r, query);
                (raw > MIN_CONFIDENCE).then(|| SearchHit::new(r, raw))
            })
            .collect();

        // sort_by is stable, so equal scores stay in insertion order.
        hits.sort_by(|a, b| b.raw_score.total_cmp(&a.raw_score));
        hits.truncate(MAX_RESULTS);
        hits
    }
}

impl KnowledgeIndex for KnowledgeStore {
    fn search(&self, record_type: RecordType, query: &str) -> Result<SearchResponse, RetrievalError> {
        let hits = self.rank(record_type, query);
        debug!(
            record_type = %record_type,
            query = %query,
            found = hits.len(),
            "Knowledge search"
        );
        Ok(SearchResponse::new(query, hits))
    }
}
