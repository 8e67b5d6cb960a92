//! Fuzzy relevance scoring.
//!
//! The score is additive, not normalized, and may exceed 1. Ranking in the
//! store depends on these exact weights.

use super::KnowledgeRecord;

const TITLE_MATCH: f64 = 0.8;
const CONTENT_MATCH: f64 = 0.4;
const KEYWORD_MATCH: f64 = 0.6;
const METADATA_MATCH: f64 = 0.7;
const TOKEN_TITLE_MATCH: f64 = 0.2;
const TOKEN_CONTENT_MATCH: f64 = 0.1;
/// Query tokens must be longer than this many bytes to score on their own.
const MIN_TOKEN_LEN: usize = 2;

/// Scores `record` against `query`, case-insensitively.
#[must_use]
pub fn score(record: &KnowledgeRecord, query: &str) -> f64 {
    let query = query.to_lowercase();
    let title = record.title.to_lowercase();
    let content = record.content.to_lowercase();
    let mut total = 0.0;

    if title.contains(&query) {
        total += TITLE_MATCH;
    }
    if content.contains(&query) {
        total += CONTENT_MATCH;
    }
    for keyword in &record.keywords {
        if keyword.to_lowercase().contains(&query) {
            total += KEYWORD_MATCH;
        }
    }
    for value in record.metadata.values() {
        if let Some(text) = value.as_str() {
            if text.to_lowercase().contains(&query) {
                total += METADATA_MATCH;
            }
        }
    }
    for token in query.split_whitespace() {
        if token.len() <= MIN_TOKEN_LEN {
            continue;
        }
        if title.contains(token) {
            total += TOKEN_TITLE_MATCH;
        }
        if content.contains(token) {
            total += TOKEN_CONTENT_MATCH;
        }
    }

    total * record.relevance
}
