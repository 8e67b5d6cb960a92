//! Search results returned to the model.

use super::{KnowledgeRecord, RecordType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One ranked record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Record id.
    pub id: String,
    /// Record type.
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Record title.
    pub title: String,
    /// Record body.
    pub content: String,
    /// Record metadata.
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Relevance in `[0, 1]`.
    pub confidence: f64,
    #[serde(skip)]
    pub(crate) raw_score: f64,
}

impl SearchHit {
    pub(crate) fn new(record: &KnowledgeRecord, raw_score: f64) -> Self {
        Self {
            id: record.id.clone(),
            record_type: record.record_type,
            title: record.title.clone(),
            content: record.content.clone(),
            metadata: record.metadata.clone(),
            confidence: raw_score.clamp(0.0, 1.0),
            raw_score,
        }
    }

    /// The unclamped additive score used for ranking.
    #[must_use]
    pub fn raw_score(&self) -> f64 {
        self.raw_score
    }
}

/// The JSON payload of one retrieval tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The query as the model sent it.
    pub query: String,
    /// Ranked hits, best first.
    pub results: Vec<SearchHit>,
    /// Number of hits.
    pub found: usize,
    /// Why the search failed, when it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResponse {
    /// A successful response.
    #[must_use]
    pub fn new(query: impl Into<String>, results: Vec<SearchHit>) -> Self {
        Self {
            query: query.into(),
            found: results.len(),
            results,
            error: None,
        }
    }

    /// An empty response annotated with the failure.
    #[must_use]
    pub fn failed(query: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            results: Vec::new(),
            found: 0,
            error: Some(error.into()),
        }
    }

    /// Encodes the response as tool-result content.
    #[must_use]
    pub fn to_tool_content(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"query":"","results":[],"found":0,"error":"encoding failed: {e}"}}"#)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_confidence_clamped() {
        let record = KnowledgeRecord::new("a", RecordType::Token, "A", "a");
        let hit = SearchHit::new(&record, 2.4);
        assert!((hit.confidence - 1.0).abs() < f64::EPSILON);
        assert!((hit.raw_score() - 2.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tool_content_shape() {
        let record = KnowledgeRecord::new("usdc", RecordType::Token, "USD Coin", "Stablecoin")
            .with_metadata("symbol", "USDC");
        let response = SearchResponse::new("usdc", vec![SearchHit::new(&record, 0.5)]);
        let json: Value = serde_json::from_str(&response.to_tool_content()).unwrap();

        assert_eq!(json["query"], "usdc");
        assert_eq!(json["found"], 1);
        assert_eq!(json["results"][0]["type"], "token");
        assert_eq!(json["results"][0]["metadata"]["symbol"], "USDC");
        assert!(json["results"][0].get("raw_score").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failed_response_has_error() {
        let json: Value =
            serde_json::from_str(&SearchResponse::failed("x", "index offline").to_tool_content())
                .unwrap();
        assert_eq!(json["found"], 0);
        assert_eq!(json["results"], serde_json::json!([]));
        assert_eq!(json["error"], "index offline");
    }
}
