//! Static data sources for the knowledge store.
//!
//! Each source is a JSON array of entries. Entries map to records carrying
//! a fixed set of metadata keys per type.

use super::{KnowledgeRecord, KnowledgeStore, RecordType};
use crate::errors::ExplainerError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::info;

fn default_relevance() -> f64 {
    1.0
}

fn slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn optional(value: Option<&String>) -> Value {
    value.map_or(Value::Null, |v| Value::String(v.clone()))
}

/// A token list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    /// Contract address.
    pub address: String,
    /// Symbol.
    pub symbol: String,
    /// Name.
    pub name: String,
    /// Decimals.
    pub decimals: u8,
    /// Icon URL.
    #[serde(default)]
    pub icon: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
}

impl From<TokenEntry> for KnowledgeRecord {
    fn from(entry: TokenEntry) -> Self {
        let address = entry.address.to_lowercase();
        let content = entry.description.clone().unwrap_or_else(|| {
            format!(
                "{} ({}) token contract at {} with {} decimals",
                entry.name, entry.symbol, address, entry.decimals
            )
        });
        Self::new(
            format!("token:{address}"),
            RecordType::Token,
            format!("{} ({})", entry.name, entry.symbol),
            content,
        )
        .with_keywords([entry.symbol.clone(), entry.name.clone(), address.clone()])
        .with_metadata("address", address)
        .with_metadata("symbol", entry.symbol)
        .with_metadata("name", entry.name)
        .with_metadata("decimals", entry.decimals)
        .with_metadata("icon", optional(entry.icon.as_ref()))
        .with_metadata("description", optional(entry.description.as_ref()))
    }
}

/// A protocol directory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolEntry {
    /// Protocol name.
    pub name: String,
    /// Website.
    #[serde(default)]
    pub website: Option<String>,
    /// Icon URL.
    #[serde(default)]
    pub icon: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Extra search keywords, e.g. category names.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Base relevance.
    #[serde(default = "default_relevance")]
    pub relevance: f64,
}

impl From<ProtocolEntry> for KnowledgeRecord {
    fn from(entry: ProtocolEntry) -> Self {
        let content = entry
            .description
            .clone()
            .unwrap_or_else(|| format!("{} protocol", entry.name));
        let mut keywords = vec![entry.name.clone()];
        keywords.extend(entry.keywords);
        Self::new(
            format!("protocol:{}", slug(&entry.name)),
            RecordType::Protocol,
            entry.name.clone(),
            content,
        )
        .with_keywords(keywords)
        .with_relevance(entry.relevance)
        .with_metadata("name", entry.name)
        .with_metadata("website", optional(entry.website.as_ref()))
        .with_metadata("icon", optional(entry.icon.as_ref()))
        .with_metadata("description", optional(entry.description.as_ref()))
    }
}

/// A labelled address entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressEntry {
    /// The address.
    pub address: String,
    /// Label.
    pub name: String,
    /// Kind of address, e.g. "router" or "exchange".
    #[serde(rename = "type", default)]
    pub address_type: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Explorer URL for the address.
    #[serde(default)]
    pub explorer: Option<String>,
    /// Base relevance.
    #[serde(default = "default_relevance")]
    pub relevance: f64,
}

impl From<AddressEntry> for KnowledgeRecord {
    fn from(entry: AddressEntry) -> Self {
        let address = entry.address.to_lowercase();
        let content = entry.description.clone().unwrap_or_else(|| match &entry.address_type {
            Some(kind) => format!("{} ({kind}) at {address}", entry.name),
            None => format!("{} at {address}", entry.name),
        });
        let mut keywords = vec![entry.name.clone(), address.clone()];
        keywords.extend(entry.address_type.clone());
        Self::new(
            format!("address:{address}"),
            RecordType::Address,
            entry.name.clone(),
            content,
        )
        .with_keywords(keywords)
        .with_relevance(entry.relevance)
        .with_metadata("address", address)
        .with_metadata("name", entry.name)
        .with_metadata("type", optional(entry.address_type.as_ref()))
        .with_metadata("description", optional(entry.description.as_ref()))
        .with_metadata("explorer", optional(entry.explorer.as_ref()))
    }
}

fn parse_records(record_type: RecordType, json: &str) -> Result<Vec<KnowledgeRecord>, ExplainerError> {
    let records = match record_type {
        RecordType::Token => serde_json::from_str::<Vec<TokenEntry>>(json)?
            .into_iter()
            .map(KnowledgeRecord::from)
            .collect(),
        RecordType::Protocol => serde_json::from_str::<Vec<ProtocolEntry>>(json)?
            .into_iter()
            .map(KnowledgeRecord::from)
            .collect(),
        RecordType::Address => serde_json::from_str::<Vec<AddressEntry>>(json)?
            .into_iter()
            .map(KnowledgeRecord::from)
            .collect(),
    };
    Ok(records)
}

impl KnowledgeStore {
    /// Loads a JSON array of entries of `record_type`, returning how many
    /// records were added.
    pub fn load_json(&mut self, record_type: RecordType, json: &str) -> Result<usize, ExplainerError> {
        let records = parse_records(record_type, json)?;
        let added = records.len();
        self.extend(records);
        info!(record_type = %record_type, added, total = self.len(), "Loaded knowledge records");
        Ok(added)
    }

    /// Loads entries from a JSON file.
    pub fn load_json_file(
        &mut self,
        record_type: RecordType,
        path: impl AsRef<Path>,
    ) -> Result<usize, ExplainerError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        self.load_json(record_type, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgeIndex;
    use std::io::Write;

    const TOKENS: &str = r#"[
        {"address": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", "symbol": "USDC", "name": "USD Coin", "decimals": 6},
        {"address": "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", "symbol": "WETH", "name": "Wrapped Ether", "decimals": 18,
         "description": "Wrapped version of ether"}
    ]"#;

    #[test]
    fn test_token_entries_carry_metadata_keys() {
        let mut store = KnowledgeStore::new();
        assert_eq!(store.load_json(RecordType::Token, TOKENS).unwrap(), 2);

        let hits = store.rank(RecordType::Token, "usdc");
        let usdc = &hits[0];
        assert_eq!(usdc.id, "token:0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
        assert_eq!(usdc.title, "USD Coin (USDC)");
        for key in ["address", "symbol", "name", "decimals", "icon", "description"] {
            assert!(usdc.metadata.contains_key(key), "missing {key}");
        }
        assert_eq!(usdc.metadata["decimals"], 6);
    }

    #[test]
    fn test_address_lookup_is_case_insensitive() {
        let mut store = KnowledgeStore::new();
        store.load_json(RecordType::Token, TOKENS).unwrap();
        let response = store
            .search(RecordType::Token, "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2")
            .unwrap();
        assert_eq!(response.results[0].title, "Wrapped Ether (WETH)");
    }

    #[test]
    fn test_protocol_and_address_entries() {
        let mut store = KnowledgeStore::new();
        store
            .load_json(
                RecordType::Protocol,
                r#"[{"name": "Uniswap V3", "website": "https://uniswap.org", "keywords": ["dex"]}]"#,
            )
            .unwrap();
        store
            .load_json(
                RecordType::Address,
                r#"[{"address": "0xE592427A0AEce92De3Edee1F18E0157C05861564", "name": "Uniswap V3: Router", "type": "router"}]"#,
            )
            .unwrap();

        let protocol = &store.rank(RecordType::Protocol, "dex")[0];
        assert_eq!(protocol.id, "protocol:uniswap-v3");
        for key in ["name", "website", "icon", "description"] {
            assert!(protocol.metadata.contains_key(key));
        }

        let address = &store.rank(RecordType::Address, "router")[0];
        assert_eq!(address.metadata["type"], "router");
        for key in ["address", "name", "type", "description", "explorer"] {
            assert!(address.metadata.contains_key(key));
        }
    }

    #[test]
    fn test_load_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TOKENS.as_bytes()).unwrap();

        let mut store = KnowledgeStore::new();
        let added = store.load_json_file(RecordType::Token, file.path()).unwrap();
        assert_eq!(added, 2);
        assert_eq!(store.count(RecordType::Token), 2);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let mut store = KnowledgeStore::new();
        let err = store.load_json(RecordType::Token, "{not json").unwrap_err();
        assert!(matches!(err, ExplainerError::Serialization(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let mut store = KnowledgeStore::new();
        let err = store
            .load_json_file(RecordType::Token, "/nonexistent/tokens.json")
            .unwrap_err();
        assert!(matches!(err, ExplainerError::Io(_)));
    }
}
