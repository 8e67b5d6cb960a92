//! The structured explanation returned to the caller.

use super::LoopOutcome;
use crate::baggage::{keys, Baggage};
use crate::core::{AddressRole, TokenTransfer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The terminal artifact of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationResult {
    /// Chain id.
    pub network_id: u64,
    /// Transaction hash.
    pub tx_hash: String,
    /// Gas used, `0` when unknown.
    pub gas_used: u64,
    /// `success`, `failed` or `unknown`.
    pub status: String,
    /// Block number, `0` when unknown.
    pub block_number: u64,
    /// Natural-language summary.
    pub summary: String,
    /// Token and NFT transfers.
    pub transfers: Vec<TokenTransfer>,
    /// Participants and their roles.
    pub participants: Vec<AddressRole>,
    /// Classification tags.
    pub tags: Vec<String>,
    /// Human label to explorer URL.
    pub links: BTreeMap<String, String>,
    /// Free-form metadata.
    pub metadata: BTreeMap<String, Value>,
    /// When the explanation was produced.
    pub generated_at: DateTime<Utc>,
}

/// Maps a receipt status code.
#[must_use]
pub fn map_status(code: &str) -> &'static str {
    match code.trim() {
        "0x1" => "success",
        "0x0" => "failed",
        _ => "unknown",
    }
}

/// Parses a hex quantity such as `0x5208`, returning `0` when malformed.
#[must_use]
pub fn parse_hex_u64(value: &str) -> u64 {
    let digits = value.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    u64::from_str_radix(digits, 16).unwrap_or(0)
}

fn short(address: &str) -> String {
    match (address.get(..6), address.get(address.len().saturating_sub(4)..)) {
        (Some(head), Some(tail)) if address.len() > 10 => format!("{head}…{tail}"),
        _ => address.to_string(),
    }
}

fn role_label(role: &AddressRole) -> String {
    if let Some(name) = role.name.as_deref().filter(|n| !n.trim().is_empty()) {
        return name.to_string();
    }
    let mut chars = role.role.chars();
    chars.next().map_or_else(
        || short(&role.address),
        |first| first.to_uppercase().chain(chars).collect(),
    )
}

/// Builds explorer links for the participants.
///
/// With no role data, the touched contracts are labelled `Contract 1`,
/// `Contract 2`, ... in order.
#[must_use]
pub fn build_links(
    explorer: &str,
    tx_hash: &str,
    participants: &[AddressRole],
    contracts: &[String],
) -> BTreeMap<String, String> {
    let explorer = explorer.trim_end_matches('/');
    let address_url = |address: &str| format!("{explorer}/address/{address}");
    let mut links = BTreeMap::new();

    if !tx_hash.is_empty() {
        links.insert("Transaction".to_string(), format!("{explorer}/tx/{tx_hash}"));
    }

    if participants.is_empty() {
        for (i, address) in contracts.iter().enumerate() {
            links.insert(format!("Contract {}", i + 1), address_url(address));
        }
        return links;
    }

    for participant in participants {
        let mut label = role_label(participant);
        if links.contains_key(&label) {
            label = format!("{label} ({})", short(&participant.address));
        }
        links
            .entry(label)
            .or_insert_with(|| address_url(&participant.address));
    }
    links
}

/// Assembles the result from the loop outcome and the enriched baggage.
///
/// Missing slots leave their fields at zero values.
#[must_use]
pub fn assemble(
    baggage: &Baggage,
    outcome: &LoopOutcome,
    model: &str,
    explorer_fallback: &str,
) -> ExplanationResult {
    let tx = baggage.get(&keys::TRANSACTION);
    let receipt = tx.and_then(|t| t.receipt.as_ref());
    let (tx_hash, network_id) = match (tx, baggage.get(&keys::REQUEST)) {
        (Some(tx), _) => (tx.hash.clone(), tx.network_id),
        (None, Some(request)) => (request.hash.clone(), request.network_id),
        (None, None) => (String::new(), 0),
    };

    let participants = baggage.get(&keys::ADDRESS_ROLES).cloned().unwrap_or_default();
    let contracts = baggage
        .get(&keys::CONTRACT_ADDRESSES)
        .cloned()
        .unwrap_or_default();
    let explorer = baggage
        .get(&keys::NETWORK)
        .map_or(explorer_fallback, |n| n.explorer.as_str());

    let mut metadata = BTreeMap::new();
    metadata.insert("model".to_string(), Value::from(model));
    metadata.insert("model_turns".to_string(), Value::from(outcome.model_turns));
    metadata.insert("tool_calls".to_string(), Value::from(outcome.tool_calls));
    metadata.insert(
        "retrieval_errors".to_string(),
        Value::from(outcome.retrieval_errors),
    );

    ExplanationResult {
        network_id,
        links: build_links(explorer, &tx_hash, &participants, &contracts),
        tx_hash,
        gas_used: receipt.map_or(0, |r| parse_hex_u64(&r.gas_used)),
        status: map_status(receipt.map_or("", |r| r.status.as_str())).to_string(),
        block_number: receipt.map_or(0, |r| parse_hex_u64(&r.block_number)),
        summary: outcome.content.trim().to_string(),
        transfers: baggage.get(&keys::TOKEN_TRANSFERS).cloned().unwrap_or_default(),
        participants,
        tags: baggage.get(&keys::TAGS).cloned().unwrap_or_default(),
        metadata,
        generated_at: Utc::now(),
    }
}
