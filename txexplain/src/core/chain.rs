//! Chain data carried through the baggage.
//!
//! These are the shapes written by enrichment collaborators and read by the
//! explanation stage. Numeric receipt fields stay as the hex strings the RPC
//! returns; they are parsed only when the explanation is assembled.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap_or_else(|_| unreachable!("static pattern"))
    })
}

/// Returns true if `value` looks like a 20-byte hex address.
#[must_use]
pub fn is_address(value: &str) -> bool {
    address_pattern().is_match(value.trim())
}

/// The request that seeds a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    /// Chain id of the network the transaction lives on.
    pub network_id: u64,
    /// Transaction hash.
    pub hash: String,
}

impl TransactionRequest {
    /// Creates a new request.
    #[must_use]
    pub fn new(network_id: u64, hash: impl Into<String>) -> Self {
        Self {
            network_id,
            hash: hash.into(),
        }
    }
}

/// Raw transaction data as fetched from the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    /// Transaction hash.
    pub hash: String,
    /// Chain id.
    pub network_id: u64,
    /// Sender address.
    pub from: String,
    /// Recipient address; `None` for contract creation.
    #[serde(default)]
    pub to: Option<String>,
    /// Native value transferred, as a hex quantity.
    #[serde(default)]
    pub value: String,
    /// Calldata.
    #[serde(default)]
    pub input: String,
    /// Receipt, once mined.
    #[serde(default)]
    pub receipt: Option<ReceiptData>,
}

impl TransactionData {
    /// Returns true if the transaction carries calldata.
    #[must_use]
    pub fn has_calldata(&self) -> bool {
        let data = self.input.trim_start_matches("0x");
        !data.is_empty()
    }

    /// The 4-byte method selector, if present.
    #[must_use]
    pub fn method_selector(&self) -> Option<&str> {
        if self.input.len() >= 10 && self.input.starts_with("0x") {
            self.input.get(..10)
        } else {
            None
        }
    }
}

/// Transaction receipt fields, as hex strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptData {
    /// `0x1` for success, `0x0` for failure.
    #[serde(default)]
    pub status: String,
    /// Gas used, hex quantity.
    #[serde(default)]
    pub gas_used: String,
    /// Block number, hex quantity.
    #[serde(default)]
    pub block_number: String,
    /// Address of a contract created by this transaction.
    #[serde(default)]
    pub contract_address: Option<String>,
    /// Number of logs emitted.
    #[serde(default)]
    pub logs_count: usize,
}

/// Static information about a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// Chain id.
    pub id: u64,
    /// Human name.
    pub name: String,
    /// Block explorer base URL.
    pub explorer: String,
    /// Symbol of the native asset.
    pub native_symbol: String,
}

impl NetworkInfo {
    /// Creates network info.
    #[must_use]
    pub fn new(
        id: u64,
        name: impl Into<String>,
        explorer: impl Into<String>,
        native_symbol: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            explorer: explorer.into(),
            native_symbol: native_symbol.into(),
        }
    }

    /// Returns info for well-known networks.
    #[must_use]
    pub fn for_id(id: u64) -> Option<Self> {
        let (name, explorer, symbol) = match id {
            1 => ("Ethereum", "https://etherscan.io", "ETH"),
            10 => ("Optimism", "https://optimistic.etherscan.io", "ETH"),
            56 => ("BNB Smart Chain", "https://bscscan.com", "BNB"),
            137 => ("Polygon", "https://polygonscan.com", "POL"),
            8453 => ("Base", "https://basescan.org", "ETH"),
            42161 => ("Arbitrum One", "https://arbiscan.io", "ETH"),
            11_155_111 => ("Sepolia", "https://sepolia.etherscan.io", "ETH"),
            _ => return None,
        };
        Some(Self::new(id, name, explorer, symbol))
    }
}

/// The standard a transfer follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    /// Native asset transfer.
    Native,
    /// Fungible token.
    #[default]
    Erc20,
    /// Non-fungible token.
    Erc721,
    /// Multi-token.
    Erc1155,
}

/// A token or NFT transfer observed in the transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    /// Token contract address.
    pub token: String,
    /// Sender.
    pub from: String,
    /// Recipient.
    pub to: String,
    /// Raw amount as a decimal string.
    #[serde(default)]
    pub amount: String,
    /// Transfer standard.
    #[serde(default)]
    pub kind: TransferKind,
    /// Token symbol, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Token decimals, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    /// NFT token id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
}

/// The role an address played in the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRole {
    /// The address.
    pub address: String,
    /// Role, e.g. "sender", "router", "recipient".
    pub role: String,
    /// Resolved name (ENS, label), when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AddressRole {
    /// Creates a role entry.
    #[must_use]
    pub fn new(address: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            role: role.into(),
            name: None,
        }
    }

    /// Sets the resolved name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Token contract metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Contract address.
    pub address: String,
    /// Token name.
    pub name: String,
    /// Token symbol.
    pub symbol: String,
    /// Decimals.
    pub decimals: u8,
    /// Icon URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A lightweight text snippet a stage contributes to the explanation prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptContribution {
    /// The contributing stage.
    pub stage: String,
    /// The context text.
    pub context: String,
}
