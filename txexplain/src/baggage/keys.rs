//! Well-known baggage slots shared by the built-in stages.

use super::Key;
use crate::core::{
    AddressRole, NetworkInfo, PromptContribution, TokenMetadata, TokenTransfer, TransactionData,
    TransactionRequest,
};
use crate::explain::ExplanationResult;
use std::collections::BTreeMap;

/// The request that seeds the run.
pub const REQUEST: Key<TransactionRequest> = Key::new("request");

/// Raw transaction and receipt.
pub const TRANSACTION: Key<TransactionData> = Key::new("transaction");

/// Network the transaction lives on.
pub const NETWORK: Key<NetworkInfo> = Key::new("network");

/// Contract addresses touched by the transaction, in first-seen order.
pub const CONTRACT_ADDRESSES: Key<Vec<String>> = Key::new("contract_addresses");

/// Token metadata keyed by lowercased contract address.
pub const TOKEN_METADATA: Key<BTreeMap<String, TokenMetadata>> = Key::new("token_metadata");

/// Token and NFT transfers.
pub const TOKEN_TRANSFERS: Key<Vec<TokenTransfer>> = Key::new("token_transfers");

/// Roles of the addresses involved.
pub const ADDRESS_ROLES: Key<Vec<AddressRole>> = Key::new("address_roles");

/// Classification tags.
pub const TAGS: Key<Vec<String>> = Key::new("tags");

/// Prompt snippets contributed by stages, in execution order.
pub const PROMPT_CONTEXTS: Key<Vec<PromptContribution>> = Key::new("prompt_contexts");

/// The final explanation.
pub const EXPLANATION: Key<ExplanationResult> = Key::new("explanation");
