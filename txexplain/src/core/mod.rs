//! Core domain model types for txexplain.
//!
//! This module contains the fundamental types shared by every stage:
//! - Stage progress status
//! - Chain data written into the baggage by enrichment stages

mod chain;
mod status;

pub use chain::{
    is_address, AddressRole, NetworkInfo, PromptContribution, ReceiptData, TokenMetadata,
    TokenTransfer, TransactionData, TransactionRequest, TransferKind,
};
pub use status::StageStatus;
