//! The stage that seeds the baggage with the raw transaction.

use super::{names, ContextualStage, Stage};
use crate::baggage::{keys, Baggage};
use crate::context::RunContext;
use crate::core::{NetworkInfo, TransactionData};
use anyhow::Context as _;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Fetches raw chain data. Implemented by the RPC client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Fetches the transaction and its receipt.
    async fn fetch_transaction(&self, network_id: u64, hash: &str)
        -> anyhow::Result<TransactionData>;
}

/// Reads [`keys::REQUEST`] and writes the transaction, network and contract
/// addresses touched.
pub struct FetchTransactionStage {
    source: Arc<dyn TransactionSource>,
}

impl FetchTransactionStage {
    /// Creates the stage over a transaction source.
    pub fn new(source: Arc<dyn TransactionSource>) -> Self {
        Self { source }
    }
}

impl fmt::Debug for FetchTransactionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchTransactionStage").finish_non_exhaustive()
    }
}

fn contract_addresses(tx: &TransactionData) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |address: &str| {
        let address = address.to_lowercase();
        if !out.contains(&address) {
            out.push(address);
        }
    };

    if let Some(created) = tx.receipt.as_ref().and_then(|r| r.contract_address.as_deref()) {
        push(created);
    }
    if tx.has_calldata() {
        if let Some(to) = tx.to.as_deref() {
            push(to);
        }
    }
    out
}

#[async_trait]
impl Stage for FetchTransactionStage {
    fn name(&self) -> &str {
        names::FETCH_TRANSACTION
    }

    fn label(&self) -> &str {
        "Fetching transaction"
    }

    async fn process(&self, _ctx: &RunContext, baggage: &mut Baggage) -> anyhow::Result<()> {
        let request = baggage
            .get(&keys::REQUEST)
            .cloned()
            .context("no transaction request in baggage")?;

        let tx = self
            .source
            .fetch_transaction(request.network_id, &request.hash)
            .await
            .with_context(|| format!("fetching {} on network {}", request.hash, request.network_id))?;

        let contracts = contract_addresses(&tx);
        debug!(hash = %tx.hash, contracts = contracts.len(), "Fetched transaction");

        if let Some(network) = NetworkInfo::for_id(request.network_id) {
            baggage.insert(&keys::NETWORK, network);
        }
        baggage.insert(&keys::CONTRACT_ADDRESSES, contracts);
        baggage.insert(&keys::TRANSACTION, tx);
        Ok(())
    }
}

#[async_trait]
impl ContextualStage for FetchTransactionStage {
    async fn prompt_context(&self, _ctx: &RunContext, baggage: &Baggage) -> Option<String> {
        let tx = baggage.get(&keys::TRANSACTION)?;
        let network = baggage
            .get(&keys::NETWORK)
            .map_or_else(|| format!("network {}", tx.network_id), |n| n.name.clone());

        let mut lines = vec![
            format!("Transaction {} on {network}", tx.hash),
            format!("From: {}", tx.from),
        ];
        match tx.to.as_deref() {
            Some(to) => lines.push(format!("To: {to}")),
            None => lines.push("To: (contract creation)".to_string()),
        }
        if !tx.value.is_empty() && tx.value != "0x0" {
            lines.push(format!("Native value (hex wei): {}", tx.value));
        }
        if let Some(selector) = tx.method_selector() {
            lines.push(format!("Method selector: {selector}"));
        }
        if let Some(receipt) = &tx.receipt {
            lines.push(format!("Receipt status: {}", receipt.status));
            lines.push(format!("Logs emitted: {}", receipt.logs_count));
        }
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ReceiptData, TransactionRequest};
    use mockall::predicate::eq;

    fn sample_tx() -> TransactionData {
        TransactionData {
            hash: "0xfeed".to_string(),
            network_id: 1,
            from: "0x1111111111111111111111111111111111111111".to_string(),
            to: Some("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".to_string()),
            value: "0x0".to_string(),
            input: "0xa9059cbb0000".to_string(),
            receipt: Some(ReceiptData {
                status: "0x1".to_string(),
                gas_used: "0x5208".to_string(),
                block_number: "0x10".to_string(),
                contract_address: None,
                logs_count: 1,
            }),
        }
    }

    #[tokio::test]
    async fn test_fetch_writes_transaction_and_contracts() {
        let mut source = MockTransactionSource::new();
        source
            .expect_fetch_transaction()
            .with(eq(1), eq("0xfeed"))
            .times(1)
            .returning(|_, _| Ok(sample_tx()));

        let stage = FetchTransactionStage::new(Arc::new(source));
        let ctx = RunContext::new(1);
        let mut baggage = Baggage::new().with(&keys::REQUEST, TransactionRequest::new(1, "0xfeed"));

        stage.process(&ctx, &mut baggage).await.unwrap();

        assert_eq!(baggage.get(&keys::TRANSACTION).unwrap().hash, "0xfeed");
        assert_eq!(baggage.get(&keys::NETWORK).unwrap().name, "Ethereum");
        assert_eq!(
            baggage.get(&keys::CONTRACT_ADDRESSES).unwrap(),
            &vec!["0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".to_string()]
        );

        let context = stage.prompt_context(&ctx, &baggage).await.unwrap();
        assert!(context.contains("Transaction 0xfeed on Ethereum"));
        assert!(context.contains("Method selector: 0xa9059cbb"));
    }

    #[tokio::test]
    async fn test_missing_request_fails() {
        let stage = FetchTransactionStage::new(Arc::new(MockTransactionSource::new()));
        let mut baggage = Baggage::new();
        let err = stage
            .process(&RunContext::new(1), &mut baggage)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no transaction request"));
    }

    #[tokio::test]
    async fn test_source_error_propagates() {
        let mut source = MockTransactionSource::new();
        source
            .expect_fetch_transaction()
            .returning(|_, _| Err(anyhow::anyhow!("rpc timeout")));

        let stage = FetchTransactionStage::new(Arc::new(source));
        let mut baggage = Baggage::new().with(&keys::REQUEST, TransactionRequest::new(1, "0xfeed"));
        let err = stage
            .process(&RunContext::new(1), &mut baggage)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("rpc timeout"));
        assert!(!baggage.contains(&keys::TRANSACTION));
    }

    #[test]
    fn test_plain_transfer_has_no_contracts() {
        let mut tx = sample_tx();
        tx.input = "0x".to_string();
        assert!(contract_addresses(&tx).is_empty());
    }
}
