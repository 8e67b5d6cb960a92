//! Resolves token contract metadata for every contract the transaction touched.

use super::{names, ContextualStage, Stage};
use crate::baggage::{keys, Baggage};
use crate::cache::{Cache, CacheDomain, CacheKey};
use crate::context::RunContext;
use crate::core::TokenMetadata;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Looks up token metadata. Implemented by the token list / icon providers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenMetadataSource: Send + Sync {
    /// Returns metadata for `address`, or `None` if it is not a token.
    async fn token_metadata(
        &self,
        network_id: u64,
        address: &str,
    ) -> anyhow::Result<Option<TokenMetadata>>;
}

/// Writes [`keys::TOKEN_METADATA`] and fills symbols and decimals into any
/// decoded transfers.
///
/// Lookups run concurrently and go through the shared cache. A failed lookup
/// leaves that token out rather than failing the stage.
pub struct TokenMetadataStage {
    source: Arc<dyn TokenMetadataSource>,
    cache: Arc<dyn Cache>,
}

impl TokenMetadataStage {
    /// Creates the stage.
    pub fn new(source: Arc<dyn TokenMetadataSource>, cache: Arc<dyn Cache>) -> Self {
        Self { source, cache }
    }

    async fn lookup(&self, network_id: u64, address: String) -> Option<TokenMetadata> {
        let key = CacheKey::new(CacheDomain::TokenMetadata, Some(network_id), &address);
        if let Some(cached) = self.cache.get(&key).await {
            match serde_json::from_value(cached) {
                Ok(metadata) => return Some(metadata),
                Err(e) => debug!(key = %key, "Ignoring malformed cache entry: {}", e),
            }
        }

        match self.source.token_metadata(network_id, &address).await {
            Ok(Some(metadata)) => {
                if let Ok(value) = serde_json::to_value(&metadata) {
                    self.cache.set_for_domain(key, value).await;
                }
                Some(metadata)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(address = %address, "Token metadata lookup failed: {:#}", e);
                None
            }
        }
    }
}

impl fmt::Debug for TokenMetadataStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenMetadataStage").finish_non_exhaustive()
    }
}

fn candidate_addresses(baggage: &Baggage) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let contracts = baggage.get(&keys::CONTRACT_ADDRESSES).into_iter().flatten();
    let transfer_tokens = baggage
        .get(&keys::TOKEN_TRANSFERS)
        .into_iter()
        .flatten()
        .map(|t| &t.token);

    for address in contracts.chain(transfer_tokens) {
        let address = address.to_lowercase();
        if !address.is_empty() && !out.contains(&address) {
            out.push(address);
        }
    }
    out
}

#[async_trait]
impl Stage for TokenMetadataStage {
    fn name(&self) -> &str {
        names::TOKEN_METADATA
    }

    fn label(&self) -> &str {
        "Resolving token metadata"
    }

    fn dependencies(&self) -> Vec<String> {
        vec![
            names::FETCH_TRANSACTION.to_string(),
            names::TOKEN_TRANSFERS.to_string(),
        ]
    }

    async fn process(&self, ctx: &RunContext, baggage: &mut Baggage) -> anyhow::Result<()> {
        let addresses = candidate_addresses(baggage);
        let network_id = network_of(ctx, baggage);

        let lookups = addresses
            .into_iter()
            .map(|address| self.lookup(network_id, address));
        let found: BTreeMap<String, TokenMetadata> = join_all(lookups)
            .await
            .into_iter()
            .flatten()
            .map(|metadata| (metadata.address.to_lowercase(), metadata))
            .collect();

        debug!(tokens = found.len(), "Resolved token metadata");

        if let Some(transfers) = baggage.get_mut(&keys::TOKEN_TRANSFERS) {
            for transfer in transfers.iter_mut() {
                if let Some(metadata) = found.get(&transfer.token.to_lowercase()) {
                    transfer.symbol.get_or_insert_with(|| metadata.symbol.clone());
                    transfer.decimals.get_or_insert(metadata.decimals);
                }
            }
        }
        baggage.insert(&keys::TOKEN_METADATA, found);
        Ok(())
    }
}

/// The network the fetched transaction lives on, falling back to the request
/// and then the run context.
fn network_of(ctx: &RunContext, baggage: &Baggage) -> u64 {
    baggage
        .get(&keys::TRANSACTION)
        .map(|tx| tx.network_id)
        .or_else(|| baggage.get(&keys::REQUEST).map(|req| req.network_id))
        .unwrap_or_else(|| ctx.network_id())
}

#[async_trait]
impl ContextualStage for TokenMetadataStage {
    async fn prompt_context(&self, _ctx: &RunContext, baggage: &Baggage) -> Option<String> {
        let tokens = baggage.get(&keys::TOKEN_METADATA)?;
        if tokens.is_empty() {
            return None;
        }
        let lines: Vec<String> = tokens
            .values()
            .map(|t| {
                format!(
                    "- {} ({}) at {}, {} decimals",
                    t.name, t.symbol, t.address, t.decimals
                )
            })
            .collect();
        Some(format!("Tokens involved:\n{}", lines.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::core::{TokenTransfer, TransactionData};

    const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
    const WETH: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";

    fn usdc() -> TokenMetadata {
        TokenMetadata {
            address: USDC.to_string(),
            name: "USD Coin".to_string(),
            symbol: "USDC".to_string(),
            decimals: 6,
            icon: None,
        }
    }

    #[tokio::test]
    async fn test_resolves_and_fills_transfers() {
        let mut source = MockTokenMetadataSource::new();
        source
            .expect_token_metadata()
            .returning(|_, address| match address {
                USDC => Ok(Some(usdc())),
                _ => Err(anyhow::anyhow!("provider down")),
            });

        let cache = Arc::new(InMemoryCache::new());
        let stage = TokenMetadataStage::new(Arc::new(source), cache.clone());
        let ctx = RunContext::new(1);
        let mut baggage = Baggage::new()
            .with(&keys::CONTRACT_ADDRESSES, vec![USDC.to_uppercase().replace("0X", "0x")])
            .with(
                &keys::TOKEN_TRANSFERS,
                vec![
                    TokenTransfer {
                        token: USDC.to_string(),
                        amount: "1000000".to_string(),
                        ..Default::default()
                    },
                    TokenTransfer {
                        token: WETH.to_string(),
                        ..Default::default()
                    },
                ],
            );

        stage.process(&ctx, &mut baggage).await.unwrap();

        let tokens = baggage.get(&keys::TOKEN_METADATA).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[USDC].symbol, "USDC");

        let transfers = baggage.get(&keys::TOKEN_TRANSFERS).unwrap();
        assert_eq!(transfers[0].symbol.as_deref(), Some("USDC"));
        assert_eq!(transfers[0].decimals, Some(6));
        assert!(transfers[1].symbol.is_none());

        let key = CacheKey::new(CacheDomain::TokenMetadata, Some(1), USDC);
        assert!(cache.get(&key).await.is_some());

        let context = stage.prompt_context(&ctx, &baggage).await.unwrap();
        assert!(context.contains("USD Coin (USDC)"));
    }

    #[tokio::test]
    async fn test_lookup_uses_transaction_network() {
        let mut source = MockTokenMetadataSource::new();
        source
            .expect_token_metadata()
            .withf(|network_id: &u64, address: &str| *network_id == 137 && address == USDC)
            .times(1)
            .returning(|_, _| Ok(Some(usdc())));

        let cache = Arc::new(InMemoryCache::new());
        let stage = TokenMetadataStage::new(Arc::new(source), cache.clone());
        let ctx = RunContext::new(1);
        let mut baggage = Baggage::new()
            .with(
                &keys::TRANSACTION,
                TransactionData {
                    hash: "0xfeed".to_string(),
                    network_id: 137,
                    ..Default::default()
                },
            )
            .with(&keys::CONTRACT_ADDRESSES, vec![USDC.to_string()]);

        stage.process(&ctx, &mut baggage).await.unwrap();

        assert_eq!(baggage.get(&keys::TOKEN_METADATA).unwrap().len(), 1);
        let polygon = CacheKey::new(CacheDomain::TokenMetadata, Some(137), USDC);
        let mainnet = CacheKey::new(CacheDomain::TokenMetadata, Some(1), USDC);
        assert!(cache.get(&polygon).await.is_some());
        assert!(cache.get(&mainnet).await.is_none());
    }

    #[tokio::test]
    async fn test_cache_hit_skips_source() {
        let mut source = MockTokenMetadataSource::new();
        source.expect_token_metadata().times(0);

        let cache = Arc::new(InMemoryCache::new());
        let key = CacheKey::new(CacheDomain::TokenMetadata, Some(1), USDC);
        cache
            .set_for_domain(key, serde_json::to_value(usdc()).unwrap())
            .await;

        let stage = TokenMetadataStage::new(Arc::new(source), cache);
        let mut baggage = Baggage::new().with(&keys::CONTRACT_ADDRESSES, vec![USDC.to_string()]);
        stage.process(&RunContext::new(1), &mut baggage).await.unwrap();

        assert_eq!(baggage.get(&keys::TOKEN_METADATA).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_contracts_yields_no_context() {
        let stage = TokenMetadataStage::new(
            Arc::new(MockTokenMetadataSource::new()),
            Arc::new(InMemoryCache::new()),
        );
        let ctx = RunContext::new(1);
        let mut baggage = Baggage::new();
        stage.process(&ctx, &mut baggage).await.unwrap();

        assert!(baggage.get(&keys::TOKEN_METADATA).unwrap().is_empty());
        assert!(stage.prompt_context(&ctx, &baggage).await.is_none());
    }
}
