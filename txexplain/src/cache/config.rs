//! Per-domain cache TTLs.

use super::CacheDomain;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const HOUR: u64 = 3600;
const DAY: u64 = 24 * HOUR;
const YEAR: u64 = 365 * DAY;

fn default_price_ttl() -> u64 {
    HOUR
}

fn default_permanent_ttl() -> u64 {
    YEAR
}

fn default_monthly_ttl() -> u64 {
    30 * DAY
}

/// TTLs for each cache domain, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Token prices.
    #[serde(default = "default_price_ttl")]
    pub price_ttl_seconds: u64,
    /// Token contract metadata.
    #[serde(default = "default_permanent_ttl")]
    pub metadata_ttl_seconds: u64,
    /// Contract ABIs.
    #[serde(default = "default_permanent_ttl")]
    pub abi_ttl_seconds: u64,
    /// Network information.
    #[serde(default = "default_permanent_ttl")]
    pub network_ttl_seconds: u64,
    /// ENS resolutions.
    #[serde(default = "default_monthly_ttl")]
    pub ens_ttl_seconds: u64,
    /// NFT metadata.
    #[serde(default = "default_monthly_ttl")]
    pub nft_metadata_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            price_ttl_seconds: default_price_ttl(),
            metadata_ttl_seconds: default_permanent_ttl(),
            abi_ttl_seconds: default_permanent_ttl(),
            network_ttl_seconds: default_permanent_ttl(),
            ens_ttl_seconds: default_monthly_ttl(),
            nft_metadata_ttl_seconds: default_monthly_ttl(),
        }
    }
}

impl CacheConfig {
    /// Returns the TTL for a domain.
    #[must_use]
    pub fn ttl_for(&self, domain: CacheDomain) -> Duration {
        let seconds = match domain {
            CacheDomain::Price => self.price_ttl_seconds,
            CacheDomain::TokenMetadata => self.metadata_ttl_seconds,
            CacheDomain::Abi => self.abi_ttl_seconds,
            CacheDomain::Network => self.network_ttl_seconds,
            CacheDomain::Ens => self.ens_ttl_seconds,
            CacheDomain::NftMetadata => self.nft_metadata_ttl_seconds,
        };
        Duration::from_secs(seconds)
    }

    /// Sets the price TTL.
    #[must_use]
    pub fn with_price_ttl(mut self, ttl: Duration) -> Self {
        self.price_ttl_seconds = ttl.as_secs();
        self
    }

    /// Sets the token metadata TTL.
    #[must_use]
    pub fn with_metadata_ttl(mut self, ttl: Duration) -> Self {
        self.metadata_ttl_seconds = ttl.as_secs();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_refreshes_faster_than_metadata() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl_for(CacheDomain::Price), Duration::from_secs(3600));
        assert_eq!(
            config.ttl_for(CacheDomain::TokenMetadata),
            Duration::from_secs(365 * 24 * 3600)
        );
        assert_eq!(
            config.ttl_for(CacheDomain::Ens),
            Duration::from_secs(30 * 24 * 3600)
        );
        assert!(config.ttl_for(CacheDomain::Price) < config.ttl_for(CacheDomain::Abi));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: CacheConfig = serde_json::from_str(r#"{"price_ttl_seconds": 60}"#).unwrap();
        assert_eq!(config.price_ttl_seconds, 60);
        assert_eq!(config.nft_metadata_ttl_seconds, 30 * DAY);
    }
}
