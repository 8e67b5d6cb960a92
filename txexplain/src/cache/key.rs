//! Cache key construction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of data a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheDomain {
    /// Token prices.
    Price,
    /// Token contract metadata.
    TokenMetadata,
    /// Contract ABIs.
    Abi,
    /// Network information.
    Network,
    /// ENS resolutions.
    Ens,
    /// NFT metadata.
    NftMetadata,
}

impl CacheDomain {
    /// The key prefix for this domain.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::TokenMetadata => "token",
            Self::Abi => "abi",
            Self::Network => "network",
            Self::Ens => "ens",
            Self::NftMetadata => "nft",
        }
    }
}

/// A rendered cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    domain: CacheDomain,
    rendered: String,
}

impl CacheKey {
    /// Builds `<domain>:<network_id>:<id>`, omitting the network segment when
    /// `network_id` is `None`. Ids are lowercased so checksummed and plain
    /// addresses share an entry.
    #[must_use]
    pub fn new(domain: CacheDomain, network_id: Option<u64>, id: &str) -> Self {
        let id = id.trim().to_lowercase();
        let rendered = match network_id {
            Some(network) => format!("{}:{network}:{id}", domain.prefix()),
            None => format!("{}:{id}", domain.prefix()),
        };
        Self { domain, rendered }
    }

    /// The key's domain.
    #[must_use]
    pub const fn domain(&self) -> CacheDomain {
        self.domain
    }

    /// The rendered key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}
