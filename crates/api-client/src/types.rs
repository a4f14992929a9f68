// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Upstream endpoints and raw provider responses

use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared_types::WalletAddress;

/// Upstream service families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderSource {
    /// Mempool, fee, block and mining explorer
    Mempool,
    /// Inscription and rune indexer (API-key auth)
    Indexer,
    /// Spot price aggregator (API-key auth)
    Price,
}

impl ProviderSource {
    /// Returns the lowercase name used in logs and metrics
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mempool => "mempool",
            Self::Indexer => "indexer",
            Self::Price => "price",
        }
    }
}

impl fmt::Display for ProviderSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One upstream call
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Recommended fee rates
    RecommendedFees,
    /// Mempool transaction count and virtual size
    MempoolStats,
    /// Projected next blocks with their median fees
    ProjectedBlocks,
    /// Latest unconfirmed transactions
    RecentTransactions,
    /// Latest mined blocks
    RecentBlocks,
    /// Network hashrate series
    Hashrate,
    /// Difficulty epoch progress
    DifficultyAdjustment,
    /// Mining pool block shares
    MiningPools,
    /// Inscription collections with market stats
    Collections,
    /// Runes with market stats
    Runes,
    /// Inscriptions held by an address
    AddressInscriptions(WalletAddress),
    /// Rune balances held by an address
    AddressRunes(WalletAddress),
    /// BTC/USD spot price with 24h change
    BtcPrice,
}

impl Endpoint {
    /// Source serving this endpoint
    pub const fn source(&self) -> ProviderSource {
        match self {
            Self::RecommendedFees
            | Self::MempoolStats
            | Self::ProjectedBlocks
            | Self::RecentTransactions
            | Self::RecentBlocks
            | Self::Hashrate
            | Self::DifficultyAdjustment
            | Self::MiningPools => ProviderSource::Mempool,
            Self::Collections
            | Self::Runes
            | Self::AddressInscriptions(_)
            | Self::AddressRunes(_) => ProviderSource::Indexer,
            Self::BtcPrice => ProviderSource::Price,
        }
    }

    /// Stable identifier used in logs, metrics and scripted responses
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RecommendedFees => "recommended_fees",
            Self::MempoolStats => "mempool_stats",
            Self::ProjectedBlocks => "projected_blocks",
            Self::RecentTransactions => "recent_transactions",
            Self::RecentBlocks => "recent_blocks",
            Self::Hashrate => "hashrate",
            Self::DifficultyAdjustment => "difficulty_adjustment",
            Self::MiningPools => "mining_pools",
            Self::Collections => "collections",
            Self::Runes => "runes",
            Self::AddressInscriptions(_) => "address_inscriptions",
            Self::AddressRunes(_) => "address_runes",
            Self::BtcPrice => "btc_price",
        }
    }

    /// Path relative to the source's base URL, including any fixed query
    pub fn path(&self) -> String {
        match self {
            Self::RecommendedFees => "/v1/fees/recommended".to_string(),
            Self::MempoolStats => "/mempool".to_string(),
            Self::ProjectedBlocks => "/v1/fees/mempool-blocks".to_string(),
            Self::RecentTransactions => "/mempool/recent".to_string(),
            Self::RecentBlocks => "/v1/blocks".to_string(),
            Self::Hashrate => "/v1/mining/hashrate/3d".to_string(),
            Self::DifficultyAdjustment => "/v1/difficulty-adjustment".to_string(),
            Self::MiningPools => "/v1/mining/pools/1w".to_string(),
            Self::Collections => "/v1/collections".to_string(),
            Self::Runes => "/v1/runes".to_string(),
            Self::AddressInscriptions(address) => format!("/v1/addresses/{address}/inscriptions"),
            Self::AddressRunes(address) => format!("/v1/addresses/{address}/runes"),
            Self::BtcPrice => {
                "/v1/simple/price?ids=bitcoin&vs_currencies=usd&include_24hr_change=true"
                    .to_string()
            }
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source(), self.name())
    }
}

/// Successful upstream response, not yet validated
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    /// Decoded JSON body
    pub body: serde_json::Value,
    /// HTTP status of the response
    pub status: u16,
    /// Time from request start to decoded body
    pub latency: Duration,
    /// When the response was received
    pub received_at: DateTime<Utc>,
}

impl RawResponse {
    /// Build a 200 response received now
    pub fn ok(body: serde_json::Value, latency: Duration) -> Self {
        Self {
            body,
            status: 200,
            latency,
            received_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_endpoints_embed_the_address() {
        let address = WalletAddress::parse("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq").unwrap();
        let endpoint = Endpoint::AddressRunes(address);
        assert_eq!(
            endpoint.path(),
            "/v1/addresses/bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq/runes"
        );
        assert_eq!(endpoint.source(), ProviderSource::Indexer);
        assert_eq!(endpoint.to_string(), "indexer:address_runes");
    }

    #[test]
    fn sources_by_endpoint() {
        assert_eq!(Endpoint::MiningPools.source(), ProviderSource::Mempool);
        assert_eq!(Endpoint::Collections.source(), ProviderSource::Indexer);
        assert_eq!(Endpoint::BtcPrice.source(), ProviderSource::Price);
        assert!(Endpoint::BtcPrice.path().contains("vs_currencies=usd"));
    }
}
