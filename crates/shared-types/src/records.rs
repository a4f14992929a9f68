// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Canonical market data records
//!
//! Every data domain is normalized into exactly one of these records,
//! independent of the upstream provider's native shape. Records are
//! immutable values: each refresh builds a new one and replaces the old one
//! wholesale. Live, degraded and fallback records share the same shape and
//! satisfy the same invariants, checked by [`Snapshot::validate`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::{DataDomain, DataQuality};

/// Maximum number of recent transactions kept in a mempool snapshot
pub const MAX_RECENT_TRANSACTIONS: usize = 10;

/// Maximum number of inscription ids kept in a wallet portfolio
pub const MAX_PORTFOLIO_INSCRIPTIONS: usize = 20;

/// Violation of a canonical record invariant
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordInvariantError {
    /// A floating point field is NaN or infinite
    #[error("field {field} is not a finite number")]
    NonFinite {
        /// Offending field
        field: &'static str,
    },

    /// A numeric field is outside its documented range
    #[error("field {field} = {value} is out of range")]
    OutOfRange {
        /// Offending field
        field: &'static str,
        /// Offending value
        value: f64,
    },

    /// A sequence exceeds its documented maximum length
    #[error("field {field} has {len} items (max {max})")]
    TooManyItems {
        /// Offending field
        field: &'static str,
        /// Actual length
        len: usize,
        /// Documented maximum
        max: usize,
    },

    /// List ranks are not `1..=N` in order of descending volume
    #[error("item {index} has rank {rank}, expected {expected}")]
    RankOrder {
        /// Position in the list
        index: usize,
        /// Rank found at that position
        rank: u32,
        /// Rank expected at that position
        expected: u32,
    },

    /// A ranked list is not sorted by descending volume
    #[error("item {index} has a higher volume than its predecessor")]
    VolumeOrder {
        /// Position in the list
        index: usize,
    },
}

/// Common behaviour of every assembled snapshot
pub trait Snapshot: Clone + Send + Sync + 'static {
    /// Domain this record type belongs to
    const DOMAIN: DataDomain;

    /// When this snapshot was assembled
    fn observed_at(&self) -> DateTime<Utc>;

    /// Provenance of the snapshot's values
    fn data_quality(&self) -> DataQuality;

    /// Return a copy stamped with a new assembly time and quality
    #[must_use]
    fn stamped(self, observed_at: DateTime<Utc>, data_quality: DataQuality) -> Self;

    /// Check the structural invariants of this record
    ///
    /// # Errors
    ///
    /// Returns the first invariant violation found
    fn validate(&self) -> Result<(), RecordInvariantError>;
}

/// Items of a ranked top-N list
pub trait Ranked {
    /// Display name, used as the ranking tie-breaker
    fn name(&self) -> &str;
    /// Trailing 24h volume, the ranking key
    fn volume_24h(&self) -> f64;
    /// Assigned 1-based rank
    fn rank(&self) -> u32;
    /// Assign the 1-based rank
    fn set_rank(&mut self, rank: u32);
}

fn finite(field: &'static str, value: f64) -> Result<(), RecordInvariantError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RecordInvariantError::NonFinite { field })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), RecordInvariantError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(RecordInvariantError::OutOfRange { field, value });
    }
    Ok(())
}

fn at_most(field: &'static str, len: usize, max: usize) -> Result<(), RecordInvariantError> {
    if len > max {
        return Err(RecordInvariantError::TooManyItems { field, len, max });
    }
    Ok(())
}

fn validate_ranked<T: Ranked>(field: &'static str, items: &[T]) -> Result<(), RecordInvariantError> {
    for (index, item) in items.iter().enumerate() {
        non_negative(field, item.volume_24h())?;
        let expected = u32::try_from(index + 1).unwrap_or(u32::MAX);
        if item.rank() != expected {
            return Err(RecordInvariantError::RankOrder {
                index,
                rank: item.rank(),
                expected,
            });
        }
        if index > 0 && item.volume_24h() > items[index - 1].volume_24h() {
            return Err(RecordInvariantError::VolumeOrder { index });
        }
    }
    Ok(())
}

/// Recommended fee rates in sat/vB
///
/// `low <= medium <= high` is expected from upstream but not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FeeTiers {
    /// Economy confirmation (about an hour)
    pub low: u32,
    /// Standard confirmation (about half an hour)
    pub medium: u32,
    /// Next-block confirmation
    pub high: u32,
}

impl FeeTiers {
    /// Check whether the tiers are in ascending order
    pub fn is_ordered(&self) -> bool {
        self.low <= self.medium && self.medium <= self.high
    }
}

/// Unconfirmed transaction summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecentTransaction {
    /// Transaction id
    pub txid: String,
    /// Absolute fee in satoshis
    pub fee_sats: u64,
    /// Virtual size in vbytes
    pub vsize: u64,
    /// Total output value in satoshis
    pub value_sats: u64,
}

/// Latest mined block, always replaced as a whole unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    /// Block height
    pub height: u64,
    /// Block hash
    pub hash: String,
    /// Block timestamp in milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    /// Serialized size in bytes
    pub size_bytes: u64,
    /// Block weight in weight units
    pub weight: u64,
}

/// Mempool dashboard snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MempoolSnapshot {
    /// Number of unconfirmed transactions
    pub pending_transaction_count: u64,
    /// Median fee rate of the next projected block, sat/vB
    pub average_fee_rate: u32,
    /// Mempool size as reported by the explorer
    pub mempool_size_bytes: u64,
    /// Recommended fee tiers
    pub fee_tiers: FeeTiers,
    /// Most recent unconfirmed transactions, newest first
    pub recent_transactions: Vec<RecentTransaction>,
    /// Latest mined block
    pub latest_block: BlockSummary,
    /// Assembly time
    pub observed_at: DateTime<Utc>,
    /// Provenance of the values
    pub data_quality: DataQuality,
}

impl Snapshot for MempoolSnapshot {
    const DOMAIN: DataDomain = DataDomain::Mempool;

    fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    fn data_quality(&self) -> DataQuality {
        self.data_quality
    }

    fn stamped(mut self, observed_at: DateTime<Utc>, data_quality: DataQuality) -> Self {
        self.observed_at = observed_at;
        self.data_quality = data_quality;
        self
    }

    fn validate(&self) -> Result<(), RecordInvariantError> {
        at_most(
            "recentTransactions",
            self.recent_transactions.len(),
            MAX_RECENT_TRANSACTIONS,
        )
    }
}

/// Share of recently mined blocks attributed to one pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PoolShare {
    /// Mining pool name
    pub pool_name: String,
    /// Percentage of blocks in the window, 0-100
    pub share_percent: f64,
}

/// Hashrate and difficulty snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HashrateSnapshot {
    /// Current network hashrate in EH/s, rounded to an integer
    #[serde(rename = "currentHashrateEHs")]
    pub current_hashrate_ehs: f64,
    /// Hashrate change over the sampled window, percent
    pub change_percent: f64,
    /// Current difficulty
    pub difficulty: f64,
    /// Estimated time of the next difficulty retarget
    pub next_retarget_eta: DateTime<Utc>,
    /// Blocks remaining until the retarget
    pub remaining_blocks: u32,
    /// Progress through the current epoch, 0-100
    pub progress_percent: f64,
    /// Top pools by share; upstream truncation means shares need not sum to 100
    pub mining_distribution: Vec<PoolShare>,
    /// Assembly time
    pub observed_at: DateTime<Utc>,
    /// Provenance of the values
    pub data_quality: DataQuality,
}

impl Snapshot for HashrateSnapshot {
    const DOMAIN: DataDomain = DataDomain::Hashrate;

    fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    fn data_quality(&self) -> DataQuality {
        self.data_quality
    }

    fn stamped(mut self, observed_at: DateTime<Utc>, data_quality: DataQuality) -> Self {
        self.observed_at = observed_at;
        self.data_quality = data_quality;
        self
    }

    fn validate(&self) -> Result<(), RecordInvariantError> {
        non_negative("currentHashrateEHs", self.current_hashrate_ehs)?;
        finite("changePercent", self.change_percent)?;
        non_negative("difficulty", self.difficulty)?;
        non_negative("progressPercent", self.progress_percent)?;
        if self.progress_percent > 100.0 {
            return Err(RecordInvariantError::OutOfRange {
                field: "progressPercent",
                value: self.progress_percent,
            });
        }
        for pool in &self.mining_distribution {
            non_negative("miningDistribution.sharePercent", pool.share_percent)?;
        }
        Ok(())
    }
}

/// Inscription collection market summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    /// Collection name
    pub name: String,
    /// Trailing 24h volume in BTC
    pub volume_24h: f64,
    /// Floor price in BTC
    pub floor_price: f64,
    /// Distinct holder count
    pub unique_holders: u64,
    /// 1-based rank by descending volume
    pub rank: u32,
}

impl Ranked for CollectionSummary {
    fn name(&self) -> &str {
        &self.name
    }

    fn volume_24h(&self) -> f64 {
        self.volume_24h
    }

    fn rank(&self) -> u32 {
        self.rank
    }

    fn set_rank(&mut self, rank: u32) {
        self.rank = rank;
    }
}

/// Rune market summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuneSummary {
    /// Spaced rune name
    pub name: String,
    /// Trailing 24h volume in BTC
    pub volume_24h: f64,
    /// Unit price in satoshis
    pub price: f64,
    /// Distinct holder count
    pub unique_holders: u64,
    /// 1-based rank by descending volume
    pub rank: u32,
}

impl Ranked for RuneSummary {
    fn name(&self) -> &str {
        &self.name
    }

    fn volume_24h(&self) -> f64 {
        self.volume_24h
    }

    fn rank(&self) -> u32 {
        self.rank
    }

    fn set_rank(&mut self, rank: u32) {
        self.rank = rank;
    }
}

/// Ranked collection listing snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollectionsSnapshot {
    /// Collections ordered by rank
    pub collections: Vec<CollectionSummary>,
    /// Assembly time
    pub observed_at: DateTime<Utc>,
    /// Provenance of the values
    pub data_quality: DataQuality,
}

impl Snapshot for CollectionsSnapshot {
    const DOMAIN: DataDomain = DataDomain::Collections;

    fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    fn data_quality(&self) -> DataQuality {
        self.data_quality
    }

    fn stamped(mut self, observed_at: DateTime<Utc>, data_quality: DataQuality) -> Self {
        self.observed_at = observed_at;
        self.data_quality = data_quality;
        self
    }

    fn validate(&self) -> Result<(), RecordInvariantError> {
        validate_ranked("collections", &self.collections)?;
        for item in &self.collections {
            non_negative("collections.floorPrice", item.floor_price)?;
        }
        Ok(())
    }
}

/// Ranked rune listing snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunesSnapshot {
    /// Runes ordered by rank
    pub runes: Vec<RuneSummary>,
    /// Assembly time
    pub observed_at: DateTime<Utc>,
    /// Provenance of the values
    pub data_quality: DataQuality,
}

impl Snapshot for RunesSnapshot {
    const DOMAIN: DataDomain = DataDomain::Runes;

    fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    fn data_quality(&self) -> DataQuality {
        self.data_quality
    }

    fn stamped(mut self, observed_at: DateTime<Utc>, data_quality: DataQuality) -> Self {
        self.observed_at = observed_at;
        self.data_quality = data_quality;
        self
    }

    fn validate(&self) -> Result<(), RecordInvariantError> {
        validate_ranked("runes", &self.runes)?;
        for item in &self.runes {
            non_negative("runes.price", item.price)?;
        }
        Ok(())
    }
}

/// Bitcoin spot price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceTicker {
    /// BTC price in USD
    pub btc_usd: f64,
    /// 24h price change, percent
    pub change_24h_percent: f64,
    /// Assembly time
    pub observed_at: DateTime<Utc>,
    /// Provenance of the values
    pub data_quality: DataQuality,
}

impl Snapshot for PriceTicker {
    const DOMAIN: DataDomain = DataDomain::Price;

    fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    fn data_quality(&self) -> DataQuality {
        self.data_quality
    }

    fn stamped(mut self, observed_at: DateTime<Utc>, data_quality: DataQuality) -> Self {
        self.observed_at = observed_at;
        self.data_quality = data_quality;
        self
    }

    fn validate(&self) -> Result<(), RecordInvariantError> {
        non_negative("btcUsd", self.btc_usd)?;
        finite("change24hPercent", self.change_24h_percent)
    }
}

/// Rune balance held by a wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RuneBalance {
    /// Spaced rune name
    pub rune: String,
    /// Decimal amount, kept as a string to preserve divisibility
    pub amount: String,
}

/// Ordinals holdings of a single wallet address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletPortfolio {
    /// Queried address
    pub address: String,
    /// Total inscriptions held
    pub inscription_count: u64,
    /// Most recent inscription ids, at most [`MAX_PORTFOLIO_INSCRIPTIONS`]
    pub inscription_ids: Vec<String>,
    /// Rune balances
    pub rune_balances: Vec<RuneBalance>,
    /// Assembly time
    pub observed_at: DateTime<Utc>,
    /// Provenance of the values
    pub data_quality: DataQuality,
}

impl WalletPortfolio {
    /// Empty portfolio for an address, used when nothing could be fetched
    pub fn empty(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            inscription_count: 0,
            inscription_ids: Vec::new(),
            rune_balances: Vec::new(),
            observed_at: DateTime::<Utc>::UNIX_EPOCH,
            data_quality: DataQuality::Fallback,
        }
    }

    /// Check the structural invariants of this record
    ///
    /// # Errors
    ///
    /// Returns an error if too many inscription ids are listed
    pub fn validate(&self) -> Result<(), RecordInvariantError> {
        at_most(
            "inscriptionIds",
            self.inscription_ids.len(),
            MAX_PORTFOLIO_INSCRIPTIONS,
        )
    }
}
