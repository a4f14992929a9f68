// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Fallback catalog of last-known-good records
//!
//! The catalog holds one canonical record per data domain. Whenever a part
//! of a snapshot cannot be acquired, the matching part of the catalog record
//! is substituted; when nothing can be acquired the whole record is served.
//! Every entry is labelled `fallback` and satisfies the same invariants as a
//! live record.
//!
//! The built-in catalog is compiled in. An operator may replace it at
//! startup with a YAML file of the same schema; the file is validated and
//! rejected as a whole if any entry is invalid.

use std::{path::Path, sync::Arc};

use chrono::{DateTime, TimeDelta, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use shared_types::{
    BlockSummary, CollectionSummary, CollectionsSnapshot, DataDomain, DataQuality, FeeTiers,
    HashrateSnapshot, MempoolSnapshot, PoolShare, PriceTicker, RecentTransaction, RuneSummary,
    RunesSnapshot, Snapshot, WalletAddress, WalletPortfolio,
};
use tokio::fs;
use tracing::info;

use crate::{
    error::{CatalogError, CatalogResult},
    record::CanonicalRecord,
};

/// Version of the built-in catalog
pub const BUILTIN_CATALOG_VERSION: Version = Version::new(1, 0, 0);

/// Major catalog schema version accepted from override files
pub const SUPPORTED_CATALOG_MAJOR: u64 = 1;

// 2024-11-01T00:00:00Z, when the built-in values were curated
const CURATED_AT_SECS: i64 = 1_730_419_200;

/// Versioned set of fallback records, one per data domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackCatalog {
    /// Catalog schema version
    pub version: Version,
    /// Mempool fallback
    pub mempool: MempoolSnapshot,
    /// Hashrate fallback
    pub hashrate: HashrateSnapshot,
    /// Collection listing fallback
    pub collections: CollectionsSnapshot,
    /// Rune listing fallback
    pub runes: RunesSnapshot,
    /// Spot price fallback
    pub price: PriceTicker,
}

/// Snapshot types stored in the catalog
pub trait CatalogEntry: Snapshot {
    /// Borrow this domain's entry
    fn entry(catalog: &FallbackCatalog) -> &Self;

    /// Wrap a snapshot of this domain
    fn into_record(snapshot: Arc<Self>) -> CanonicalRecord;
}

impl CatalogEntry for MempoolSnapshot {
    fn entry(catalog: &FallbackCatalog) -> &Self {
        &catalog.mempool
    }

    fn into_record(snapshot: Arc<Self>) -> CanonicalRecord {
        CanonicalRecord::Mempool(snapshot)
    }
}

impl CatalogEntry for HashrateSnapshot {
    fn entry(catalog: &FallbackCatalog) -> &Self {
        &catalog.hashrate
    }

    fn into_record(snapshot: Arc<Self>) -> CanonicalRecord {
        CanonicalRecord::Hashrate(snapshot)
    }
}

impl CatalogEntry for CollectionsSnapshot {
    fn entry(catalog: &FallbackCatalog) -> &Self {
        &catalog.collections
    }

    fn into_record(snapshot: Arc<Self>) -> CanonicalRecord {
        CanonicalRecord::Collections(snapshot)
    }
}

impl CatalogEntry for RunesSnapshot {
    fn entry(catalog: &FallbackCatalog) -> &Self {
        &catalog.runes
    }

    fn into_record(snapshot: Arc<Self>) -> CanonicalRecord {
        CanonicalRecord::Runes(snapshot)
    }
}

impl CatalogEntry for PriceTicker {
    fn entry(catalog: &FallbackCatalog) -> &Self {
        &catalog.price
    }

    fn into_record(snapshot: Arc<Self>) -> CanonicalRecord {
        CanonicalRecord::Price(snapshot)
    }
}

impl FallbackCatalog {
    /// The compiled-in catalog
    pub fn builtin() -> Self {
        let curated_at = DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(CURATED_AT_SECS);
        let fallback = DataQuality::Fallback;

        Self {
            version: BUILTIN_CATALOG_VERSION,
            mempool: MempoolSnapshot {
                pending_transaction_count: 12_345,
                average_fee_rate: 25,
                mempool_size_bytes: 8_500,
                fee_tiers: FeeTiers {
                    low: 15,
                    medium: 25,
                    high: 40,
                },
                recent_transactions: vec![
                    RecentTransaction {
                        txid: "3b7f8c1d2e4a5b6c7d8e9f0a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c"
                            .to_string(),
                        fee_sats: 3_500,
                        vsize: 140,
                        value_sats: 150_000,
                    },
                    RecentTransaction {
                        txid: "c0b9a8f7e6d5c4b3a2f1e0d9c8b7a6f5e4d3c2b1a0f9e8d7c6b5a4f3e2d1c0b9"
                            .to_string(),
                        fee_sats: 5_250,
                        vsize: 210,
                        value_sats: 2_400_000,
                    },
                ],
                latest_block: BlockSummary {
                    height: 868_200,
                    hash: "000000000000000000015d8a9c3f0e7b2a4d6c8e0f1a3b5c7d9e1f3a5b7c9d1e"
                        .to_string(),
                    timestamp_ms: (CURATED_AT_SECS - 600) * 1000,
                    size_bytes: 1_600_000,
                    weight: 3_993_000,
                },
                observed_at: curated_at,
                data_quality: fallback,
            },
            hashrate: HashrateSnapshot {
                current_hashrate_ehs: 650.0,
                change_percent: 0.0,
                difficulty: 101_646_843_652_785.0,
                next_retarget_eta: curated_at + TimeDelta::days(7),
                remaining_blocks: 1_008,
                progress_percent: 50.0,
                mining_distribution: vec![
                    pool("Foundry USA", 30.0),
                    pool("AntPool", 24.0),
                    pool("ViaBTC", 13.0),
                    pool("F2Pool", 11.0),
                    pool("MARA Pool", 5.0),
                ],
                observed_at: curated_at,
                data_quality: fallback,
            },
            collections: CollectionsSnapshot {
                collections: vec![
                    collection("NodeMonkes", 30.0, 0.08, 5_800, 1),
                    collection("Bitcoin Puppets", 20.0, 0.07, 4_400, 2),
                    collection("Runestone", 15.0, 0.004, 71_000, 3),
                    collection("Quantum Cats", 8.0, 0.3, 2_100, 4),
                    collection("Bitcoin Frogs", 5.0, 0.03, 3_900, 5),
                ],
                observed_at: curated_at,
                data_quality: fallback,
            },
            runes: RunesSnapshot {
                runes: vec![
                    rune("DOG•GO•TO•THE•MOON", 40.0, 0.5, 90_000, 1),
                    rune("PUPS•WORLD•PEACE", 9.0, 7.0, 16_800, 2),
                    rune("RSIC•GENESIS•RUNE", 6.0, 1.9, 33_000, 3),
                    rune("SATOSHI•NAKAMOTO", 3.0, 110.0, 28_000, 4),
                    rune("MEME•ECONOMICS", 2.0, 0.3, 11_000, 5),
                ],
                observed_at: curated_at,
                data_quality: fallback,
            },
            price: PriceTicker {
                btc_usd: 69_000.0,
                change_24h_percent: 0.0,
                observed_at: curated_at,
                data_quality: fallback,
            },
        }
    }

    /// Load a catalog override from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated
    pub async fn from_file<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| CatalogError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        let catalog = Self::from_yaml_str(&content)?;

        info!(
            path = %path.display(),
            version = %catalog.version,
            "Loaded fallback catalog override"
        );
        Ok(catalog)
    }

    /// Parse and validate a catalog from YAML
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or the catalog is invalid
    pub fn from_yaml_str(content: &str) -> CatalogResult<Self> {
        let catalog: Self = serde_yaml::from_str(content).map_err(|e| CatalogError::Parse {
            message: e.to_string(),
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Use the override at `path` if given, the built-in catalog otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if an override is given but invalid
    pub async fn load(path: Option<&Path>) -> CatalogResult<Self> {
        match path {
            Some(path) => Self::from_file(path).await,
            None => Ok(Self::builtin()),
        }
    }

    /// Check the version and every entry's invariants
    ///
    /// # Errors
    ///
    /// Returns the first violation found
    pub fn validate(&self) -> CatalogResult<()> {
        if self.version.major != SUPPORTED_CATALOG_MAJOR {
            return Err(CatalogError::UnsupportedVersion {
                found: self.version.to_string(),
                supported: format!("{SUPPORTED_CATALOG_MAJOR}.x"),
            });
        }
        check_entry(&self.mempool)?;
        check_entry(&self.hashrate)?;
        check_entry(&self.collections)?;
        check_entry(&self.runes)?;
        check_entry(&self.price)
    }

    /// Fallback record for a domain
    pub fn get(&self, domain: DataDomain) -> CanonicalRecord {
        match domain {
            DataDomain::Mempool => CanonicalRecord::Mempool(Arc::new(self.mempool.clone())),
            DataDomain::Hashrate => CanonicalRecord::Hashrate(Arc::new(self.hashrate.clone())),
            DataDomain::Collections => {
                CanonicalRecord::Collections(Arc::new(self.collections.clone()))
            }
            DataDomain::Runes => CanonicalRecord::Runes(Arc::new(self.runes.clone())),
            DataDomain::Price => CanonicalRecord::Price(Arc::new(self.price.clone())),
        }
    }

    /// Fallback portfolio for an address: no holdings
    pub fn portfolio(&self, address: &WalletAddress) -> WalletPortfolio {
        WalletPortfolio::empty(address.as_str())
    }
}

impl Default for FallbackCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn check_entry<T: Snapshot>(entry: &T) -> CatalogResult<()> {
    entry.validate().map_err(|source| CatalogError::InvalidEntry {
        domain: T::DOMAIN,
        source,
    })?;
    if entry.data_quality() != DataQuality::Fallback {
        return Err(CatalogError::WrongQuality { domain: T::DOMAIN });
    }
    Ok(())
}

fn pool(pool_name: &str, share_percent: f64) -> PoolShare {
    PoolShare {
        pool_name: pool_name.to_string(),
        share_percent,
    }
}

fn collection(
    name: &str,
    volume_24h: f64,
    floor_price: f64,
    unique_holders: u64,
    rank: u32,
) -> CollectionSummary {
    CollectionSummary {
        name: name.to_string(),
        volume_24h,
        floor_price,
        unique_holders,
        rank,
    }
}

fn rune(name: &str, volume_24h: f64, price: f64, unique_holders: u64, rank: u32) -> RuneSummary {
    RuneSummary {
        name: name.to_string(),
        volume_24h,
        price,
        unique_holders,
        rank,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::TempDir;
    use tokio::fs::write;

    use super::*;

    async fn write_catalog(content: &str) -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.yaml");
        write(&path, content).await.unwrap();
        (temp_dir, path)
    }

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = FallbackCatalog::builtin();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.version, Version::new(1, 0, 0));
    }

    #[test]
    fn builtin_mempool_values() {
        let mempool = &FallbackCatalog::builtin().mempool;

        assert_eq!(mempool.pending_transaction_count, 12_345);
        assert_eq!(mempool.average_fee_rate, 25);
        assert_eq!(mempool.mempool_size_bytes, 8_500);
        assert_eq!(
            mempool.fee_tiers,
            FeeTiers {
                low: 15,
                medium: 25,
                high: 40
            }
        );
    }

    #[test]
    fn get_is_total() {
        let catalog = FallbackCatalog::builtin();
        for domain in DataDomain::all() {
            let record = catalog.get(*domain);
            assert_eq!(record.domain(), *domain);
            assert_eq!(record.data_quality(), DataQuality::Fallback);
        }
    }

    #[tokio::test]
    async fn load_override_from_yaml() {
        let mut catalog = FallbackCatalog::builtin();
        catalog.version = Version::new(1, 2, 0);
        catalog.price.btc_usd = 71_000.0;
        let (_temp_dir, path) = write_catalog(&serde_yaml::to_string(&catalog).unwrap()).await;

        let loaded = FallbackCatalog::load(Some(&path)).await.unwrap();

        assert_eq!(loaded, catalog);
    }

    #[tokio::test]
    async fn reject_unsupported_version() {
        let mut catalog = FallbackCatalog::builtin();
        catalog.version = Version::new(2, 0, 0);
        let (_temp_dir, path) = write_catalog(&serde_yaml::to_string(&catalog).unwrap()).await;

        let result = FallbackCatalog::from_file(&path).await;

        assert!(matches!(
            result,
            Err(CatalogError::UnsupportedVersion { .. })
        ));
    }

    #[tokio::test]
    async fn reject_invalid_entry() {
        let mut catalog = FallbackCatalog::builtin();
        catalog.runes.runes.swap(0, 1);
        let (_temp_dir, path) = write_catalog(&serde_yaml::to_string(&catalog).unwrap()).await;

        let result = FallbackCatalog::from_file(&path).await;

        assert!(matches!(
            result,
            Err(CatalogError::InvalidEntry {
                domain: DataDomain::Runes,
                ..
            })
        ));
    }

    #[test]
    fn reject_live_labelled_entry() {
        let mut catalog = FallbackCatalog::builtin();
        catalog.hashrate.data_quality = DataQuality::Live;

        assert!(matches!(
            catalog.validate(),
            Err(CatalogError::WrongQuality {
                domain: DataDomain::Hashrate
            })
        ));
    }

    #[tokio::test]
    async fn missing_or_malformed_file() {
        assert!(matches!(
            FallbackCatalog::from_file("/nonexistent/catalog.yaml").await,
            Err(CatalogError::Io { .. })
        ));
        let (_temp_dir, path) = write_catalog("version: [not, a, version]").await;
        assert!(matches!(
            FallbackCatalog::from_file(&path).await,
            Err(CatalogError::Parse { .. })
        ));
    }
}
