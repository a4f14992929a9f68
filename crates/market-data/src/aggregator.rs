// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Snapshot assembly with concurrent fan-out and per-part fallback
//!
//! For each domain the aggregator issues every provider call at once, waits
//! until they all settle or the snapshot deadline passes, normalizes what
//! came back and substitutes the catalog's part for anything that failed.
//! Assembly never fails: the worst case is the full catalog record, stamped
//! with the current time and labelled `fallback`.

use std::{sync::Arc, time::Duration};

use api_client::{Endpoint, ProviderClient, ProviderError, RawResponse};
use chrono::Utc;
use shared_types::{
    BlockSummary, CollectionsSnapshot, DataDomain, DataQuality, FeeTiers, HashrateSnapshot,
    MempoolSnapshot, PriceTicker, RunesSnapshot, Snapshot, WalletAddress, WalletPortfolio,
};
use tokio::time::{Instant, timeout_at};
use tokio_retry::{
    RetryIf,
    strategy::{ExponentialBackoff, jitter},
};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    error::SchemaMismatch,
    fallback::FallbackCatalog,
    metrics,
    normalize::{
        AverageFeeRate, BtcQuote, CollectionListing, DifficultyProgress, HashrateReading,
        InscriptionHoldings, MempoolUsage, MiningDistribution, Normalize, RecentActivity,
        RuneHoldings, RuneListing, rank_by_volume,
    },
    record::CanonicalRecord,
};

/// Default snapshot deadline
pub const DEFAULT_SNAPSHOT_DEADLINE: Duration = Duration::from_secs(10);

/// Default number of retries for transient provider errors
pub const DEFAULT_MAX_RETRIES: usize = 1;

/// Default length of ranked listings
pub const DEFAULT_LIST_LIMIT: usize = 20;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Aggregation tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Time budget for one snapshot, retries included
    pub deadline: Duration,
    /// Retries per call for transient errors
    pub max_retries: usize,
    /// Base delay of the exponential backoff
    pub retry_base_delay: Duration,
    /// Maximum items in a ranked listing
    pub list_limit: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            deadline: DEFAULT_SNAPSHOT_DEADLINE,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_millis(200),
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

/// Why a part was not taken from a live response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubstitutionReason {
    /// The provider call failed or missed the deadline
    Provider(ProviderError),
    /// The response did not have the expected structure
    SchemaMismatch(SchemaMismatch),
}

impl SubstitutionReason {
    /// Label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Provider(error) => error.kind(),
            Self::SchemaMismatch(_) => "schema_mismatch",
        }
    }
}

/// How one part of a snapshot was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartOutcome {
    /// Every field came from the live response
    Live,
    /// Live response with some fields taken from the catalog
    Defaulted {
        /// Defaulted record fields
        fields: Vec<&'static str>,
    },
    /// The whole part came from the catalog
    Substituted(SubstitutionReason),
}

/// Outcome of one part, as logged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartReport {
    /// Part name
    pub part: &'static str,
    /// Endpoint that supplies the part
    pub endpoint: Endpoint,
    /// How the part was obtained
    pub outcome: PartOutcome,
    /// Time spent on the call, retries included
    pub latency: Duration,
}

struct CallResult {
    endpoint: Endpoint,
    outcome: Result<RawResponse, ProviderError>,
    latency: Duration,
}

/// Collects part outcomes for one snapshot
#[derive(Debug)]
struct Assembly {
    domain: &'static str,
    parts: Vec<PartReport>,
}

impl Assembly {
    fn new(domain: &'static str) -> Self {
        Self {
            domain,
            parts: Vec::new(),
        }
    }

    fn settle<T: Normalize>(&mut self, call: &CallResult, fallback: T) -> T {
        let (value, outcome) = match &call.outcome {
            Ok(raw) => match T::normalize(&raw.body, &fallback) {
                Ok(normalized) if normalized.is_complete() => (normalized.value, PartOutcome::Live),
                Ok(normalized) => (
                    normalized.value,
                    PartOutcome::Defaulted {
                        fields: normalized.defaulted,
                    },
                ),
                Err(mismatch) => (
                    fallback,
                    PartOutcome::Substituted(SubstitutionReason::SchemaMismatch(mismatch)),
                ),
            },
            Err(error) if error.is_schema_mismatch() => (
                fallback,
                PartOutcome::Substituted(SubstitutionReason::SchemaMismatch(
                    SchemaMismatch::Undecodable {
                        message: error.to_string(),
                    },
                )),
            ),
            Err(error) => (
                fallback,
                PartOutcome::Substituted(SubstitutionReason::Provider(error.clone())),
            ),
        };

        let report = PartReport {
            part: T::PART,
            endpoint: call.endpoint.clone(),
            outcome,
            latency: call.latency,
        };
        self.log(&report);
        self.parts.push(report);
        value
    }

    fn log(&self, report: &PartReport) {
        let domain = self.domain;
        let latency_ms = u64::try_from(report.latency.as_millis()).unwrap_or(u64::MAX);
        match &report.outcome {
            PartOutcome::Live => debug!(
                domain,
                part = report.part,
                endpoint = %report.endpoint,
                outcome = "live",
                latency_ms,
                "part assembled from live response"
            ),
            PartOutcome::Defaulted { fields } => {
                metrics::record_substitution(domain, report.part, "defaulted");
                info!(
                    domain,
                    part = report.part,
                    endpoint = %report.endpoint,
                    outcome = "defaulted",
                    latency_ms,
                    fields = ?fields,
                    "part assembled with defaulted fields"
                );
            }
            PartOutcome::Substituted(SubstitutionReason::SchemaMismatch(mismatch)) => {
                metrics::record_substitution(domain, report.part, "schema_mismatch");
                warn!(
                    domain,
                    part = report.part,
                    endpoint = %report.endpoint,
                    outcome = "schema_mismatch",
                    latency_ms,
                    error = %mismatch,
                    "provider response has an unexpected schema, substituting fallback part"
                );
            }
            PartOutcome::Substituted(SubstitutionReason::Provider(error)) => {
                metrics::record_substitution(domain, report.part, error.kind());
                warn!(
                    domain,
                    part = report.part,
                    endpoint = %report.endpoint,
                    outcome = error.kind(),
                    latency_ms,
                    error = %error,
                    "provider call failed, substituting fallback part"
                );
            }
        }
    }

    fn quality(&self) -> DataQuality {
        let live = self
            .parts
            .iter()
            .filter(|p| p.outcome == PartOutcome::Live)
            .count();
        let substituted = self
            .parts
            .iter()
            .filter(|p| matches!(p.outcome, PartOutcome::Substituted(_)))
            .count();
        DataQuality::classify(live, substituted, self.parts.len())
    }

    fn finish<S: Snapshot>(self, assembled: S, fallback: &S) -> S {
        let now = Utc::now();
        let quality = self.quality();
        let snapshot = if quality == DataQuality::Fallback {
            fallback.clone().stamped(now, DataQuality::Fallback)
        } else {
            let snapshot = assembled.stamped(now, quality);
            match snapshot.validate() {
                Ok(()) => snapshot,
                Err(e) => {
                    error!(
                        domain = self.domain,
                        error = %e,
                        "assembled snapshot violates an invariant, serving fallback"
                    );
                    fallback.clone().stamped(now, DataQuality::Fallback)
                }
            }
        };
        self.record(snapshot.data_quality());
        snapshot
    }

    fn record(&self, quality: DataQuality) {
        metrics::record_assembly(self.domain, quality.as_str());
        if quality.has_live_data() {
            info!(
                domain = self.domain,
                data_quality = quality.as_str(),
                parts = self.parts.len(),
                "snapshot assembled"
            );
        } else {
            warn!(
                domain = self.domain,
                parts = self.parts.len(),
                "no live data available, snapshot served from fallback catalog"
            );
        }
    }
}

/// Assembles canonical snapshots from a provider
#[derive(Debug)]
pub struct Aggregator<P> {
    provider: Arc<P>,
    catalog: Arc<FallbackCatalog>,
    config: AggregatorConfig,
}

impl<P: ProviderClient> Aggregator<P> {
    /// Create an aggregator
    pub fn new(provider: Arc<P>, catalog: Arc<FallbackCatalog>, config: AggregatorConfig) -> Self {
        Self {
            provider,
            catalog,
            config,
        }
    }

    /// Fallback catalog used for substitution
    pub fn catalog(&self) -> &Arc<FallbackCatalog> {
        &self.catalog
    }

    /// Aggregation tuning
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Assemble the snapshot of any shared domain
    pub async fn assemble(&self, domain: DataDomain) -> CanonicalRecord {
        match domain {
            DataDomain::Mempool => CanonicalRecord::Mempool(Arc::new(self.mempool().await)),
            DataDomain::Hashrate => CanonicalRecord::Hashrate(Arc::new(self.hashrate().await)),
            DataDomain::Collections => {
                CanonicalRecord::Collections(Arc::new(self.collections().await))
            }
            DataDomain::Runes => CanonicalRecord::Runes(Arc::new(self.runes().await)),
            DataDomain::Price => CanonicalRecord::Price(Arc::new(self.price().await)),
        }
    }

    /// Assemble the mempool snapshot from five concurrent calls
    #[instrument(skip(self))]
    pub async fn mempool(&self) -> MempoolSnapshot {
        let deadline = self.deadline();
        let (fees, stats, projected, recent, blocks) = tokio::join!(
            self.call(Endpoint::RecommendedFees, deadline),
            self.call(Endpoint::MempoolStats, deadline),
            self.call(Endpoint::ProjectedBlocks, deadline),
            self.call(Endpoint::RecentTransactions, deadline),
            self.call(Endpoint::RecentBlocks, deadline),
        );

        let fallback = &self.catalog.mempool;
        let mut assembly = Assembly::new(DataDomain::Mempool.name());
        let fee_tiers: FeeTiers = assembly.settle(&fees, fallback.fee_tiers);
        let usage = assembly.settle(
            &stats,
            MempoolUsage {
                pending_transaction_count: fallback.pending_transaction_count,
                mempool_size_bytes: fallback.mempool_size_bytes,
            },
        );
        let average = assembly.settle(&projected, AverageFeeRate(fallback.average_fee_rate));
        let recent = assembly.settle(
            &recent,
            RecentActivity(fallback.recent_transactions.clone()),
        );
        let latest_block: BlockSummary = assembly.settle(&blocks, fallback.latest_block.clone());

        let assembled = MempoolSnapshot {
            pending_transaction_count: usage.pending_transaction_count,
            average_fee_rate: average.0,
            mempool_size_bytes: usage.mempool_size_bytes,
            fee_tiers,
            recent_transactions: recent.0,
            latest_block,
            observed_at: fallback.observed_at,
            data_quality: DataQuality::Fallback,
        };
        assembly.finish(assembled, fallback)
    }

    /// Assemble the hashrate snapshot from three concurrent calls
    #[instrument(skip(self))]
    pub async fn hashrate(&self) -> HashrateSnapshot {
        let deadline = self.deadline();
        let (hashrate, difficulty, pools) = tokio::join!(
            self.call(Endpoint::Hashrate, deadline),
            self.call(Endpoint::DifficultyAdjustment, deadline),
            self.call(Endpoint::MiningPools, deadline),
        );

        let fallback = &self.catalog.hashrate;
        let mut assembly = Assembly::new(DataDomain::Hashrate.name());
        let reading = assembly.settle(
            &hashrate,
            HashrateReading {
                current_hashrate_ehs: fallback.current_hashrate_ehs,
                change_percent: fallback.change_percent,
            },
        );
        let progress = assembly.settle(
            &difficulty,
            DifficultyProgress {
                difficulty: fallback.difficulty,
                next_retarget_eta: fallback.next_retarget_eta,
                remaining_blocks: fallback.remaining_blocks,
                progress_percent: fallback.progress_percent,
            },
        );
        let distribution = assembly.settle(
            &pools,
            MiningDistribution(fallback.mining_distribution.clone()),
        );

        let assembled = HashrateSnapshot {
            current_hashrate_ehs: reading.current_hashrate_ehs,
            change_percent: reading.change_percent,
            difficulty: progress.difficulty,
            next_retarget_eta: progress.next_retarget_eta,
            remaining_blocks: progress.remaining_blocks,
            progress_percent: progress.progress_percent,
            mining_distribution: distribution.0,
            observed_at: fallback.observed_at,
            data_quality: DataQuality::Fallback,
        };
        assembly.finish(assembled, fallback)
    }

    /// Assemble the ranked collection listing
    #[instrument(skip(self))]
    pub async fn collections(&self) -> CollectionsSnapshot {
        let call = self.call(Endpoint::Collections, self.deadline()).await;

        let fallback = &self.catalog.collections;
        let mut assembly = Assembly::new(DataDomain::Collections.name());
        let CollectionListing(mut collections) =
            assembly.settle(&call, CollectionListing(fallback.collections.clone()));
        rank_by_volume(&mut collections, self.config.list_limit);

        let assembled = CollectionsSnapshot {
            collections,
            observed_at: fallback.observed_at,
            data_quality: DataQuality::Fallback,
        };
        assembly.finish(assembled, fallback)
    }

    /// Assemble the ranked rune listing
    #[instrument(skip(self))]
    pub async fn runes(&self) -> RunesSnapshot {
        let call = self.call(Endpoint::Runes, self.deadline()).await;

        let fallback = &self.catalog.runes;
        let mut assembly = Assembly::new(DataDomain::Runes.name());
        let RuneListing(mut runes) = assembly.settle(&call, RuneListing(fallback.runes.clone()));
        rank_by_volume(&mut runes, self.config.list_limit);

        let assembled = RunesSnapshot {
            runes,
            observed_at: fallback.observed_at,
            data_quality: DataQuality::Fallback,
        };
        assembly.finish(assembled, fallback)
    }

    /// Assemble the spot price ticker
    #[instrument(skip(self))]
    pub async fn price(&self) -> PriceTicker {
        let call = self.call(Endpoint::BtcPrice, self.deadline()).await;

        let fallback = &self.catalog.price;
        let mut assembly = Assembly::new(DataDomain::Price.name());
        let quote = assembly.settle(
            &call,
            BtcQuote {
                btc_usd: fallback.btc_usd,
                change_24h_percent: fallback.change_24h_percent,
            },
        );

        let assembled = PriceTicker {
            btc_usd: quote.btc_usd,
            change_24h_percent: quote.change_24h_percent,
            observed_at: fallback.observed_at,
            data_quality: DataQuality::Fallback,
        };
        assembly.finish(assembled, fallback)
    }

    /// Assemble the holdings of one wallet
    ///
    /// Portfolios are per-request and never cached; the fallback is an
    /// empty portfolio.
    #[instrument(skip_all, fields(address = %address))]
    pub async fn portfolio(&self, address: &WalletAddress) -> WalletPortfolio {
        let deadline = self.deadline();
        let (inscriptions, runes) = tokio::join!(
            self.call(Endpoint::AddressInscriptions(address.clone()), deadline),
            self.call(Endpoint::AddressRunes(address.clone()), deadline),
        );

        let fallback = self.catalog.portfolio(address);
        let mut assembly = Assembly::new("portfolio");
        let holdings = assembly.settle(
            &inscriptions,
            InscriptionHoldings {
                inscription_count: fallback.inscription_count,
                inscription_ids: fallback.inscription_ids.clone(),
            },
        );
        let RuneHoldings(rune_balances) =
            assembly.settle(&runes, RuneHoldings(fallback.rune_balances.clone()));

        let data_quality = assembly.quality();
        assembly.record(data_quality);
        let portfolio = WalletPortfolio {
            address: address.to_string(),
            inscription_count: holdings.inscription_count,
            inscription_ids: holdings.inscription_ids,
            rune_balances,
            observed_at: Utc::now(),
            data_quality,
        };
        if let Err(e) = portfolio.validate() {
            error!(error = %e, "assembled portfolio violates an invariant, serving fallback");
            return WalletPortfolio {
                observed_at: portfolio.observed_at,
                ..fallback
            };
        }
        portfolio
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.config.deadline
    }

    /// One provider call bounded by the snapshot deadline
    async fn call(&self, endpoint: Endpoint, deadline: Instant) -> CallResult {
        let started = Instant::now();
        let outcome = match timeout_at(deadline, self.fetch_with_retry(&endpoint)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderError::Timeout {
                timeout_ms: u64::try_from(self.config.deadline.as_millis()).unwrap_or(u64::MAX),
            }),
        };
        let latency = started.elapsed();

        let result = match &outcome {
            Ok(_) => "success",
            Err(error) => error.kind(),
        };
        metrics::observe_provider_call(endpoint.name(), result, latency.as_secs_f64());

        CallResult {
            endpoint,
            outcome,
            latency,
        }
    }

    /// Fetch with jittered exponential backoff on transient errors
    async fn fetch_with_retry(&self, endpoint: &Endpoint) -> Result<RawResponse, ProviderError> {
        let base_ms = u64::try_from(self.config.retry_base_delay.as_millis()).unwrap_or(u64::MAX);
        let retry_strategy = ExponentialBackoff::from_millis(base_ms.max(1))
            .max_delay(MAX_RETRY_DELAY)
            .take(self.config.max_retries)
            .map(jitter);

        RetryIf::start(
            retry_strategy,
            || self.provider.fetch(endpoint),
            |error: &ProviderError| {
                let transient = error.is_transient();
                if transient {
                    debug!(
                        endpoint = %endpoint,
                        error = %error,
                        "transient provider error, retrying"
                    );
                }
                transient
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use api_client::{StaticProvider, StaticResponse};
    use serde_json::json;

    use super::*;

    fn aggregator(provider: StaticProvider) -> (Aggregator<StaticProvider>, Arc<StaticProvider>) {
        let provider = Arc::new(provider);
        let aggregator = Aggregator::new(
            provider.clone(),
            Arc::new(FallbackCatalog::builtin()),
            AggregatorConfig::default(),
        );
        (aggregator, provider)
    }

    #[tokio::test]
    async fn demo_provider_yields_live_snapshots() {
        let (aggregator, _) = aggregator(StaticProvider::demo());

        let mempool = aggregator.mempool().await;
        assert_eq!(mempool.data_quality, DataQuality::Live);
        assert_eq!(mempool.fee_tiers.high, 42);
        assert_eq!(mempool.average_fee_rate, 31);
        assert_eq!(mempool.latest_block.height, 867_530);

        let hashrate = aggregator.hashrate().await;
        assert_eq!(hashrate.data_quality, DataQuality::Live);
        assert!((hashrate.current_hashrate_ehs - 658.0).abs() < f64::EPSILON);

        let price = aggregator.price().await;
        assert_eq!(price.data_quality, DataQuality::Live);
    }

    #[tokio::test]
    async fn demo_listings_are_ranked() {
        let (aggregator, _) = aggregator(StaticProvider::demo());

        let collections = aggregator.collections().await;
        assert_eq!(collections.collections[0].name, "NodeMonkes");
        assert_eq!(collections.collections[0].rank, 1);
        assert!(collections.validate().is_ok());
    }

    #[tokio::test]
    async fn latest_block_is_swapped_whole() {
        let (aggregator, _) = aggregator(
            StaticProvider::demo().with_response(
                &Endpoint::RecentBlocks,
                StaticResponse::json(json!([{"id": "abc", "height": 900_000}])),
            ),
        );

        let mempool = aggregator.mempool().await;

        assert_eq!(
            mempool.latest_block,
            FallbackCatalog::builtin().mempool.latest_block
        );
        assert_eq!(mempool.data_quality, DataQuality::Degraded);
        assert_eq!(mempool.fee_tiers.high, 42);
    }

    #[tokio::test]
    async fn decode_failures_are_substituted() {
        let (aggregator, _) = aggregator(
            StaticProvider::new().with_response(&Endpoint::BtcPrice, StaticResponse::Malformed),
        );

        let price = aggregator.price().await;

        assert_eq!(price.data_quality, DataQuality::Fallback);
        assert!((price.btc_usd - 69_000.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_once() {
        let (aggregator, provider) = aggregator(
            StaticProvider::new().with_response(&Endpoint::BtcPrice, StaticResponse::Status(503)),
        );

        let _ = aggregator.price().await;
        assert_eq!(provider.call_count(&Endpoint::BtcPrice), 2);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let (aggregator, provider) = aggregator(
            StaticProvider::new().with_response(&Endpoint::Runes, StaticResponse::Status(401)),
        );

        let runes = aggregator.runes().await;
        assert_eq!(provider.call_count(&Endpoint::Runes), 1);
        assert_eq!(runes.data_quality, DataQuality::Fallback);
    }

    #[tokio::test]
    async fn portfolio_fallback_is_empty() {
        let (aggregator, _) = aggregator(StaticProvider::new());
        let address = WalletAddress::parse("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq").unwrap();

        let portfolio = aggregator.portfolio(&address).await;

        assert_eq!(portfolio.address, address.as_str());
        assert_eq!(portfolio.inscription_count, 0);
        assert_eq!(portfolio.data_quality, DataQuality::Fallback);
    }

    #[tokio::test]
    async fn demo_portfolio_is_live() {
        let (aggregator, _) = aggregator(StaticProvider::demo());
        let address = WalletAddress::parse("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq").unwrap();

        let portfolio = aggregator.portfolio(&address).await;

        assert_eq!(portfolio.data_quality, DataQuality::Live);
        assert_eq!(portfolio.inscription_count, 3);
        assert_eq!(portfolio.rune_balances.len(), 2);
    }

    #[test]
    fn substitution_labels() {
        let reason = SubstitutionReason::Provider(ProviderError::Timeout { timeout_ms: 10 });
        assert_eq!(reason.label(), "timeout");
        let reason = SubstitutionReason::SchemaMismatch(SchemaMismatch::Unreadable { part: "x" });
        assert_eq!(reason.label(), "schema_mismatch");
    }
}
