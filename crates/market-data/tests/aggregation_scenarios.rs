// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! End-to-end aggregation scenarios over scripted providers

use std::{sync::Arc, time::Duration};

use api_client::{Endpoint, StaticProvider, StaticResponse};
use market_data::{
    Aggregator, AggregatorConfig, FallbackCatalog, Normalize,
    normalize::{
        AverageFeeRate, BtcQuote, CollectionListing, DifficultyProgress, HashrateReading,
        InscriptionHoldings, MempoolUsage, MiningDistribution, RecentActivity, RuneHoldings,
        RuneListing,
    },
};
use serde_json::{Value, json};
use shared_types::{BlockSummary, DataQuality, FeeTiers, Snapshot, WalletAddress};
use tokio::time::Instant;

const MEMPOOL_ENDPOINTS: [Endpoint; 5] = [
    Endpoint::RecommendedFees,
    Endpoint::MempoolStats,
    Endpoint::ProjectedBlocks,
    Endpoint::RecentTransactions,
    Endpoint::RecentBlocks,
];

fn aggregator(provider: StaticProvider) -> Aggregator<StaticProvider> {
    Aggregator::new(
        Arc::new(provider),
        Arc::new(FallbackCatalog::builtin()),
        AggregatorConfig {
            deadline: Duration::from_secs(2),
            ..AggregatorConfig::default()
        },
    )
}

#[tokio::test(start_paused = true)]
async fn slow_difficulty_call_degrades_hashrate() {
    let provider = StaticProvider::demo()
        .with_response(
            &Endpoint::Hashrate,
            StaticResponse::json(json!({
                "currentHashrate": 3.5e20,
                "hashrates": [{ "avgHashrate": 3.4e20 }, { "avgHashrate": 3.5e20 }]
            })),
        )
        .with_response(
            &Endpoint::DifficultyAdjustment,
            StaticResponse::json(json!({ "difficulty": 1.0 })).after(Duration::from_secs(30)),
        );
    let aggregator = aggregator(provider);
    let fallback = aggregator.catalog().hashrate.clone();

    let snapshot = aggregator.hashrate().await;

    assert!((snapshot.current_hashrate_ehs - 350.0).abs() < 1e-9);
    assert!((snapshot.difficulty - fallback.difficulty).abs() < f64::EPSILON);
    assert_eq!(snapshot.remaining_blocks, fallback.remaining_blocks);
    assert_eq!(snapshot.next_retarget_eta, fallback.next_retarget_eta);
    assert_eq!(snapshot.data_quality, DataQuality::Degraded);
}

#[tokio::test(start_paused = true)]
async fn failing_mempool_sources_serve_catalog_entry() {
    let provider =
        StaticProvider::new().with_responses(&MEMPOOL_ENDPOINTS, &StaticResponse::Status(500));
    let aggregator = aggregator(provider);

    let snapshot = aggregator.mempool().await;

    let expected = aggregator
        .catalog()
        .mempool
        .clone()
        .stamped(snapshot.observed_at, DataQuality::Fallback);
    assert_eq!(snapshot, expected);
}

#[tokio::test(start_paused = true)]
async fn total_failure_is_stable_across_runs() {
    let provider =
        StaticProvider::new().with_responses(&MEMPOOL_ENDPOINTS, &StaticResponse::Malformed);
    let aggregator = aggregator(provider);
    let catalog_entry = aggregator.catalog().mempool.clone();

    let first = aggregator.mempool().await;
    tokio::time::advance(Duration::from_secs(60)).await;
    let second = aggregator.mempool().await;

    for snapshot in [first, second] {
        assert_eq!(snapshot.data_quality, DataQuality::Fallback);
        assert_eq!(
            snapshot.stamped(catalog_entry.observed_at, catalog_entry.data_quality),
            catalog_entry
        );
    }
}

#[tokio::test(start_paused = true)]
async fn runes_are_ranked_by_volume_then_name() {
    let provider = StaticProvider::new().with_response(
        &Endpoint::Runes,
        StaticResponse::json(json!([
            { "spaced_rune": "A", "volume_24h": 10 },
            { "spaced_rune": "B", "volume_24h": 50 },
            { "spaced_rune": "C", "volume_24h": 30 },
            { "spaced_rune": "AA", "volume_24h": 30 }
        ])),
    );
    let aggregator = aggregator(provider);

    let snapshot = aggregator.runes().await;

    let order: Vec<(&str, u32)> = snapshot
        .runes
        .iter()
        .map(|r| (r.name.as_str(), r.rank))
        .collect();
    assert_eq!(order, vec![("B", 1), ("AA", 2), ("C", 3), ("A", 4)]);
    assert_eq!(snapshot.data_quality, DataQuality::Degraded);
}

#[tokio::test(start_paused = true)]
async fn assembly_returns_by_the_deadline() {
    let slow = StaticResponse::json(json!({})).after(Duration::from_secs(600));
    let provider = StaticProvider::new().with_responses(&MEMPOOL_ENDPOINTS, &slow);
    let aggregator = aggregator(provider);

    let started = Instant::now();
    let snapshot = aggregator.mempool().await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_millis(2_100), "took {elapsed:?}");
    assert_eq!(snapshot.data_quality, DataQuality::Fallback);
}

#[tokio::test(start_paused = true)]
async fn every_record_validates_under_failure() {
    let aggregator = aggregator(StaticProvider::new());

    assert_eq!(aggregator.mempool().await.validate(), Ok(()));
    assert_eq!(aggregator.hashrate().await.validate(), Ok(()));
    assert_eq!(aggregator.collections().await.validate(), Ok(()));
    assert_eq!(aggregator.runes().await.validate(), Ok(()));
    assert_eq!(aggregator.price().await.validate(), Ok(()));

    let address = WalletAddress::parse("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq").unwrap();
    let portfolio = aggregator.portfolio(&address).await;
    assert_eq!(portfolio.data_quality, DataQuality::Fallback);
    assert_eq!(portfolio.validate(), Ok(()));
}

fn hostile_inputs() -> Vec<Value> {
    vec![
        Value::Null,
        json!(true),
        json!(-1),
        json!("text"),
        json!([]),
        json!({}),
        json!([null, 1, "x", {}]),
        json!({ "results": "nope" }),
        json!({ "results": [{ "name": null }] }),
        json!({ "data": [{ "name": "x", "volume_24h": "NaN" }] }),
        json!({ "bitcoin": { "usd": -5 } }),
        json!({ "pools": [{ "blockCount": -1 }], "blockCount": 0 }),
        json!({ "currentHashrate": "1e400", "hashrates": [{ "avgHashrate": 0 }] }),
        json!({ "fastestFee": 1e30, "halfHourFee": "2", "hourFee": [] }),
        json!([{ "height": "tall", "timestamp": -3 }]),
        json!({ "progressPercent": 1e9, "estimatedRetargetDate": -1 }),
        json!({
            "currentHashrate": 350e18,
            "hashrates": [{ "avgHashrate": 1e-300 }, { "avgHashrate": 1e300 }]
        }),
        json!({ "pools": [{ "name": "AntPool", "share": 1e307 }] }),
        json!({ "data": [{ "name": "x", "volume_24h": 1e308, "price": "1e308" }] }),
    ]
}

/// Floating point fields of a normalized part
trait FloatFields {
    fn floats(&self) -> Vec<f64> {
        Vec::new()
    }
}

impl FloatFields for FeeTiers {}
impl FloatFields for MempoolUsage {}
impl FloatFields for AverageFeeRate {}
impl FloatFields for RecentActivity {}
impl FloatFields for BlockSummary {}
impl FloatFields for InscriptionHoldings {}
impl FloatFields for RuneHoldings {}

impl FloatFields for HashrateReading {
    fn floats(&self) -> Vec<f64> {
        vec![self.current_hashrate_ehs, self.change_percent]
    }
}

impl FloatFields for DifficultyProgress {
    fn floats(&self) -> Vec<f64> {
        vec![self.difficulty, self.progress_percent]
    }
}

impl FloatFields for MiningDistribution {
    fn floats(&self) -> Vec<f64> {
        self.0.iter().map(|pool| pool.share_percent).collect()
    }
}

impl FloatFields for CollectionListing {
    fn floats(&self) -> Vec<f64> {
        self.0
            .iter()
            .flat_map(|item| [item.volume_24h, item.floor_price])
            .collect()
    }
}

impl FloatFields for RuneListing {
    fn floats(&self) -> Vec<f64> {
        self.0.iter().flat_map(|item| [item.volume_24h, item.price]).collect()
    }
}

impl FloatFields for BtcQuote {
    fn floats(&self) -> Vec<f64> {
        vec![self.btc_usd, self.change_24h_percent]
    }
}

fn exercise<T: Normalize + FloatFields>(defaults: &T) {
    for input in hostile_inputs() {
        if let Ok(normalized) = T::normalize(&input, defaults) {
            assert!(
                normalized.value.floats().iter().all(|f| f.is_finite()),
                "non-finite value normalized from {input}"
            );
        }
    }
}

#[test]
fn normalizers_only_emit_finite_values() {
    let catalog = FallbackCatalog::builtin();
    let hashrate = &catalog.hashrate;

    exercise::<FeeTiers>(&catalog.mempool.fee_tiers);
    exercise(&MempoolUsage {
        pending_transaction_count: 0,
        mempool_size_bytes: 0,
    });
    exercise(&AverageFeeRate(0));
    exercise(&RecentActivity(Vec::new()));
    exercise::<BlockSummary>(&catalog.mempool.latest_block);
    exercise(&HashrateReading {
        current_hashrate_ehs: hashrate.current_hashrate_ehs,
        change_percent: 0.0,
    });
    exercise(&DifficultyProgress {
        difficulty: hashrate.difficulty,
        next_retarget_eta: hashrate.next_retarget_eta,
        remaining_blocks: hashrate.remaining_blocks,
        progress_percent: hashrate.progress_percent,
    });
    exercise(&MiningDistribution(hashrate.mining_distribution.clone()));
    exercise(&CollectionListing(Vec::new()));
    exercise(&RuneListing(Vec::new()));
    exercise(&BtcQuote {
        btc_usd: 0.0,
        change_24h_percent: 0.0,
    });
    exercise(&InscriptionHoldings::default());
    exercise(&RuneHoldings::default());
}

#[tokio::test]
async fn hostile_hashrate_part_keeps_live_siblings() {
    for input in hostile_inputs() {
        let provider =
            StaticProvider::demo().with_response(&Endpoint::Hashrate, StaticResponse::json(input));
        let aggregator = aggregator(provider);

        let snapshot = aggregator.hashrate().await;

        assert_eq!(snapshot.data_quality, DataQuality::Degraded);
        assert_eq!(snapshot.validate(), Ok(()));
        // difficulty still comes from the live demo response
        assert!((snapshot.difficulty - 95_672_703_408_224.0).abs() < 1.0);
    }
}

#[tokio::test]
async fn overflowing_hashrate_series_only_defaults_the_change() {
    let provider = StaticProvider::demo().with_response(
        &Endpoint::Hashrate,
        StaticResponse::json(json!({
            "currentHashrate": 350e18,
            "hashrates": [{ "avgHashrate": 1e-300 }, { "avgHashrate": 1e300 }]
        })),
    );
    let aggregator = aggregator(provider);

    let snapshot = aggregator.hashrate().await;

    assert_eq!(snapshot.data_quality, DataQuality::Degraded);
    assert!((snapshot.current_hashrate_ehs - 350.0).abs() < 1e-9);
    assert!(snapshot.change_percent.is_finite());
    assert_eq!(snapshot.validate(), Ok(()));
}

#[tokio::test]
async fn hostile_fee_part_keeps_live_siblings() {
    for input in hostile_inputs() {
        let provider = StaticProvider::demo()
            .with_response(&Endpoint::RecommendedFees, StaticResponse::json(input));
        let aggregator = aggregator(provider);

        let snapshot = aggregator.mempool().await;

        assert_eq!(snapshot.data_quality, DataQuality::Degraded);
        assert_eq!(snapshot.validate(), Ok(()));
    }
}
