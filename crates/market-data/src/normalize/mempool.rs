// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Mempool explorer parts

use serde_json::Value;
use shared_types::{BlockSummary, FeeTiers, MAX_RECENT_TRANSACTIONS, RecentTransaction};
use tracing::warn;

use super::{
    Normalize, Normalized,
    coerce::{FieldReader, as_i64, as_text, as_u32, as_u64, expect_array},
};
use crate::error::SchemaMismatch;

impl Normalize for FeeTiers {
    const PART: &'static str = "feeTiers";

    fn normalize(raw: &Value, defaults: &Self) -> Result<Normalized<Self>, SchemaMismatch> {
        let mut reader = FieldReader::object(raw, "$")?;
        let tiers = Self {
            low: reader.take("feeTiers.low", &["hourFee"], defaults.low, as_u32),
            medium: reader.take("feeTiers.medium", &["halfHourFee"], defaults.medium, as_u32),
            high: reader.take("feeTiers.high", &["fastestFee"], defaults.high, as_u32),
        };
        if !tiers.is_ordered() {
            warn!(
                low = tiers.low,
                medium = tiers.medium,
                high = tiers.high,
                "fee tiers are not in ascending order"
            );
        }
        reader.finish(Self::PART, tiers)
    }
}

/// Mempool size counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MempoolUsage {
    /// Unconfirmed transaction count
    pub pending_transaction_count: u64,
    /// Mempool size
    pub mempool_size_bytes: u64,
}

impl Normalize for MempoolUsage {
    const PART: &'static str = "usage";

    fn normalize(raw: &Value, defaults: &Self) -> Result<Normalized<Self>, SchemaMismatch> {
        let mut reader = FieldReader::object(raw, "$")?;
        let usage = Self {
            pending_transaction_count: reader.take(
                "pendingTransactionCount",
                &["count"],
                defaults.pending_transaction_count,
                as_u64,
            ),
            mempool_size_bytes: reader.take(
                "mempoolSizeBytes",
                &["vsize"],
                defaults.mempool_size_bytes,
                as_u64,
            ),
        };
        reader.finish(Self::PART, usage)
    }
}

/// Median fee rate of the next projected block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AverageFeeRate(pub u32);

impl Normalize for AverageFeeRate {
    const PART: &'static str = "averageFeeRate";

    fn normalize(raw: &Value, defaults: &Self) -> Result<Normalized<Self>, SchemaMismatch> {
        let blocks = expect_array(raw, "$")?;
        let first = blocks
            .first()
            .ok_or(SchemaMismatch::Unreadable { part: Self::PART })?;
        let mut reader = FieldReader::object(first, "$[0]")?;
        let rate = reader.take("averageFeeRate", &["medianFee"], defaults.0, as_u32);
        reader.finish(Self::PART, Self(rate))
    }
}

/// Most recent unconfirmed transactions, in upstream order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentActivity(pub Vec<RecentTransaction>);

impl Normalize for RecentActivity {
    const PART: &'static str = "recentTransactions";

    fn normalize(raw: &Value, _defaults: &Self) -> Result<Normalized<Self>, SchemaMismatch> {
        let items = expect_array(raw, "$")?;
        let mut defaulted = Vec::new();
        let mut transactions = Vec::with_capacity(MAX_RECENT_TRANSACTIONS);

        for (index, item) in items.iter().take(MAX_RECENT_TRANSACTIONS).enumerate() {
            let mut reader = FieldReader::object(item, &format!("$[{index}]"))?;
            let Some(txid) = reader.lookup(&["txid"]).and_then(as_text) else {
                defaulted.push("recentTransactions.txid");
                continue;
            };
            reader.record_read();
            transactions.push(RecentTransaction {
                txid,
                fee_sats: reader.take("recentTransactions.feeSats", &["fee"], 0, as_u64),
                vsize: reader.take("recentTransactions.vsize", &["vsize"], 0, as_u64),
                value_sats: reader.take("recentTransactions.valueSats", &["value"], 0, as_u64),
            });
            defaulted.extend(reader.finish(Self::PART, ())?.defaulted);
        }

        if !items.is_empty() && transactions.is_empty() {
            return Err(SchemaMismatch::Unreadable { part: Self::PART });
        }
        defaulted.sort_unstable();
        defaulted.dedup();
        Ok(Normalized {
            value: Self(transactions),
            defaulted,
        })
    }
}

/// The latest block is swapped as a whole unit: any missing field rejects it
impl Normalize for BlockSummary {
    const PART: &'static str = "latestBlock";

    fn normalize(raw: &Value, _defaults: &Self) -> Result<Normalized<Self>, SchemaMismatch> {
        let blocks = expect_array(raw, "$")?;
        let (index, latest) = blocks
            .iter()
            .enumerate()
            .filter_map(|(index, block)| {
                block
                    .get("height")
                    .and_then(as_u64)
                    .map(|height| (height, index, block))
            })
            .max_by_key(|(height, _, _)| *height)
            .map(|(_, index, block)| (index, block))
            .ok_or(SchemaMismatch::Unreadable { part: Self::PART })?;

        let reader = FieldReader::object(latest, &format!("$[{index}]"))?;
        let hash = required(&reader, index, &["id", "hash"], "string", as_text)?;
        let height = required(&reader, index, &["height"], "number", as_u64)?;
        let timestamp_secs = required(&reader, index, &["timestamp"], "number", as_i64)?;
        let size_bytes = required(&reader, index, &["size"], "number", as_u64)?;
        let weight = required(&reader, index, &["weight"], "number", as_u64)?;

        Ok(Normalized::complete(Self {
            height,
            hash,
            timestamp_ms: timestamp_secs.saturating_mul(1000),
            size_bytes,
            weight,
        }))
    }
}

fn required<T>(
    reader: &FieldReader<'_>,
    index: usize,
    keys: &[&str],
    expected: &'static str,
    coerce: impl Fn(&Value) -> Option<T>,
) -> Result<T, SchemaMismatch> {
    reader
        .lookup(keys)
        .and_then(coerce)
        .ok_or_else(|| SchemaMismatch::WrongShape {
            path: format!("$[{index}].{}", keys.join("|")),
            expected,
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fallback_tiers() -> FeeTiers {
        FeeTiers {
            low: 15,
            medium: 25,
            high: 40,
        }
    }

    fn fallback_block() -> BlockSummary {
        BlockSummary {
            height: 1,
            hash: "fallback".to_string(),
            timestamp_ms: 0,
            size_bytes: 0,
            weight: 0,
        }
    }

    #[test]
    fn fee_tiers_map_and_round() {
        let raw = json!({"fastestFee": 41.6, "halfHourFee": "28", "hourFee": 17});
        let tiers = FeeTiers::normalize(&raw, &fallback_tiers()).unwrap();

        assert!(tiers.is_complete());
        assert_eq!(
            tiers.value,
            FeeTiers {
                low: 17,
                medium: 28,
                high: 42
            }
        );
    }

    #[test]
    fn fee_tiers_default_missing_fields() {
        let raw = json!({"fastestFee": 60});
        let tiers = FeeTiers::normalize(&raw, &fallback_tiers()).unwrap();

        assert_eq!(tiers.value.high, 60);
        assert_eq!(tiers.value.low, 15);
        assert_eq!(tiers.defaulted, vec!["feeTiers.low", "feeTiers.medium"]);
    }

    #[test]
    fn out_of_order_tiers_are_kept() {
        let raw = json!({"fastestFee": 5, "halfHourFee": 10, "hourFee": 20});
        let tiers = FeeTiers::normalize(&raw, &fallback_tiers()).unwrap();
        assert!(!tiers.value.is_ordered());
    }

    #[test]
    fn fee_tiers_wrong_shape() {
        assert!(matches!(
            FeeTiers::normalize(&json!([1, 2, 3]), &fallback_tiers()),
            Err(SchemaMismatch::WrongShape { .. })
        ));
        assert_eq!(
            FeeTiers::normalize(&json!({"foo": 1}), &fallback_tiers()),
            Err(SchemaMismatch::Unreadable { part: "feeTiers" })
        );
    }

    #[test]
    fn average_fee_rate_from_first_projected_block() {
        let raw = json!([{"medianFee": 31.4}, {"medianFee": 12.0}]);
        let rate = AverageFeeRate::normalize(&raw, &AverageFeeRate(25)).unwrap();
        assert_eq!(rate.value, AverageFeeRate(31));

        assert!(AverageFeeRate::normalize(&json!([]), &AverageFeeRate(25)).is_err());
    }

    #[test]
    fn recent_transactions_are_capped() {
        let items: Vec<Value> = (0..15)
            .map(|i| json!({"txid": format!("tx{i}"), "fee": 100 + i, "vsize": 140, "value": 5000}))
            .collect();
        let activity = RecentActivity::normalize(&Value::Array(items), &RecentActivity(vec![]))
            .unwrap()
            .value;

        assert_eq!(activity.0.len(), MAX_RECENT_TRANSACTIONS);
        assert_eq!(activity.0[0].txid, "tx0");
        assert_eq!(activity.0[9].fee_sats, 109);
    }

    #[test]
    fn recent_transactions_without_txid_are_dropped() {
        let raw = json!([{"fee": 1}, {"txid": "abc", "fee": 2}]);
        let activity = RecentActivity::normalize(&raw, &RecentActivity(vec![])).unwrap();

        assert_eq!(activity.value.0.len(), 1);
        assert!(activity.defaulted.contains(&"recentTransactions.txid"));
        assert!(activity.defaulted.contains(&"recentTransactions.vsize"));
    }

    #[test]
    fn latest_block_is_highest_height() {
        let raw = json!([
            {"id": "older", "height": 100, "timestamp": 1_700_000_000, "size": 10, "weight": 40},
            {"id": "newer", "height": 101, "timestamp": 1_700_000_600, "size": 11, "weight": 44}
        ]);
        let block = BlockSummary::normalize(&raw, &fallback_block()).unwrap().value;

        assert_eq!(block.hash, "newer");
        assert_eq!(block.timestamp_ms, 1_700_000_600_000);
    }

    #[test]
    fn incomplete_latest_block_is_rejected_whole() {
        let raw = json!([{"id": "abc", "height": 100, "timestamp": 1_700_000_000, "size": 10}]);
        assert!(matches!(
            BlockSummary::normalize(&raw, &fallback_block()),
            Err(SchemaMismatch::WrongShape { .. })
        ));
    }
}
