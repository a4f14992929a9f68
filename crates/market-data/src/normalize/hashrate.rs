// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Hashrate, difficulty and mining pool parts

use chrono::{DateTime, Utc};
use serde_json::Value;
use shared_types::PoolShare;

use super::{
    Normalize, Normalized,
    coerce::{FieldReader, as_f64, as_i64, as_non_negative, as_text, as_u32, expect_array, round2},
};
use crate::error::SchemaMismatch;

/// Number of pools kept in the mining distribution
pub const MAX_MINING_POOLS: usize = 10;

const HASHES_PER_EXAHASH: f64 = 1e18;

// Retarget dates below this are taken to be in seconds rather than milliseconds
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Current hashrate and its change over the sampled window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HashrateReading {
    /// EH/s, rounded to an integer
    pub current_hashrate_ehs: f64,
    /// First-to-last change of the sampled series, percent
    pub change_percent: f64,
}

fn exahashes(value: &Value) -> Option<f64> {
    as_non_negative(value).map(|hashes| (hashes / HASHES_PER_EXAHASH).round())
}

fn series_change(raw: &Value) -> Option<f64> {
    let series = raw.get("hashrates")?.as_array()?;
    let sample = |point: &Value| point.get("avgHashrate").and_then(as_non_negative);
    let first = sample(series.first()?)?;
    let last = sample(series.last()?)?;
    if series.len() < 2 || first <= 0.0 {
        return None;
    }
    round2((last - first) / first * 100.0)
}

impl Normalize for HashrateReading {
    const PART: &'static str = "hashrate";

    fn normalize(raw: &Value, defaults: &Self) -> Result<Normalized<Self>, SchemaMismatch> {
        let mut reader = FieldReader::object(raw, "$")?;
        let current_hashrate_ehs = reader.take(
            "currentHashrateEHs",
            &["currentHashrate"],
            defaults.current_hashrate_ehs,
            exahashes,
        );
        let change_percent = match series_change(raw) {
            Some(change) => {
                reader.record_read();
                change
            }
            None => {
                reader.record_default("changePercent");
                defaults.change_percent
            }
        };
        reader.finish(
            Self::PART,
            Self {
                current_hashrate_ehs,
                change_percent,
            },
        )
    }
}

/// Progress through the current difficulty epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyProgress {
    /// Current difficulty
    pub difficulty: f64,
    /// Estimated retarget time
    pub next_retarget_eta: DateTime<Utc>,
    /// Blocks left in the epoch
    pub remaining_blocks: u32,
    /// Epoch progress, clamped to 0-100
    pub progress_percent: f64,
}

fn retarget_eta(value: &Value) -> Option<DateTime<Utc>> {
    let raw = as_i64(value)?;
    let millis = if raw.abs() < MILLIS_THRESHOLD {
        raw.checked_mul(1000)?
    } else {
        raw
    };
    DateTime::from_timestamp_millis(millis)
}

fn percent(value: &Value) -> Option<f64> {
    as_f64(value).map(|p| p.clamp(0.0, 100.0))
}

impl Normalize for DifficultyProgress {
    const PART: &'static str = "difficulty";

    fn normalize(raw: &Value, defaults: &Self) -> Result<Normalized<Self>, SchemaMismatch> {
        let mut reader = FieldReader::object(raw, "$")?;
        let progress = Self {
            difficulty: reader.take(
                "difficulty",
                &["difficulty", "currentDifficulty"],
                defaults.difficulty,
                as_non_negative,
            ),
            next_retarget_eta: reader.take(
                "nextRetargetEta",
                &["estimatedRetargetDate"],
                defaults.next_retarget_eta,
                retarget_eta,
            ),
            remaining_blocks: reader.take(
                "remainingBlocks",
                &["remainingBlocks"],
                defaults.remaining_blocks,
                as_u32,
            ),
            progress_percent: reader.take(
                "progressPercent",
                &["progressPercent"],
                defaults.progress_percent,
                percent,
            ),
        };
        reader.finish(Self::PART, progress)
    }
}

/// Top pools by share of recently mined blocks
#[derive(Debug, Clone, PartialEq)]
pub struct MiningDistribution(pub Vec<PoolShare>);

impl Normalize for MiningDistribution {
    const PART: &'static str = "miningDistribution";

    fn normalize(raw: &Value, _defaults: &Self) -> Result<Normalized<Self>, SchemaMismatch> {
        let pools = raw
            .get("pools")
            .map_or_else(|| expect_array(raw, "$"), |pools| expect_array(pools, "$.pools"))?;
        if pools.is_empty() {
            return Err(SchemaMismatch::Unreadable { part: Self::PART });
        }

        let block_count = |pool: &Value| pool.get("blockCount").and_then(as_non_negative);
        let total = raw
            .get("blockCount")
            .and_then(as_non_negative)
            .filter(|total| *total > 0.0)
            .unwrap_or_else(|| pools.iter().filter_map(block_count).sum());

        let mut defaulted = Vec::new();
        let mut shares = Vec::with_capacity(pools.len());
        for (index, pool) in pools.iter().enumerate() {
            let mut reader = FieldReader::object(pool, &format!("$.pools[{index}]"))?;
            let pool_name = reader.take(
                "miningDistribution.poolName",
                &["name", "poolName"],
                "Unknown".to_string(),
                as_text,
            );
            let share_percent = match reader.lookup(&["share"]).and_then(as_non_negative) {
                Some(fraction) => round2(fraction * 100.0),
                None => block_count(pool)
                    .filter(|_| total > 0.0)
                    .and_then(|blocks| round2(blocks / total * 100.0)),
            };
            let share_percent = if let Some(share) = share_percent {
                reader.record_read();
                share
            } else {
                reader.record_default("miningDistribution.sharePercent");
                0.0
            };
            defaulted.extend(reader.into_defaulted());
            shares.push(PoolShare {
                pool_name,
                share_percent,
            });
        }

        shares.sort_by(|a, b| b.share_percent.total_cmp(&a.share_percent));
        shares.truncate(MAX_MINING_POOLS);
        defaulted.sort_unstable();
        defaulted.dedup();
        Ok(Normalized {
            value: Self(shares),
            defaulted,
        })
    }
}
