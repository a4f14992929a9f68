// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Normalization of raw provider responses into record parts
//!
//! A *part* is the unit of fallback substitution: the fields one provider
//! call contributes to a snapshot. Each part type implements [`Normalize`],
//! which is total over arbitrary JSON: it either yields a value (possibly
//! with some fields defaulted from the catalog) or a [`SchemaMismatch`].
//! Normalizers never mutate their input.

pub mod coerce;
pub mod hashrate;
pub mod listings;
pub mod mempool;
pub mod portfolio;
pub mod price;

use serde_json::Value;

pub use hashrate::{DifficultyProgress, HashrateReading, MAX_MINING_POOLS, MiningDistribution};
pub use listings::{CollectionListing, RuneListing, rank_by_volume};
pub use mempool::{AverageFeeRate, MempoolUsage, RecentActivity};
pub use portfolio::{InscriptionHoldings, RuneHoldings};
pub use price::BtcQuote;

use crate::error::SchemaMismatch;

/// A normalized part and the fields that had to be defaulted
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    /// Normalized value
    pub value: T,
    /// Record fields that were missing or uncoercible upstream
    pub defaulted: Vec<&'static str>,
}

impl<T> Normalized<T> {
    /// A part with every field read from the response
    pub fn complete(value: T) -> Self {
        Self {
            value,
            defaulted: Vec::new(),
        }
    }

    /// Whether no field was defaulted
    pub fn is_complete(&self) -> bool {
        self.defaulted.is_empty()
    }
}

/// A part that can be read from a raw provider response
pub trait Normalize: Sized {
    /// Part name used in logs and metrics
    const PART: &'static str;

    /// Normalize `raw`, taking missing fields from `defaults`
    ///
    /// # Errors
    ///
    /// Returns [`SchemaMismatch`] when the response has the wrong shape or
    /// nothing at all could be read from it
    fn normalize(raw: &Value, defaults: &Self) -> Result<Normalized<Self>, SchemaMismatch>;
}
