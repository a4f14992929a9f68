// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Domain-erased canonical records

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared_types::{
    CollectionsSnapshot, DataDomain, DataQuality, HashrateSnapshot, MempoolSnapshot, PriceTicker,
    RunesSnapshot, Snapshot,
};

/// Snapshot of any data domain
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CanonicalRecord {
    /// Mempool dashboard
    Mempool(Arc<MempoolSnapshot>),
    /// Hashrate and difficulty
    Hashrate(Arc<HashrateSnapshot>),
    /// Collection listing
    Collections(Arc<CollectionsSnapshot>),
    /// Rune listing
    Runes(Arc<RunesSnapshot>),
    /// Spot price
    Price(Arc<PriceTicker>),
}

impl CanonicalRecord {
    /// Domain of the wrapped snapshot
    pub fn domain(&self) -> DataDomain {
        match self {
            Self::Mempool(_) => DataDomain::Mempool,
            Self::Hashrate(_) => DataDomain::Hashrate,
            Self::Collections(_) => DataDomain::Collections,
            Self::Runes(_) => DataDomain::Runes,
            Self::Price(_) => DataDomain::Price,
        }
    }

    /// Assembly time of the wrapped snapshot
    pub fn observed_at(&self) -> DateTime<Utc> {
        match self {
            Self::Mempool(s) => s.observed_at(),
            Self::Hashrate(s) => s.observed_at(),
            Self::Collections(s) => s.observed_at(),
            Self::Runes(s) => s.observed_at(),
            Self::Price(s) => s.observed_at(),
        }
    }

    /// Provenance of the wrapped snapshot
    pub fn data_quality(&self) -> DataQuality {
        match self {
            Self::Mempool(s) => s.data_quality(),
            Self::Hashrate(s) => s.data_quality(),
            Self::Collections(s) => s.data_quality(),
            Self::Runes(s) => s.data_quality(),
            Self::Price(s) => s.data_quality(),
        }
    }
}
