// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared types for the market data service
//!
//! This crate provides the canonical records and identifiers that are shared
//! across the provider, aggregation and API crates, avoiding circular
//! dependencies.

pub mod address;
pub mod domain;
pub mod quality;
pub mod records;

pub use address::{AddressError, WalletAddress};
pub use domain::{DataDomain, UnknownDomain};
pub use quality::DataQuality;
pub use records::{
    BlockSummary, CollectionSummary, CollectionsSnapshot, FeeTiers, HashrateSnapshot,
    MAX_PORTFOLIO_INSCRIPTIONS, MAX_RECENT_TRANSACTIONS, MempoolSnapshot, PoolShare, PriceTicker,
    Ranked, RecentTransaction, RecordInvariantError, RuneBalance, RuneSummary, RunesSnapshot,
    Snapshot, WalletPortfolio,
};
