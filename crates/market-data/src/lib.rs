// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Resilient Ordinals and Runes market data
//!
//! This crate turns the responses of several unreliable upstream providers
//! into canonical, always-available snapshots. Every read answers with a
//! complete record: live where the providers cooperated, degraded where some
//! parts had to be substituted, and fallback when nothing live was usable.
//!
//! # Key Features
//!
//! - **Concurrent fan-out**: every call of a snapshot runs concurrently under
//!   one shared deadline, with bounded retries of transient failures
//! - **Per-part fallback**: a failing call only costs the fields it
//!   contributes, which are taken from a versioned fallback catalog
//! - **Total normalization**: malformed or drifted upstream JSON becomes a
//!   schema mismatch, never a panic
//! - **Refresh scheduling**: per-domain timers, de-duplicated concurrent
//!   refreshes, and manual refreshes that supersede scheduled runs
//! - **Observability**: structured logging of every substitution and
//!   Prometheus metrics for assemblies, provider calls and refreshes
//!
//! # Architecture
//!
//! - [`normalize`]: raw response to record part conversion
//! - [`fallback`]: the curated catalog and its YAML override
//! - [`aggregator`]: fan-out, deadline, retries and quality labeling
//! - [`cache`]: atomically replaced per-domain snapshot slots
//! - [`scheduler`]: refresh lifecycle of one domain
//! - [`service`]: the facade combining the above
//! - [`error`]: error types
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use api_client::StaticProvider;
//! use market_data::{FallbackCatalog, MarketDataConfig, MarketDataService};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let service = MarketDataService::new(
//!     Arc::new(StaticProvider::demo()),
//!     Arc::new(FallbackCatalog::builtin()),
//!     &MarketDataConfig::default(),
//!     CancellationToken::new(),
//! );
//! service.start();
//!
//! let runes = service.runes().await;
//! println!("{} runes, quality {}", runes.runes.len(), runes.data_quality);
//!
//! service.shutdown().await;
//! # }
//! ```

pub mod aggregator;
pub mod cache;
pub mod error;
pub mod fallback;
pub mod metrics;
pub mod normalize;
pub mod record;
pub mod scheduler;
pub mod service;

// Re-export main types for convenience
pub use aggregator::{Aggregator, AggregatorConfig, PartOutcome, PartReport, SubstitutionReason};
pub use cache::{SnapshotCache, SnapshotSlot};
pub use error::{CatalogError, CatalogResult, RefreshError, SchemaMismatch};
pub use fallback::{CatalogEntry, FallbackCatalog};
pub use normalize::{Normalize, Normalized};
pub use record::CanonicalRecord;
pub use scheduler::{RefreshPhase, RefreshStatus, RefreshTrigger, Refresher};
pub use service::{MarketDataConfig, MarketDataService, RefreshIntervals};
