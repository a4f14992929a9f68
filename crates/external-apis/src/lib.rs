// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Live integrations for the upstream market data providers
//!
//! This crate provides implementations of the `ProviderClient` trait for the
//! mempool explorer, the inscription/rune indexer and the spot price
//! aggregator, plus the registry that selects live or static providers.
//!
//! # Architecture
//!
//! - **Client Implementations**: [`mempool`], [`indexer`], [`price`] - one client per upstream source
//! - **Shared Plumbing**: [`http::SourceConfig`] - base URL, auth header and timeout per source
//! - **Registry Pattern**: [`registry::ProviderRegistry`] - routes endpoints, runs concurrent health checks
//! - **Validation Utilities**: [`non_empty_string::NonEmptyString`] - API keys that cannot be blank
//!
//! Clients never retry; non-2xx answers, timeouts and malformed bodies come
//! back as typed `ProviderError` values.

pub mod http;
pub mod indexer;
pub mod mempool;
pub mod non_empty_string;
pub mod price;
pub mod registry;

pub use http::SourceConfig;
pub use indexer::*;
pub use mempool::*;
pub use non_empty_string::NonEmptyString;
pub use price::*;
pub use registry::*;
