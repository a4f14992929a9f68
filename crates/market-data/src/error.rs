// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for market data aggregation
//!
//! Provider failures and schema mismatches never escape the aggregator; they
//! are absorbed by fallback substitution. The errors here describe why a part
//! was substituted, why a catalog override was rejected, and why a refresh
//! run produced no value.

use shared_types::{DataDomain, RecordInvariantError};
use thiserror::Error;

/// Result type alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// A provider response that does not have the expected structure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaMismatch {
    /// The response (or a nested value) has the wrong JSON type
    #[error("expected {expected} at {path}")]
    WrongShape {
        /// Location inside the response
        path: String,
        /// Expected JSON type
        expected: &'static str,
    },

    /// Not a single field of the part could be read
    #[error("no readable fields for part {part}")]
    Unreadable {
        /// Part being normalized
        part: &'static str,
    },

    /// An item of a ranked list has no name
    #[error("item {index} of {part} has no name")]
    UnnamedItem {
        /// Part being normalized
        part: &'static str,
        /// Position of the item
        index: usize,
    },

    /// The body could not be decoded as JSON at all
    #[error("undecodable body: {message}")]
    Undecodable {
        /// Decoder message
        message: String,
    },
}

/// Errors raised while loading or validating the fallback catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Override file could not be read
    #[error("Failed to read catalog file {path}: {message}")]
    Io {
        /// File path
        path: String,
        /// IO error message
        message: String,
    },

    /// Override file is not valid YAML for the catalog schema
    #[error("Failed to parse catalog: {message}")]
    Parse {
        /// Parser error message
        message: String,
    },

    /// Catalog schema version is not supported
    #[error("Unsupported catalog version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version found in the file
        found: String,
        /// Supported version requirement
        supported: String,
    },

    /// A catalog entry violates a record invariant
    #[error("Invalid {domain} entry: {source}")]
    InvalidEntry {
        /// Offending domain
        domain: DataDomain,
        /// Violated invariant
        #[source]
        source: RecordInvariantError,
    },

    /// Catalog entries must carry the `fallback` quality label
    #[error("{domain} entry must be labelled fallback")]
    WrongQuality {
        /// Offending domain
        domain: DataDomain,
    },
}

/// Reasons a refresh run did not produce a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// The assembly task panicked
    #[error("refresh of {domain} failed: {message}")]
    Failed {
        /// Domain being refreshed
        domain: DataDomain,
        /// Panic message
        message: String,
    },

    /// The scheduler is shutting down
    #[error("refresh of {domain} abandoned during shutdown")]
    ShuttingDown {
        /// Domain being refreshed
        domain: DataDomain,
    },
}
