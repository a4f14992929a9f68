// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Provider client contract for upstream market data sources
//!
//! This crate provides the common abstraction every upstream data provider
//! implements, so the aggregation layer never knows whether it talks to a live
//! HTTP service or to scripted test data.
//!
//! # Core Abstractions
//!
//! - **`ProviderClient` Trait**: one `fetch(endpoint)` operation returning raw JSON or a typed failure
//! - **Endpoints**: [`Endpoint`] names every upstream call and the source serving it
//! - **Error Handling**: [`ProviderError`] separates timeouts, HTTP statuses, network and decode failures
//! - **Static Provider**: [`StaticProvider`] serves scripted or canned responses for dev mode and tests
//!
//! Provider clients never retry and never panic on non-2xx responses; retry and
//! fallback decisions belong to the caller.

use thiserror::Error;

pub mod health;
pub mod static_provider;
pub mod types;

pub use health::*;
pub use static_provider::{StaticProvider, StaticResponse};
pub use types::*;

/// Generic trait for upstream market data providers
///
/// Implementations own their base URLs, auth headers and per-call timeouts.
pub trait ProviderClient: Send + Sync {
    /// Fetch the raw JSON body of one upstream endpoint
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the call times out, the network fails,
    /// the upstream answers with a non-2xx status, or the body is not JSON
    fn fetch(
        &self,
        endpoint: &Endpoint,
    ) -> impl Future<Output = Result<RawResponse, ProviderError>> + Send;

    /// Check the health of the upstream sources behind this client
    ///
    /// # Errors
    ///
    /// Returns an error if the health probe could not be performed
    fn health_check(&self) -> impl Future<Output = Result<HealthStatus, ProviderError>> + Send;

    /// Get the name/identifier of this client
    fn name(&self) -> &'static str;
}

/// Failures of a single provider call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum ProviderError {
    /// The call did not complete within its timeout
    #[error("request timeout after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// The upstream answered with a non-2xx status
    #[error("upstream returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Connection, DNS or TLS failure
    #[error("network error: {message}")]
    Network { message: String },

    /// The body was not valid JSON
    #[error("invalid response body: {message}")]
    Decode { message: String },

    /// The client is misconfigured for this endpoint
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl ProviderError {
    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::Http { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            Self::Decode { .. } | Self::Configuration { .. } => false,
        }
    }

    /// Whether the failure means the upstream contract changed shape
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Short label used in logs and metrics
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Http { .. } => "http",
            Self::Network { .. } => "network",
            Self::Decode { .. } => "decode",
            Self::Configuration { .. } => "configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ProviderError::Timeout { timeout_ms: 10 }.is_transient());
        assert!(
            ProviderError::Network {
                message: "reset".to_string()
            }
            .is_transient()
        );
        for status in [408, 429, 500, 502, 503] {
            assert!(
                ProviderError::Http {
                    status,
                    message: String::new()
                }
                .is_transient(),
                "{status}"
            );
        }
        for status in [400, 401, 403, 404] {
            assert!(
                !ProviderError::Http {
                    status,
                    message: String::new()
                }
                .is_transient(),
                "{status}"
            );
        }
        assert!(
            !ProviderError::Decode {
                message: "eof".to_string()
            }
            .is_transient()
        );
    }

    #[test]
    fn error_display() {
        let error = ProviderError::Http {
            status: 503,
            message: "maintenance".to_string(),
        };
        assert_eq!(error.to_string(), "upstream returned HTTP 503: maintenance");
        assert_eq!(error.kind(), "http");

        let error = ProviderError::Timeout { timeout_ms: 8000 };
        assert_eq!(error.to_string(), "request timeout after 8000 ms");
    }
}
