// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Mempool explorer integration
//!
//! Serves fee estimates, mempool usage, projected and recent blocks, and the
//! mining endpoints (hashrate, difficulty epoch, pool shares). The public
//! explorer API needs no credentials; a key header is sent only when one is
//! configured, for self-hosted or paid instances.

use api_client::{Endpoint, HealthStatus, ProviderClient, ProviderError, ProviderSource, RawResponse};
use tracing::{debug, error};
use url::Url;

use crate::{
    NonEmptyString,
    http::{HttpSource, SourceConfig},
};

/// Public mempool explorer REST API
pub const DEFAULT_MEMPOOL_BASE_URL: &str = "https://mempool.space/api";

/// Mempool explorer API client
#[derive(Debug)]
pub struct MempoolClient {
    source: HttpSource,
}

impl MempoolClient {
    /// Create a client against the public explorer
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created
    pub fn public() -> Result<Self, ProviderError> {
        let base_url = Url::parse(DEFAULT_MEMPOOL_BASE_URL).map_err(|e| {
            ProviderError::Configuration {
                message: e.to_string(),
            }
        })?;
        Self::new(SourceConfig::new(base_url, "/v1/fees/recommended"))
    }

    /// Create a new mempool explorer client
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client cannot be created
    pub fn new(config: SourceConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            source: HttpSource::new("mempool", config)?,
        })
    }

    /// Create a client for a self-hosted instance that requires a key
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client cannot be created
    pub fn with_api_key(
        base_url: Url,
        header: &str,
        api_key: NonEmptyString,
    ) -> Result<Self, ProviderError> {
        Self::new(SourceConfig::new(base_url, "/v1/fees/recommended").with_api_key(header, api_key))
    }
}

impl ProviderClient for MempoolClient {
    async fn fetch(&self, endpoint: &Endpoint) -> Result<RawResponse, ProviderError> {
        if endpoint.source() != ProviderSource::Mempool {
            return Err(ProviderError::Configuration {
                message: format!("mempool client cannot serve {endpoint}"),
            });
        }

        debug!(endpoint = %endpoint, "fetching from mempool explorer");
        self.source
            .get_json(&endpoint.path())
            .await
            .inspect_err(|e| error!(endpoint = %endpoint, error = %e, "mempool explorer request failed"))
    }

    async fn health_check(&self) -> Result<HealthStatus, ProviderError> {
        self.source.probe().await
    }

    fn name(&self) -> &'static str {
        "mempool"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_client_builds() {
        let client = MempoolClient::public().unwrap();
        assert_eq!(client.name(), "mempool");
    }

    #[tokio::test]
    async fn rejects_endpoints_of_other_sources() {
        let client = MempoolClient::public().unwrap();
        let result = client.fetch(&Endpoint::Runes).await;
        assert!(matches!(result, Err(ProviderError::Configuration { .. })));
    }
}
