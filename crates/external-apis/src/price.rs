// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Spot price aggregator integration

use api_client::{Endpoint, HealthStatus, ProviderClient, ProviderError, ProviderSource, RawResponse};
use tracing::{debug, error};

use crate::http::{HttpSource, SourceConfig};

/// Public price aggregator REST API
pub const DEFAULT_PRICE_BASE_URL: &str = "https://api.coingecko.com/api/v3";
/// Header carrying the price aggregator API key
pub const DEFAULT_PRICE_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Price aggregator API client
#[derive(Debug)]
pub struct PriceClient {
    source: HttpSource,
}

impl PriceClient {
    /// Create a new price aggregator client
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client cannot be created
    pub fn new(config: SourceConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            source: HttpSource::new("price", config)?,
        })
    }
}

impl ProviderClient for PriceClient {
    async fn fetch(&self, endpoint: &Endpoint) -> Result<RawResponse, ProviderError> {
        if endpoint.source() != ProviderSource::Price {
            return Err(ProviderError::Configuration {
                message: format!("price client cannot serve {endpoint}"),
            });
        }

        debug!(endpoint = %endpoint, "fetching from price aggregator");
        self.source
            .get_json(&endpoint.path())
            .await
            .inspect_err(|e| error!(endpoint = %endpoint, error = %e, "price aggregator request failed"))
    }

    async fn health_check(&self) -> Result<HealthStatus, ProviderError> {
        self.source.probe().await
    }

    fn name(&self) -> &'static str {
        "price"
    }
}
