// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Inscription and rune indexer integration
//!
//! The indexer serves collection and rune market listings plus per-address
//! holdings. Every request carries the API key header. Listing endpoints are
//! requested sorted by 24h volume with an explicit page size, but callers must
//! still not trust the upstream order.

use api_client::{Endpoint, HealthStatus, ProviderClient, ProviderError, ProviderSource, RawResponse};
use tracing::{debug, error};
use url::Url;

use crate::{
    NonEmptyString,
    http::{HttpSource, SourceConfig},
};

/// Default header carrying the indexer API key
pub const DEFAULT_INDEXER_KEY_HEADER: &str = "x-api-key";
/// Default number of listing items requested per call
pub const DEFAULT_INDEXER_PAGE_SIZE: u32 = 50;
/// Inscription ids requested per address
pub const ADDRESS_INSCRIPTIONS_PAGE_SIZE: u32 = 20;

/// Configuration for the indexer client
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Connection settings; `api_key` must be set
    pub source: SourceConfig,
    /// Listing items requested per call
    pub page_size: u32,
}

impl IndexerConfig {
    /// Create an indexer configuration with the default header and page size
    pub fn new(base_url: Url, api_key: NonEmptyString) -> Self {
        Self {
            source: SourceConfig::new(base_url, "/v1/status")
                .with_api_key(DEFAULT_INDEXER_KEY_HEADER, api_key),
            page_size: DEFAULT_INDEXER_PAGE_SIZE,
        }
    }
}

/// Inscription/rune indexer API client
#[derive(Debug)]
pub struct IndexerClient {
    source: HttpSource,
    page_size: u32,
}

impl IndexerClient {
    /// Create a new indexer client
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is configured, the page size is zero, or
    /// the HTTP client cannot be created
    pub fn new(config: IndexerConfig) -> Result<Self, ProviderError> {
        if config.source.api_key.is_none() {
            return Err(ProviderError::Configuration {
                message: "indexer requires an API key".to_string(),
            });
        }
        if config.page_size == 0 {
            return Err(ProviderError::Configuration {
                message: "indexer page size must be greater than 0".to_string(),
            });
        }

        Ok(Self {
            source: HttpSource::new("indexer", config.source)?,
            page_size: config.page_size,
        })
    }

    /// Path plus the query parameters this indexer expects for the endpoint
    fn request_path(&self, endpoint: &Endpoint) -> String {
        let path = endpoint.path();
        match endpoint {
            Endpoint::Collections | Endpoint::Runes => {
                format!("{path}?sort=volume_24h&order=desc&limit={}", self.page_size)
            }
            Endpoint::AddressInscriptions(_) => {
                format!("{path}?limit={ADDRESS_INSCRIPTIONS_PAGE_SIZE}")
            }
            _ => path,
        }
    }
}

impl ProviderClient for IndexerClient {
    async fn fetch(&self, endpoint: &Endpoint) -> Result<RawResponse, ProviderError> {
        if endpoint.source() != ProviderSource::Indexer {
            return Err(ProviderError::Configuration {
                message: format!("indexer client cannot serve {endpoint}"),
            });
        }

        let path = self.request_path(endpoint);
        debug!(endpoint = %endpoint, path, "fetching from indexer");
        self.source
            .get_json(&path)
            .await
            .inspect_err(|e| error!(endpoint = %endpoint, error = %e, "indexer request failed"))
    }

    async fn health_check(&self) -> Result<HealthStatus, ProviderError> {
        self.source.probe().await
    }

    fn name(&self) -> &'static str {
        "indexer"
    }
}

#[cfg(test)]
mod tests {
    use shared_types::WalletAddress;

    use super::*;

    fn config() -> IndexerConfig {
        IndexerConfig::new(
            Url::parse("https://indexer.example.com").unwrap(),
            NonEmptyString::new("test-key").unwrap(),
        )
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let mut config = config();
        config.source.api_key = None;
        assert!(matches!(
            IndexerClient::new(config),
            Err(ProviderError::Configuration { .. })
        ));
    }

    #[test]
    fn listing_requests_are_sorted_and_paged() {
        let mut config = config();
        config.page_size = 25;
        let client = IndexerClient::new(config).unwrap();
        assert_eq!(
            client.request_path(&Endpoint::Runes),
            "/v1/runes?sort=volume_24h&order=desc&limit=25"
        );

        let address = WalletAddress::parse("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq").unwrap();
        assert_eq!(
            client.request_path(&Endpoint::AddressInscriptions(address.clone())),
            "/v1/addresses/bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq/inscriptions?limit=20"
        );
        assert_eq!(
            client.request_path(&Endpoint::AddressRunes(address)),
            "/v1/addresses/bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq/runes"
        );
    }
}
