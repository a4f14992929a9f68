// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Provider registry selecting live or static providers once at construction
//!
//! The registry is the single [`ProviderClient`] the aggregation layer talks
//! to. In live mode it routes each endpoint to the client owning its source;
//! in static mode every endpoint is served by one [`StaticProvider`]. The mode
//! is fixed when the registry is built and never re-checked per call.

use std::{sync::Arc, time::Instant};

use api_client::{
    Endpoint, HealthStatus, ProviderClient, ProviderError, ProviderHealth, ProviderSource,
    RawResponse, StaticProvider,
};
use tracing::{debug, warn};

use crate::{IndexerClient, MempoolClient, PriceClient};

/// The three live upstream clients
#[derive(Debug)]
pub struct LiveProviders {
    /// Mempool explorer
    pub mempool: MempoolClient,
    /// Inscription/rune indexer
    pub indexer: IndexerClient,
    /// Spot price aggregator
    pub price: PriceClient,
}

/// Provider selection for the process lifetime
#[derive(Debug, Clone)]
pub enum ProviderRegistry {
    /// Real upstream services
    Live(Arc<LiveProviders>),
    /// Scripted responses for development and tests
    Static(Arc<StaticProvider>),
}

impl ProviderRegistry {
    /// Build a live registry
    pub fn live(mempool: MempoolClient, indexer: IndexerClient, price: PriceClient) -> Self {
        Self::Live(Arc::new(LiveProviders {
            mempool,
            indexer,
            price,
        }))
    }

    /// Build a static registry serving canned demo data
    pub fn demo() -> Self {
        Self::Static(Arc::new(StaticProvider::demo()))
    }

    /// Build a static registry around a scripted provider
    pub fn scripted(provider: Arc<StaticProvider>) -> Self {
        Self::Static(provider)
    }

    /// Whether this registry serves scripted data
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static(_))
    }

    /// Get the names of all registered clients
    pub fn client_names(&self) -> Vec<&'static str> {
        match self {
            Self::Live(live) => vec![live.mempool.name(), live.indexer.name(), live.price.name()],
            Self::Static(provider) => vec![provider.name()],
        }
    }

    /// Get the health of every registered client
    ///
    /// Health checks are performed concurrently.
    pub async fn overall_health(&self) -> Vec<ProviderHealth> {
        match self {
            Self::Live(live) => {
                let (mempool, indexer, price) = tokio::join!(
                    probe(&live.mempool),
                    probe(&live.indexer),
                    probe(&live.price)
                );
                vec![mempool, indexer, price]
            }
            Self::Static(provider) => vec![probe(provider.as_ref()).await],
        }
    }
}

async fn probe<P: ProviderClient>(client: &P) -> ProviderHealth {
    let started = Instant::now();
    let status = client
        .health_check()
        .await
        .unwrap_or_else(|e| HealthStatus::Down {
            reason: format!("Health check failed: {e}"),
        });
    if !matches!(status, HealthStatus::Up) {
        warn!(provider = client.name(), reason = status.description(), "provider unhealthy");
    }
    ProviderHealth::new(client.name(), status, started.elapsed())
}

/// Combine per-provider health into one status
pub fn combine_health(results: &[ProviderHealth]) -> HealthStatus {
    let down: Vec<&str> = results
        .iter()
        .filter(|health| health.status.is_down())
        .map(|health| health.provider.as_str())
        .collect();

    if results.is_empty() || down.len() == results.len() {
        HealthStatus::Down {
            reason: "all providers are down".to_string(),
        }
    } else if !down.is_empty() {
        HealthStatus::Degraded {
            reason: format!("providers down: {}", down.join(", ")),
        }
    } else if results.iter().all(|health| health.status == HealthStatus::Up) {
        HealthStatus::Up
    } else {
        HealthStatus::Degraded {
            reason: "some providers are degraded".to_string(),
        }
    }
}

impl ProviderClient for ProviderRegistry {
    async fn fetch(&self, endpoint: &Endpoint) -> Result<RawResponse, ProviderError> {
        match self {
            Self::Live(live) => {
                debug!(endpoint = %endpoint, "routing to live provider");
                match endpoint.source() {
                    ProviderSource::Mempool => live.mempool.fetch(endpoint).await,
                    ProviderSource::Indexer => live.indexer.fetch(endpoint).await,
                    ProviderSource::Price => live.price.fetch(endpoint).await,
                }
            }
            Self::Static(provider) => provider.fetch(endpoint).await,
        }
    }

    async fn health_check(&self) -> Result<HealthStatus, ProviderError> {
        Ok(combine_health(&self.overall_health().await))
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Live(_) => "live",
            Self::Static(_) => "static",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use api_client::StaticResponse;

    use super::*;

    fn health(provider: &str, status: HealthStatus) -> ProviderHealth {
        ProviderHealth::new(provider, status, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn static_registry_routes_everything_to_one_provider() {
        let provider = Arc::new(StaticProvider::new().with_response(
            &Endpoint::BtcPrice,
            StaticResponse::json(serde_json::json!({"bitcoin": {"usd": 10.0}})),
        ));
        let registry = ProviderRegistry::scripted(provider.clone());

        assert!(registry.is_static());
        assert_eq!(registry.client_names(), vec!["static"]);
        assert!(registry.fetch(&Endpoint::BtcPrice).await.is_ok());
        assert!(registry.fetch(&Endpoint::Runes).await.is_err());
        assert_eq!(provider.total_calls(), 2);
    }

    #[tokio::test]
    async fn static_registry_is_healthy() {
        let registry = ProviderRegistry::demo();
        let results = registry.overall_health().await;
        assert_eq!(results.len(), 1);
        assert_eq!(registry.health_check().await.unwrap(), HealthStatus::Up);
    }

    #[test]
    fn combined_health() {
        let down = || HealthStatus::Down {
            reason: "refused".to_string(),
        };

        assert_eq!(
            combine_health(&[health("a", HealthStatus::Up), health("b", HealthStatus::Up)]),
            HealthStatus::Up
        );
        assert_eq!(
            combine_health(&[health("a", HealthStatus::Up), health("b", down())]),
            HealthStatus::Degraded {
                reason: "providers down: b".to_string()
            }
        );
        assert!(combine_health(&[health("a", down()), health("b", down())]).is_down());
        assert!(combine_health(&[]).is_down());
    }
}
