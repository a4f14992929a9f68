// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server state management module
//!
//! This module provides shared application state for the market data server,
//! including configuration, the market data service, and coordinated
//! cancellation.

use std::{collections::HashMap, sync::Arc};

use external_apis::{ProviderRegistry, combine_health};
use market_data::{MarketDataService, RefreshStatus};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use crate::config::{Environment, ServerConfig};

/// Market data service over the configured providers
pub type MarketData = MarketDataService<ProviderRegistry>;

/// Shared application state with cancellation token support
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Server configuration
    config: ServerConfig,
    /// Providers, used for health probes
    providers: Arc<ProviderRegistry>,
    /// Aggregated market data
    market_data: Arc<MarketData>,
    /// Cancellation token for coordinated shutdown
    pub cancellation_token: CancellationToken,
}

impl ServerState {
    /// Create new server state
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `providers` - Provider registry shared with the market data service
    /// * `market_data` - Market data service
    /// * `cancellation_token` - Token for coordinated cancellation
    pub fn new(
        config: ServerConfig,
        providers: Arc<ProviderRegistry>,
        market_data: Arc<MarketData>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            providers,
            market_data,
            cancellation_token,
        }
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Market data service
    pub fn market_data(&self) -> &Arc<MarketData> {
        &self.market_data
    }

    /// Probe every provider and collect refresh statuses
    pub async fn health_check(&self) -> HealthCheck {
        let probes = self.providers.overall_health().await;
        let status = Self::convert_health_status(combine_health(&probes));

        let api_clients = probes
            .into_iter()
            .map(|probe| (probe.provider, Self::convert_health_status(probe.status)))
            .collect();

        HealthCheck {
            status,
            version: Box::from(env!("CARGO_PKG_VERSION")),
            environment: self.config.environment,
            timestamp: chrono::Utc::now().to_rfc3339(),
            static_providers: self.providers.is_static(),
            api_clients,
            domains: self.market_data.statuses(),
        }
    }

    /// Convert external API health status to internal health status
    fn convert_health_status(external_status: api_client::HealthStatus) -> HealthStatus {
        match external_status {
            api_client::HealthStatus::Up => HealthStatus::Up,
            api_client::HealthStatus::Degraded { reason } => HealthStatus::Degraded {
                reason: reason.into_boxed_str(),
            },
            api_client::HealthStatus::Down { reason } => HealthStatus::Down {
                reason: reason.into_boxed_str(),
            },
        }
    }
}

/// Health status of a service or dependency
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum HealthStatus {
    /// Service is fully operational and responding normally
    Up,

    /// Service is not operational or has critical failures
    Down {
        /// Human-readable explanation of why the service is down
        reason: Box<str>,
    },

    /// Service is operational but experiencing performance issues or partial failures
    Degraded {
        /// Human-readable explanation of the degradation condition
        reason: Box<str>,
    },
}

/// Health check status
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheck {
    /// Combined provider status; data endpoints keep answering even when down
    pub status: HealthStatus,
    /// Service version
    pub version: Box<str>,
    /// Environment
    pub environment: Environment,
    /// Timestamp
    pub timestamp: String,
    /// Whether canned demo data is served
    pub static_providers: bool,
    /// Status of individual API clients
    #[schema(value_type = Object)]
    pub api_clients: HashMap<String, HealthStatus>,
    /// Refresh status per data domain
    pub domains: Vec<RefreshStatus>,
}

#[cfg(test)]
mod tests {
    use market_data::{FallbackCatalog, MarketDataConfig};

    use super::*;

    fn state(token: CancellationToken) -> ServerState {
        let providers = Arc::new(ProviderRegistry::demo());
        let market_data = Arc::new(MarketDataService::new(
            Arc::clone(&providers),
            Arc::new(FallbackCatalog::builtin()),
            &MarketDataConfig::default(),
            token.child_token(),
        ));
        ServerState::new(ServerConfig::for_testing(), providers, market_data, token)
    }

    #[tokio::test]
    async fn server_state_with_cancellation_token() {
        let token = CancellationToken::new();
        let state = state(token.clone());

        assert!(!state.cancellation_token.is_cancelled());

        token.cancel();
        assert!(state.cancellation_token.is_cancelled());
    }

    #[tokio::test]
    async fn health_check_reports_static_providers() {
        let state = state(CancellationToken::new());

        let health = state.health_check().await;

        assert_eq!(health.status, HealthStatus::Up);
        assert!(health.static_providers);
        assert_eq!(health.api_clients.get("static"), Some(&HealthStatus::Up));
        assert_eq!(health.domains.len(), 5);
        assert_eq!(health.environment, Environment::Testing);
    }
}
