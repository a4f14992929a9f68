// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server implementation module
//!
//! This module provides the main server struct and implementation for the
//! market data server, including provider selection, server lifecycle
//! management, router configuration, and coordinated graceful shutdown using
//! `CancellationToken`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    http::{HeaderName, StatusCode},
};
use external_apis::{
    DEFAULT_PRICE_KEY_HEADER, IndexerClient, IndexerConfig, MempoolClient, PriceClient,
    ProviderRegistry, SourceConfig,
};
use hyper::Request;
use market_data::{FallbackCatalog, MarketDataService};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span, warn};

use crate::{
    config::{ProviderMode, ServerConfig, SourceSettings},
    error::{ServerError, ServerResult},
    routes::create_routes,
    state::ServerState,
};

// Server constants
const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
const MEMPOOL_KEY_HEADER: &str = "x-api-key";
const DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_FORCE_SHUTDOWN_TIMEOUT_SECONDS: u64 = 5;

/// Configuration for server shutdown behavior
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Maximum time to wait for in-flight requests after cancellation
    pub graceful_timeout: Duration,
    /// Maximum time to wait for the refresh timers to stop
    pub force_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            graceful_timeout: Duration::from_secs(DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS),
            force_timeout: Duration::from_secs(DEFAULT_FORCE_SHUTDOWN_TIMEOUT_SECONDS),
        }
    }
}

/// Main server struct
#[derive(Debug)]
pub struct Server {
    /// Server configuration
    config: ServerConfig,
    /// Application router
    router: Router,
    /// Server state
    state: ServerState,
    /// Cancellation token for coordinated shutdown
    cancellation_token: CancellationToken,
    /// Configuration for coordinated shutdown
    graceful_shutdown_config: ShutdownConfig,
}

impl Server {
    /// Create new server instance
    ///
    /// Builds the providers selected by the configuration and loads the
    /// fallback catalog, applying the YAML override when one is configured.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if a provider client cannot be built and
    /// `ServerError::Catalog` if the catalog override is unreadable or invalid.
    pub async fn new(config: ServerConfig, shutdown_config: ShutdownConfig) -> ServerResult<Self> {
        let providers = Self::create_provider_registry(&config)?;
        let catalog = FallbackCatalog::load(config.market_data.catalog_path.as_deref()).await?;
        Self::with_provider_registry(
            config,
            shutdown_config,
            Arc::new(providers),
            Arc::new(catalog),
        )
    }

    /// Create the provider registry selected by the configuration
    fn create_provider_registry(config: &ServerConfig) -> ServerResult<ProviderRegistry> {
        match config.providers.mode {
            ProviderMode::Static => {
                warn!("serving static demo data; no upstream provider will be called");
                Ok(ProviderRegistry::demo())
            }
            ProviderMode::Live => {
                let providers = &config.providers;
                let to_config_error = |e: api_client::ProviderError| ServerError::Config {
                    message: e.to_string(),
                };

                let mempool = MempoolClient::new(Self::source_config(
                    &providers.mempool,
                    "/v1/fees/recommended",
                    MEMPOOL_KEY_HEADER,
                ))
                .map_err(to_config_error)?;

                let api_key = providers.indexer.api_key.clone().ok_or_else(|| {
                    ServerError::Config {
                        message: "providers.indexer.api_key is required in live mode".to_string(),
                    }
                })?;
                let mut indexer_config =
                    IndexerConfig::new(providers.indexer.base_url.clone(), api_key);
                indexer_config.source.timeout = providers.indexer.timeout_seconds.value();
                let indexer = IndexerClient::new(indexer_config).map_err(to_config_error)?;

                let price = PriceClient::new(Self::source_config(
                    &providers.price,
                    "/ping",
                    DEFAULT_PRICE_KEY_HEADER,
                ))
                .map_err(to_config_error)?;

                info!(
                    mempool = %providers.mempool.base_url,
                    indexer = %providers.indexer.base_url,
                    price = %providers.price.base_url,
                    "live providers configured"
                );
                Ok(ProviderRegistry::live(mempool, indexer, price))
            }
        }
    }

    fn source_config(
        settings: &SourceSettings,
        health_path: &str,
        key_header: &str,
    ) -> SourceConfig {
        let source = SourceConfig::new(settings.base_url.clone(), health_path)
            .with_timeout(settings.timeout_seconds.value());
        match &settings.api_key {
            Some(key) => source.with_api_key(key_header, key.clone()),
            None => source,
        }
    }

    /// Create server with a custom provider registry and catalog for dependency injection
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the configuration is invalid.
    pub fn with_provider_registry(
        config: ServerConfig,
        graceful_shutdown_config: ShutdownConfig,
        providers: Arc<ProviderRegistry>,
        catalog: Arc<FallbackCatalog>,
    ) -> ServerResult<Self> {
        config.validate().map_err(|e| ServerError::Config {
            message: e.to_string(),
        })?;

        let cancellation_token = CancellationToken::new();
        let market_data = Arc::new(MarketDataService::new(
            Arc::clone(&providers),
            catalog,
            &config.market_data.service_config(),
            cancellation_token.child_token(),
        ));
        let state = ServerState::new(
            config.clone(),
            providers,
            market_data,
            cancellation_token.child_token(),
        );
        let router = Self::create_router(state.clone());

        Ok(Self {
            config,
            router,
            state,
            cancellation_token,
            graceful_shutdown_config,
        })
    }

    /// Create application router with middleware
    fn create_router(state: ServerState) -> Router {
        let timeout_duration = state.config().timeout_seconds.value();

        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
                    if let Some(request_id) = req.headers().get(REQUEST_ID_HEADER) {
                        info_span!("http_request", ?request_id, method = %req.method(), uri = %req.uri())
                    } else {
                        error!("failed to extract id from request");
                        info_span!("http_request", request_id = "unknown")
                    }
                }),
            )
            .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
            .layer(CorsLayer::permissive())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                timeout_duration,
            ));

        create_routes().layer(middleware).with_state(state)
    }

    /// Run the server with coordinated graceful shutdown
    ///
    /// Starts the refresh timers, serves until a shutdown signal or
    /// programmatic cancellation, then stops the timers.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if unable to bind to the configured address,
    /// or `ServerError::Startup` if the server fails to start.
    pub async fn run(self) -> ServerResult<()> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                address: addr,
                source,
            })?;

        let actual_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Startup { source })?;

        info!(
            address = %actual_addr,
            environment = %self.config.environment,
            "market data server starting",
        );

        self.state.market_data().start();

        let cancellation_token = self.cancellation_token.clone();
        let shutdown_token = cancellation_token.clone();
        tokio::spawn(async move {
            info!("spawning the graceful shutdown task");
            Self::shutdown_signal_handler(shutdown_token).await;
        });

        let graceful_timeout = self.graceful_shutdown_config.graceful_timeout;
        let serve = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                cancellation_token.cancelled().await;
                info!("market data server stopped accepting connections");
            })
            .into_future();
        let serve_token = self.cancellation_token.clone();
        let server_result = tokio::select! {
            result = serve => result,
            () = async {
                serve_token.cancelled().await;
                tokio::time::sleep(graceful_timeout).await;
            } => {
                warn!(timeout_secs = graceful_timeout.as_secs(), "graceful shutdown timed out");
                Ok(())
            }
        };

        Self::stop_market_data(&self.state, self.graceful_shutdown_config.force_timeout).await;

        if let Err(e) = server_result {
            error!(error = ?e, "Server error during shutdown");
            Err(ServerError::Shutdown { source: e })
        } else {
            info!("market data server shut down gracefully");
            Ok(())
        }
    }

    async fn stop_market_data(state: &ServerState, timeout: Duration) {
        if tokio::time::timeout(timeout, state.market_data().shutdown())
            .await
            .is_err()
        {
            warn!(
                timeout_secs = timeout.as_secs(),
                "refresh timers did not stop in time"
            );
        }
    }

    /// Handle shutdown signals and trigger coordinated cancellation
    ///
    /// This function listens for SIGINT (Ctrl+C) and SIGTERM signals,
    /// and cancels the provided cancellation token when received.
    async fn shutdown_signal_handler(cancellation_token: CancellationToken) {
        let signal_received = async {
            #[cfg(unix)]
            #[allow(clippy::expect_used)]
            {
                use tokio::signal::unix::{SignalKind, signal};

                let mut sigterm =
                    signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
                let mut sigint =
                    signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

                tokio::select! {
                    _ = sigterm.recv() => {
                        warn!("Received SIGTERM signal, initiating coordinated shutdown");
                        "SIGTERM"
                    },
                    _ = sigint.recv() => {
                        warn!("Received SIGINT signal, initiating coordinated shutdown");
                        "SIGINT"
                    },
                }
            }

            #[cfg(not(unix))]
            #[allow(clippy::expect_used)]
            {
                tokio::signal::ctrl_c()
                    .await
                    .expect("Failed to install CTRL+C signal handler");
                warn!("Received CTRL+C signal, initiating coordinated shutdown");
                "CTRL+C"
            }
        };

        tokio::select! {
            signal_name = signal_received => {
                warn!("Shutdown signal {} received, cancelling all operations...", signal_name);
                cancellation_token.cancel();
            },
            () = cancellation_token.cancelled() => {
                warn!("Cancellation token already cancelled, shutdown signal handler exiting");
            }
        }
    }

    /// Returns a clone of the cancellation token for coordinated shutdown
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Initiates graceful shutdown by cancelling the server's cancellation token
    pub fn shutdown(&self) {
        info!("programmatic shutdown requested");
        self.cancellation_token.cancel();
    }

    /// Run server for testing, returns the bound address
    ///
    /// The refresh timers are not started; snapshots are assembled on first
    /// read, which keeps provider call counts predictable in tests.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if unable to bind to the configured address.
    pub async fn run_for_testing(self) -> ServerResult<(SocketAddr, CancellationToken)> {
        let addr = self.config.socket_addr();

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                address: addr,
                source,
            })?;

        let actual_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Startup { source })?;

        let token = self.cancellation_token.child_token();
        let task = token.child_token();
        let state = self.state.clone();
        let force_timeout = self.graceful_shutdown_config.force_timeout;
        tokio::spawn(async move {
            let _ = axum::serve(listener, self.router)
                .with_graceful_shutdown(async move { task.cancelled().await })
                .await;
            Self::stop_market_data(&state, force_timeout).await;
        });

        Ok((actual_addr, token))
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get server state for testing
    pub fn state(&self) -> &ServerState {
        &self.state
    }
}
