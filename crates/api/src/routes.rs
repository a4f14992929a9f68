// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Routes module
//!
//! This module provides route configuration and handlers for the market data server.

pub mod handlers;

use axum::{
    Router,
    routing::{get, post},
};
use handlers::{
    collections_handler, hashrate_handler, health_handler, mempool_handler, portfolio_handler,
    price_handler, refresh_handler, runes_handler,
};

use crate::{
    metrics::metrics_handler,
    openapi::{openapi_spec, swagger_ui},
    state::ServerState,
};

/// Create application routes
pub fn create_routes() -> Router<ServerState> {
    let ops_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler));

    let docs_routes = Router::new()
        .route("/api-doc/openapi.json", get(openapi_spec))
        .route("/swagger-ui", get(swagger_ui));

    let api_routes = Router::new()
        .route("/mempool", get(mempool_handler))
        .route("/hashrate", get(hashrate_handler))
        .route("/collections", get(collections_handler))
        .route("/runes", get(runes_handler))
        .route("/price", get(price_handler))
        .route("/portfolio", get(portfolio_handler))
        .route("/refresh/{domain}", post(refresh_handler));

    let v1 = Router::new().nest("/v1", api_routes);

    Router::new()
        .merge(ops_routes)
        .merge(docs_routes)
        .merge(v1)
}
