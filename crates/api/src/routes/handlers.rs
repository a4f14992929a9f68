// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP request handlers module
//!
//! Data handlers never fail: the market data service always yields a record,
//! falling back to catalog data when providers misbehave. Only malformed
//! client input produces an error response.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use market_data::CanonicalRecord;
use serde::Deserialize;
use shared_types::{
    CollectionsSnapshot, DataDomain, HashrateSnapshot, MempoolSnapshot, PriceTicker,
    RunesSnapshot, WalletAddress, WalletPortfolio,
};
use tracing::info;
use utoipa::IntoParams;

use crate::{
    error::ServerError,
    metrics,
    state::{HealthCheck, ServerState},
};

/// Health check endpoint handler
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    summary = "Health check endpoint",
    description = "Returns the service version and environment, the health of every upstream provider, and the refresh status of every data domain.",
    responses(
        (status = 200, description = "Health report", body = HealthCheck)
    )
)]
pub async fn health_handler(State(state): State<ServerState>) -> Json<HealthCheck> {
    Json(state.health_check().await)
}

/// Mempool snapshot
#[utoipa::path(
    get,
    path = "/v1/mempool",
    tag = "market-data",
    summary = "Mempool snapshot",
    description = "Pending transaction count, fee tiers, recent transactions and the latest block. Parts that could not be fetched are filled from fallback data and reported through `dataQuality`.",
    responses(
        (status = 200, description = "Current mempool snapshot", body = MempoolSnapshot)
    )
)]
pub async fn mempool_handler(State(state): State<ServerState>) -> Json<Arc<MempoolSnapshot>> {
    metrics::inc_requests("mempool");
    Json(state.market_data().mempool().await)
}

/// Hashrate snapshot
#[utoipa::path(
    get,
    path = "/v1/hashrate",
    tag = "market-data",
    summary = "Hashrate and difficulty snapshot",
    responses(
        (status = 200, description = "Current hashrate snapshot", body = HashrateSnapshot)
    )
)]
pub async fn hashrate_handler(State(state): State<ServerState>) -> Json<Arc<HashrateSnapshot>> {
    metrics::inc_requests("hashrate");
    Json(state.market_data().hashrate().await)
}

/// Ranked inscription collections
#[utoipa::path(
    get,
    path = "/v1/collections",
    tag = "market-data",
    summary = "Collections ranked by 24h volume",
    responses(
        (status = 200, description = "Current collection listing", body = CollectionsSnapshot)
    )
)]
pub async fn collections_handler(
    State(state): State<ServerState>,
) -> Json<Arc<CollectionsSnapshot>> {
    metrics::inc_requests("collections");
    Json(state.market_data().collections().await)
}

/// Ranked runes
#[utoipa::path(
    get,
    path = "/v1/runes",
    tag = "market-data",
    summary = "Runes ranked by 24h volume",
    responses(
        (status = 200, description = "Current rune listing", body = RunesSnapshot)
    )
)]
pub async fn runes_handler(State(state): State<ServerState>) -> Json<Arc<RunesSnapshot>> {
    metrics::inc_requests("runes");
    Json(state.market_data().runes().await)
}

/// BTC spot price
#[utoipa::path(
    get,
    path = "/v1/price",
    tag = "market-data",
    summary = "BTC/USD spot price",
    responses(
        (status = 200, description = "Current price ticker", body = PriceTicker)
    )
)]
pub async fn price_handler(State(state): State<ServerState>) -> Json<Arc<PriceTicker>> {
    metrics::inc_requests("price");
    Json(state.market_data().price().await)
}

/// Manual refresh of one data domain
///
/// # Errors
///
/// Returns `ServerError::ValidationError` for an unknown domain.
#[utoipa::path(
    post,
    path = "/v1/refresh/{domain}",
    tag = "market-data",
    summary = "Refresh a data domain now",
    description = "Re-assembles the snapshot of one domain, superseding any scheduled refresh in flight, and returns the new snapshot. Its shape is the one of the domain's GET endpoint.",
    params(
        ("domain" = DataDomain, Path, description = "Data domain to refresh")
    ),
    responses(
        (status = 200, description = "Refreshed snapshot", content_type = "application/json"),
        (status = 400, description = "Unknown domain", body = String)
    )
)]
pub async fn refresh_handler(
    State(state): State<ServerState>,
    Path(domain): Path<String>,
) -> Result<Json<CanonicalRecord>, ServerError> {
    let domain: DataDomain = domain
        .parse()
        .map_err(|e| ServerError::ValidationError(format!("{e}")))?;

    info!(domain = domain.name(), "manual refresh requested");
    metrics::inc_refresh_requests(domain.name());
    Ok(Json(state.market_data().refresh(domain).await))
}

/// Query of the portfolio endpoint
#[derive(Debug, Deserialize, IntoParams)]
pub struct PortfolioQuery {
    /// Bitcoin address to look up
    pub address: Option<String>,
}

/// Wallet portfolio
///
/// # Errors
///
/// Returns `ServerError::MissingParameter` when `address` is absent or blank
/// and `ServerError::ValidationError` when it is not a Bitcoin address. No
/// provider is called in either case.
#[utoipa::path(
    get,
    path = "/v1/portfolio",
    tag = "portfolio",
    summary = "Inscriptions and rune balances of an address",
    params(PortfolioQuery),
    responses(
        (status = 200, description = "Wallet portfolio", body = WalletPortfolio),
        (status = 400, description = "Missing or malformed address", body = String)
    )
)]
pub async fn portfolio_handler(
    State(state): State<ServerState>,
    Query(query): Query<PortfolioQuery>,
) -> Result<Json<WalletPortfolio>, ServerError> {
    let raw = query
        .address
        .filter(|address| !address.trim().is_empty())
        .ok_or(ServerError::MissingParameter { name: "address" })?;
    let address =
        WalletAddress::parse(&raw).map_err(|e| ServerError::ValidationError(e.to_string()))?;

    metrics::inc_requests("portfolio");
    Ok(Json(state.market_data().wallet_portfolio(&address).await))
}
