// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! `OpenAPI` documentation module
//!
//! This module provides `OpenAPI` specification and `Swagger UI` endpoints for API documentation.

use axum::{Json, response::Html};
use market_data::{RefreshPhase, RefreshStatus};
use shared_types::{
    BlockSummary, CollectionSummary, CollectionsSnapshot, DataDomain, DataQuality, FeeTiers,
    HashrateSnapshot, MempoolSnapshot, PoolShare, PriceTicker, RecentTransaction, RuneBalance,
    RuneSummary, RunesSnapshot, WalletPortfolio,
};
use utoipa::OpenApi;

use crate::{
    config::Environment,
    routes::handlers,
    state::{HealthCheck, HealthStatus},
};

/// API documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ordinals Market Data API",
        description = "Aggregated Bitcoin mempool, mining, Ordinals and Runes market data. Every data endpoint answers with a complete record labeled live, degraded or fallback."
    ),
    paths(
        handlers::health_handler,
        handlers::mempool_handler,
        handlers::hashrate_handler,
        handlers::collections_handler,
        handlers::runes_handler,
        handlers::price_handler,
        handlers::refresh_handler,
        handlers::portfolio_handler,
    ),
    components(schemas(
        HealthCheck,
        HealthStatus,
        Environment,
        RefreshStatus,
        RefreshPhase,
        DataDomain,
        DataQuality,
        MempoolSnapshot,
        FeeTiers,
        RecentTransaction,
        BlockSummary,
        HashrateSnapshot,
        PoolShare,
        CollectionsSnapshot,
        CollectionSummary,
        RunesSnapshot,
        RuneSummary,
        PriceTicker,
        WalletPortfolio,
        RuneBalance,
    )),
    tags(
        (name = "health", description = "Service and provider health"),
        (name = "market-data", description = "Shared market snapshots"),
        (name = "portfolio", description = "Per-address holdings")
    )
)]
pub struct ApiDoc;

/// `OpenAPI` specification endpoint
pub async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Swagger UI endpoint
pub async fn swagger_ui() -> Html<&'static str> {
    Html(
        r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Ordinals Market Data API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css" />
    <style>
        html { box-sizing: border-box; overflow: -moz-scrollbars-vertical; overflow-y: scroll; }
        *, *:before, *:after { box-sizing: inherit; }
        body { margin:0; background: #fafafa; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = function() {
            SwaggerUIBundle({
                url: '/api-doc/openapi.json',
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                plugins: [
                    SwaggerUIBundle.plugins.DownloadUrl
                ],
                layout: "StandaloneLayout"
            });
        }
    </script>
</body>
</html>
"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for path in [
            "/health",
            "/v1/mempool",
            "/v1/hashrate",
            "/v1/collections",
            "/v1/runes",
            "/v1/price",
            "/v1/refresh/{domain}",
            "/v1/portfolio",
        ] {
            assert!(paths.contains(&path), "missing {path}");
        }
    }
}
