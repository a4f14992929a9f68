// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Prometheus metrics module
//!
//! Provides global metrics using the default Prometheus registry via macros and
//! an Axum-compatible metrics handler. The handler also exports the
//! aggregation metrics registered by the `market_data` crate.

use std::sync::LazyLock;

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use prometheus::{Encoder, IntCounterVec, TextEncoder, register_int_counter_vec};
use tracing::error;

/// Total number of data requests, labeled by endpoint
pub static REQUESTS_BY_ENDPOINT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "market_api_requests_total",
        "Total number of data requests, labeled by endpoint",
        &["endpoint"]
    )
    .expect("Failed to create market_api_requests_total counter vec")
});

/// Total number of manual refresh requests, labeled by domain
pub static REFRESH_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "market_api_refresh_requests_total",
        "Total number of manual refresh requests, labeled by domain",
        &["domain"]
    )
    .expect("Failed to create market_api_refresh_requests_total counter vec")
});

/// Increment the requests counter
///
/// # Arguments
/// * `endpoint` - The data endpoint that was called
pub fn inc_requests(endpoint: &str) {
    REQUESTS_BY_ENDPOINT.with_label_values(&[endpoint]).inc();
}

/// Increment the manual refresh counter
pub fn inc_refresh_requests(domain: &str) {
    REFRESH_REQUESTS.with_label_values(&[domain]).inc();
}

/// Axum handler that exports metrics in Prometheus text format
pub async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    match String::from_utf8(buffer) {
        Ok(body) => ([(header::CONTENT_TYPE, encoder.format_type())], body).into_response(),
        Err(e) => {
            error!(error = %e, "metrics buffer is not valid UTF-8");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
