// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Prometheus metrics for aggregation and refresh
//!
//! Metrics are registered in the default registry, so the API's `/metrics`
//! handler exports them alongside its own.

use std::sync::LazyLock;

use prometheus::{
    HistogramVec, IntCounterVec, register_histogram_vec, register_int_counter_vec,
};

/// Assembled snapshots, labeled by domain and data quality
pub static SNAPSHOT_ASSEMBLIES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "market_data_snapshot_assemblies_total",
        "Total number of assembled snapshots, labeled by domain and data quality",
        &["domain", "quality"]
    )
    .expect("Failed to create snapshot assemblies counter vec")
});

/// Parts substituted or defaulted, labeled by domain, part and reason
pub static PART_SUBSTITUTIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "market_data_part_substitutions_total",
        "Total number of snapshot parts not taken fully from a live response",
        &["domain", "part", "reason"]
    )
    .expect("Failed to create part substitutions counter vec")
});

/// Provider call durations in seconds, retries included
pub static PROVIDER_CALL_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "market_data_provider_call_duration",
        "Provider call durations in seconds, retries included",
        &["endpoint", "result"],
        vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to create provider call duration histogram")
});

/// Snapshot cache hit/miss counters
pub static CACHE_OPERATIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "market_data_cache_operations_total",
        "Total number of snapshot cache operations",
        &["operation", "domain"]
    )
    .expect("Failed to create cache operations counter vec")
});

/// Refresh runs, labeled by domain, trigger and outcome
pub static REFRESH_RUNS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "market_data_refresh_runs_total",
        "Total number of refresh runs, labeled by domain, trigger and outcome",
        &["domain", "trigger", "outcome"]
    )
    .expect("Failed to create refresh runs counter vec")
});

/// Count an assembled snapshot
pub fn record_assembly(domain: &str, quality: &str) {
    SNAPSHOT_ASSEMBLIES
        .with_label_values(&[domain, quality])
        .inc();
}

/// Count a part that was not fully live
///
/// # Arguments
/// * `reason` - `defaulted`, `schema_mismatch`, or the provider error kind
pub fn record_substitution(domain: &str, part: &str, reason: &str) {
    PART_SUBSTITUTIONS
        .with_label_values(&[domain, part, reason])
        .inc();
}

/// Observe the duration of a provider call
pub fn observe_provider_call(endpoint: &str, result: &str, duration_secs: f64) {
    PROVIDER_CALL_DURATION
        .with_label_values(&[endpoint, result])
        .observe(duration_secs);
}

/// Record cache operation metrics
///
/// # Arguments
/// * `operation` - The cache operation (hit, stale, miss, store, invalidate)
/// * `domain` - The data domain
pub fn record_cache_operation(operation: &str, domain: &str) {
    CACHE_OPERATIONS
        .with_label_values(&[operation, domain])
        .inc();
}

/// Count a finished refresh run
pub fn record_refresh(domain: &str, trigger: &str, outcome: &str) {
    REFRESH_RUNS
        .with_label_values(&[domain, trigger, outcome])
        .inc();
}
