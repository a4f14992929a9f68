// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Ordinals Market Data Server Implementation
//!
//! This crate provides the HTTP server in front of the `market_data` service,
//! built with Axum and designed for production use with layered configuration,
//! middleware, and graceful shutdown.
//!
//! # Module Structure
//!
//! - [`config`]: Server configuration and environment management with hierarchical loading
//! - [`error`]: Error types and HTTP response handling with proper status codes
//! - [`state`]: Shared application state and the aggregated health report
//! - [`server`]: Main server implementation, lifecycle, and coordinated shutdown
//! - [`routes`]: Route configuration and HTTP request handlers
//! - [`metrics`]: Prometheus counters and the `/metrics` exporter
//! - [`openapi`]: `OpenAPI` specification and Swagger UI endpoints for API documentation
//!
//! # Key Features
//!
//! - **Always Answers**: Data endpoints return a complete snapshot labeled with
//!   its `dataQuality`, filled from fallback data when providers fail
//! - **Background Refresh**: Each data domain refreshes on its own timer and on demand
//! - **Graceful Shutdown**: Coordinated termination using `CancellationToken` with timeouts
//! - **Health Monitoring**: Provider health plus the refresh status of every domain
//! - **Static Mode**: Canned demo providers for development without network access

pub mod config;
pub mod error;
pub mod metrics;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{Environment, ProviderMode, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use server::{Server, ShutdownConfig};
pub use shared_types::{DataDomain, DataQuality};
pub use state::{HealthCheck, MarketData, ServerState};
