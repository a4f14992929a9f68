// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP plumbing shared by the live provider clients

use std::time::{Duration, Instant};

use api_client::{HealthStatus, ProviderError, RawResponse};
use reqwest::{Client, Response};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::Url;

use crate::NonEmptyString;

const USER_AGENT: &str = concat!("ordinals-market-api/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY_CHARS: usize = 256;

/// Connection settings of one upstream source
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Base URL the endpoint paths are appended to
    pub base_url: Url,
    /// API key sent with every request, if the source requires one
    pub api_key: Option<NonEmptyString>,
    /// Header carrying the API key
    pub api_key_header: String,
    /// Per-call timeout
    pub timeout: Duration,
    /// Path probed by health checks
    pub health_path: String,
}

impl SourceConfig {
    /// Build a keyless source configuration
    pub fn new(base_url: Url, health_path: impl Into<String>) -> Self {
        Self {
            base_url,
            api_key: None,
            api_key_header: "x-api-key".to_string(),
            timeout: Duration::from_secs(8),
            health_path: health_path.into(),
        }
    }

    /// Attach an API key sent under `header`
    #[must_use]
    pub fn with_api_key(mut self, header: impl Into<String>, api_key: NonEmptyString) -> Self {
        self.api_key_header = header.into();
        self.api_key = Some(api_key);
        self
    }

    /// Override the per-call timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// One configured upstream source with its own connection pool
#[derive(Debug)]
pub(crate) struct HttpSource {
    name: &'static str,
    client: Client,
    config: SourceConfig,
}

impl HttpSource {
    pub(crate) fn new(name: &'static str, config: SourceConfig) -> Result<Self, ProviderError> {
        if config.timeout.is_zero() {
            return Err(ProviderError::Configuration {
                message: format!("{name}: timeout must be greater than 0"),
            });
        }
        if config.base_url.cannot_be_a_base() {
            return Err(ProviderError::Configuration {
                message: format!("{name}: '{}' cannot be used as a base URL", config.base_url),
            });
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Configuration {
                message: format!("{name}: failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            name,
            client,
            config,
        })
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!(
            "{}{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            path
        )
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    async fn send(&self, url: &str) -> Result<Response, ProviderError> {
        let mut request = self
            .client
            .get(url)
            .header("accept", "application/json");
        if let Some(api_key) = &self.config.api_key {
            request = request.header(self.config.api_key_header.as_str(), api_key.as_str());
        }

        timeout(self.config.timeout, request.send())
            .await
            .map_err(|_| ProviderError::Timeout {
                timeout_ms: self.timeout_ms(),
            })?
            .map_err(|e| self.map_transport_error(&e))
    }

    fn map_transport_error(&self, error: &reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::Timeout {
                timeout_ms: self.timeout_ms(),
            }
        } else {
            ProviderError::Network {
                message: error.to_string(),
            }
        }
    }

    /// GET `path` and decode the body as JSON
    pub(crate) async fn get_json(&self, path: &str) -> Result<RawResponse, ProviderError> {
        let url = self.url(path);
        debug!(source = self.name, url, "fetching upstream endpoint");

        let started = Instant::now();
        let response = self.send(&url).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            warn!(
                source = self.name,
                status = status.as_u16(),
                "upstream returned an error status"
            );
            return Err(ProviderError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(&e))?;
        let body = serde_json::from_slice(&bytes).map_err(|e| ProviderError::Decode {
            message: e.to_string(),
        })?;

        Ok(RawResponse {
            body,
            status: status.as_u16(),
            latency: started.elapsed(),
            received_at: chrono::Utc::now(),
        })
    }

    /// Probe the health path
    pub(crate) async fn probe(&self) -> Result<HealthStatus, ProviderError> {
        let url = self.url(&self.config.health_path);
        debug!(source = self.name, url, "performing health check");

        let started = Instant::now();
        let response = self.send(&url).await?;
        let status = HealthStatus::from_probe_status(response.status().as_u16());

        match &status {
            HealthStatus::Up => info!(
                source = self.name,
                elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "health check passed"
            ),
            other => warn!(
                source = self.name,
                reason = other.description(),
                "health check failed"
            ),
        }
        Ok(status)
    }
}
