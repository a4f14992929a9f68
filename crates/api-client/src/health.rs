// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Health check types for provider clients

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health status of a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum HealthStatus {
    /// Provider is healthy and operational
    Up,
    /// Provider answers but is rate limiting or erroring
    Degraded { reason: String },
    /// Provider is unreachable
    Down { reason: String },
}

impl HealthStatus {
    /// Check if this health status indicates the provider is available
    pub fn is_available(&self) -> bool {
        matches!(self, HealthStatus::Up | HealthStatus::Degraded { .. })
    }

    /// Check if this health status indicates the provider is completely down
    pub fn is_down(&self) -> bool {
        matches!(self, HealthStatus::Down { .. })
    }

    /// Get a human-readable description of the status
    pub fn description(&self) -> &str {
        match self {
            HealthStatus::Up => "Provider is healthy",
            HealthStatus::Degraded { reason } | HealthStatus::Down { reason } => reason,
        }
    }

    /// Map an HTTP status from a health probe to a health status
    pub fn from_probe_status(status: u16) -> Self {
        match status {
            200..=299 => Self::Up,
            401 | 403 => Self::Down {
                reason: "Authentication failed".to_string(),
            },
            429 => Self::Degraded {
                reason: "Rate limited".to_string(),
            },
            other => Self::Degraded {
                reason: format!("Provider returned status {other}"),
            },
        }
    }
}

/// Health probe outcome for one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    /// Provider name
    pub provider: String,
    /// Probe result
    #[serde(flatten)]
    pub status: HealthStatus,
    /// Probe round-trip time in milliseconds
    pub response_time_ms: u64,
    /// When the probe finished
    pub checked_at: DateTime<Utc>,
}

impl ProviderHealth {
    /// Record a probe result
    pub fn new(provider: impl Into<String>, status: HealthStatus, response_time: Duration) -> Self {
        Self {
            provider: provider.into(),
            status,
            response_time_ms: u64::try_from(response_time.as_millis()).unwrap_or(u64::MAX),
            checked_at: Utc::now(),
        }
    }
}
