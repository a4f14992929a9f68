// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server configuration module
//!
//! This module provides configuration structures and logic for the market data
//! server, supporting different environments and validation of configuration
//! parameters.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Result, anyhow, ensure};
use config::{Config, ConfigError, Environment as ConfigEnv, File};
use external_apis::{DEFAULT_MEMPOOL_BASE_URL, DEFAULT_PRICE_BASE_URL, NonEmptyString};
use market_data::{AggregatorConfig, MarketDataConfig, RefreshIntervals};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_with::{DurationMilliSeconds, DurationSeconds, serde_as};
use shared_types::DataDomain;
use url::Url;
use utoipa::ToSchema;

use crate::error::{ServerError, ServerResult};

/// Default indexer REST API
pub const DEFAULT_INDEXER_BASE_URL: &str = "https://api.ordiscan.com";

/// A validated server port that ensures the value is appropriate for the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerPort {
    port: u16,
    environment: Environment,
}

impl ServerPort {
    /// Create a new `ServerPort`, ensuring it's valid for the given environment
    ///
    /// # Errors
    ///
    /// Returns an error if the port is 0 in non-testing environments
    pub fn new(port: u16, environment: Environment) -> Result<Self> {
        if port == 0 && environment != Environment::Testing {
            return Err(anyhow!("port cannot be 0 in non-testing environments"));
        }
        Ok(Self { port, environment })
    }

    /// Create a safe default port for development
    pub const fn default_development() -> Self {
        Self {
            port: 3000,
            environment: Environment::Development,
        }
    }

    /// Create a safe testing port (port 0)
    pub const fn testing() -> Self {
        Self {
            port: 0,
            environment: Environment::Testing,
        }
    }

    /// Get the port value
    pub fn value(&self) -> u16 {
        self.port
    }
}

impl<'de> Deserialize<'de> for ServerPort {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let port = u16::deserialize(deserializer)?;
        // re-validated once the environment is known
        Ok(Self {
            port,
            environment: Environment::Development,
        })
    }
}

/// A validated timeout duration in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeoutSeconds(Duration);

impl TimeoutSeconds {
    /// Create a new `TimeoutSeconds`, ensuring the value is within valid bounds
    ///
    /// # Errors
    ///
    /// Returns an error if timeout is 0 or greater than 300 seconds
    pub fn new(seconds: u64) -> Result<Self> {
        ensure!(seconds != 0, "timeout must be greater than 0");
        ensure!(seconds <= 300, "timeout cannot exceed 300");
        Ok(Self(Duration::from_secs(seconds)))
    }

    /// Create a safe default timeout (30 seconds)
    pub const fn default_value() -> Self {
        Self(Duration::from_secs(30))
    }

    /// Create a safe testing timeout (5 seconds)
    pub const fn testing() -> Self {
        Self(Duration::from_secs(5))
    }

    /// Get the timeout value
    pub fn value(&self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for TimeoutSeconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = u64::deserialize(deserializer)?;
        Self::new(seconds).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl Default for TimeoutSeconds {
    fn default() -> Self {
        Self::default_value()
    }
}

/// Environment types for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Production environment
    Production,
    /// Development environment
    Development,
    /// Testing environment
    Testing,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
            Environment::Testing => write!(f, "testing"),
        }
    }
}

/// Which providers serve upstream calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// Real upstream services
    Live,
    /// Canned demo data, no network access
    Static,
}

/// Connection settings of one upstream source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Base URL
    pub base_url: Url,
    /// API key, if the source requires one
    #[serde(default)]
    pub api_key: Option<NonEmptyString>,
    /// Per-call timeout in seconds (validated range: 1-300)
    #[serde(default = "TimeoutSeconds::provider_default")]
    pub timeout_seconds: TimeoutSeconds,
}

impl TimeoutSeconds {
    const fn provider_default() -> Self {
        Self(Duration::from_secs(8))
    }
}

impl SourceSettings {
    fn with_base(base_url: &str) -> Self {
        Self {
            // the defaults are compile-time constants
            base_url: Url::parse(base_url).unwrap_or_else(|_| unreachable!()),
            api_key: None,
            timeout_seconds: TimeoutSeconds::provider_default(),
        }
    }
}

/// Upstream provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Live or static providers
    pub mode: ProviderMode,
    /// Mempool explorer
    pub mempool: SourceSettings,
    /// Inscription/rune indexer; requires an API key in live mode
    pub indexer: SourceSettings,
    /// Spot price aggregator
    pub price: SourceSettings,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            mode: ProviderMode::Static,
            mempool: SourceSettings::with_base(DEFAULT_MEMPOOL_BASE_URL),
            indexer: SourceSettings::with_base(DEFAULT_INDEXER_BASE_URL),
            price: SourceSettings::with_base(DEFAULT_PRICE_BASE_URL),
        }
    }
}

/// Refresh intervals in seconds
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    /// Mempool interval
    #[serde_as(as = "DurationSeconds<u64>")]
    pub mempool: Duration,
    /// Hashrate interval
    #[serde_as(as = "DurationSeconds<u64>")]
    pub hashrate: Duration,
    /// Collections interval
    #[serde_as(as = "DurationSeconds<u64>")]
    pub collections: Duration,
    /// Runes interval
    #[serde_as(as = "DurationSeconds<u64>")]
    pub runes: Duration,
    /// Price interval
    #[serde_as(as = "DurationSeconds<u64>")]
    pub price: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        let defaults = RefreshIntervals::default();
        Self {
            mempool: defaults.mempool,
            hashrate: defaults.hashrate,
            collections: defaults.collections,
            runes: defaults.runes,
            price: defaults.price,
        }
    }
}

/// Aggregation, caching and fallback settings
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketDataSettings {
    /// YAML file overriding the built-in fallback catalog
    pub catalog_path: Option<PathBuf>,
    /// Time budget of one snapshot assembly
    #[serde_as(as = "DurationSeconds<u64>")]
    pub snapshot_deadline_seconds: Duration,
    /// Retries per call for transient provider errors
    pub max_retries: usize,
    /// Base delay of the retry backoff
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub retry_base_delay_ms: Duration,
    /// Maximum items in a ranked listing
    pub list_limit: usize,
    /// Refresh intervals after which a snapshot counts as stale
    pub stale_after_intervals: u32,
    /// Refresh intervals
    pub refresh: RefreshSettings,
}

impl Default for MarketDataSettings {
    fn default() -> Self {
        let aggregator = AggregatorConfig::default();
        let service = MarketDataConfig::default();
        Self {
            catalog_path: None,
            snapshot_deadline_seconds: aggregator.deadline,
            max_retries: aggregator.max_retries,
            retry_base_delay_ms: aggregator.retry_base_delay,
            list_limit: aggregator.list_limit,
            stale_after_intervals: service.stale_after_intervals,
            refresh: RefreshSettings::default(),
        }
    }
}

impl MarketDataSettings {
    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.snapshot_deadline_seconds.is_zero(),
            "snapshot deadline must be greater than 0"
        );
        ensure!(self.max_retries <= 5, "max_retries cannot exceed 5");
        ensure!(self.list_limit > 0, "list_limit must be greater than 0");
        ensure!(
            self.stale_after_intervals > 0,
            "stale_after_intervals must be greater than 0"
        );
        let intervals = self.intervals();
        for domain in DataDomain::all() {
            ensure!(
                intervals.get(*domain) >= Duration::from_secs(1),
                "refresh interval of {domain} must be at least 1 second"
            );
        }
        Ok(())
    }

    fn intervals(&self) -> RefreshIntervals {
        RefreshIntervals {
            mempool: self.refresh.mempool,
            hashrate: self.refresh.hashrate,
            collections: self.refresh.collections,
            runes: self.refresh.runes,
            price: self.refresh.price,
        }
    }

    /// Service configuration derived from these settings
    pub fn service_config(&self) -> MarketDataConfig {
        MarketDataConfig {
            aggregator: AggregatorConfig {
                deadline: self.snapshot_deadline_seconds,
                max_retries: self.max_retries,
                retry_base_delay: self.retry_base_delay_ms,
                list_limit: self.list_limit,
            },
            intervals: self.intervals(),
            stale_after_intervals: self.stale_after_intervals,
        }
    }
}

/// Server configuration for different environments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    pub host: IpAddr,
    /// Server port (validated for environment compatibility)
    pub port: ServerPort,
    /// Request timeout in seconds (validated range: 1-300)
    pub timeout_seconds: TimeoutSeconds,
    /// Environment type
    pub environment: Environment,
    /// Upstream providers
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Aggregation settings
    #[serde(default)]
    pub market_data: MarketDataSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: ServerPort::default_development(),
            timeout_seconds: TimeoutSeconds::default(),
            environment: Environment::Development,
            providers: ProvidersConfig::default(),
            market_data: MarketDataSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables and optional configuration files
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if configuration is invalid or cannot be loaded.
    pub fn from_env() -> ServerResult<Self> {
        Self::load().map_err(|e| ServerError::Config {
            message: format!("failed to load configuration: {e}"),
        })
    }

    /// Load configuration using the config crate with hierarchical sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. Configuration file (config.json)
    /// 3. Environment-specific files (config.{env}.json)
    /// 4. Environment variables with SERVER_ prefix, `__` separating nested keys
    ///    (`SERVER_PROVIDERS__MODE=live`, `SERVER_MARKET_DATA__REFRESH__MEMPOOL=15`)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let env_var = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let mut config_builder = Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 3000)?
            .set_default("timeout_seconds", 30)?
            .set_default("environment", "development")?
            .add_source(File::with_name("config.json").required(false))
            .add_source(
                File::with_name(&format!("config.{}.json", env_var.to_lowercase())).required(false),
            )
            .add_source(
                ConfigEnv::with_prefix("SERVER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if std::env::var("ENVIRONMENT").is_ok() {
            config_builder = config_builder.set_override("environment", env_var.to_lowercase())?;
        }

        let config = config_builder.build()?;
        let mut server_config: Self = config.try_deserialize()?;

        server_config.port = ServerPort::new(server_config.port.value(), server_config.environment)
            .map_err(|e| ConfigError::Message(format!("invalid port configuration: {e}")))?;
        server_config
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(server_config)
    }

    /// Cross-field validation
    ///
    /// # Errors
    ///
    /// Returns an error if live mode lacks the indexer key or a market data
    /// setting is out of range
    pub fn validate(&self) -> Result<()> {
        if self.providers.mode == ProviderMode::Live {
            ensure!(
                self.providers.indexer.api_key.is_some(),
                "providers.indexer.api_key is required in live mode"
            );
        }
        self.market_data.validate()
    }

    /// Create configuration optimized for testing
    ///
    /// Uses static providers, so tests never touch the network.
    pub fn for_testing() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: ServerPort::testing(),
            timeout_seconds: TimeoutSeconds::testing(),
            environment: Environment::Testing,
            providers: ProvidersConfig::default(),
            market_data: MarketDataSettings::default(),
        }
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_validation() {
        assert!(TimeoutSeconds::new(0).is_err());
        assert!(TimeoutSeconds::new(400).is_err());

        assert!(TimeoutSeconds::new(30).is_ok());
        assert!(TimeoutSeconds::new(1).is_ok());
        assert!(TimeoutSeconds::new(300).is_ok());
    }

    #[test]
    fn server_port_validation() {
        assert!(ServerPort::new(0, Environment::Testing).is_ok());
        assert!(ServerPort::new(0, Environment::Development).is_err());
        assert!(ServerPort::new(0, Environment::Production).is_err());

        assert!(ServerPort::new(3000, Environment::Development).is_ok());
        assert!(ServerPort::new(443, Environment::Production).is_ok());
    }

    #[test]
    fn environment_display() {
        assert_eq!(Environment::Production.to_string(), "production");
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Testing.to_string(), "testing");
    }

    #[test]
    fn testing_config_uses_static_providers() {
        let config = ServerConfig::for_testing();
        assert_eq!(config.providers.mode, ProviderMode::Static);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn live_mode_requires_indexer_key() {
        let mut config = ServerConfig::for_testing();
        config.providers.mode = ProviderMode::Live;
        assert!(config.validate().is_err());

        config.providers.indexer.api_key = Some(NonEmptyString::new("key").unwrap());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn market_data_settings_map_to_service_config() {
        let settings: MarketDataSettings = serde_json::from_value(serde_json::json!({
            "snapshot_deadline_seconds": 4,
            "retry_base_delay_ms": 50,
            "refresh": { "mempool": 15 }
        }))
        .unwrap();

        let service = settings.service_config();
        assert_eq!(service.aggregator.deadline, Duration::from_secs(4));
        assert_eq!(service.aggregator.retry_base_delay, Duration::from_millis(50));
        assert_eq!(service.intervals.mempool, Duration::from_secs(15));
        assert_eq!(
            service.intervals.runes,
            DataDomain::Runes.default_refresh_interval()
        );
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut settings = MarketDataSettings::default();
        settings.refresh.price = Duration::ZERO;
        assert!(settings.validate().is_err());
    }
}
