// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Data domain identifiers
//!
//! A data domain is one independently refreshed dashboard feed. Each domain
//! maps to exactly one canonical record type and one refresh cadence.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Independently refreshed market data feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DataDomain {
    /// Fee estimates, mempool usage, recent transactions and the latest block
    Mempool,
    /// Network hashrate, difficulty progress and mining pool distribution
    Hashrate,
    /// Top inscription collections by 24h volume
    Collections,
    /// Top runes by 24h volume
    Runes,
    /// Bitcoin spot price
    Price,
}

impl DataDomain {
    /// Returns the lowercase name used in routes, logs and metric labels
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mempool => "mempool",
            Self::Hashrate => "hashrate",
            Self::Collections => "collections",
            Self::Runes => "runes",
            Self::Price => "price",
        }
    }

    /// Returns all scheduled domains
    pub const fn all() -> &'static [Self] {
        &[
            Self::Mempool,
            Self::Hashrate,
            Self::Collections,
            Self::Runes,
            Self::Price,
        ]
    }

    /// Default refresh cadence observed for this feed
    pub const fn default_refresh_interval(self) -> Duration {
        match self {
            Self::Mempool => Duration::from_secs(30),
            Self::Hashrate | Self::Price => Duration::from_secs(60),
            Self::Collections | Self::Runes => Duration::from_secs(300),
        }
    }
}

impl fmt::Display for DataDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown domain name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown data domain '{0}'")]
pub struct UnknownDomain(pub String);

impl FromStr for DataDomain {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|domain| domain.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownDomain(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_names() {
        for &domain in DataDomain::all() {
            assert_eq!(domain.name().parse::<DataDomain>(), Ok(domain));
        }
        assert_eq!("  RUNES ".parse::<DataDomain>(), Ok(DataDomain::Runes));
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = "portfolio".parse::<DataDomain>().unwrap_err();
        assert_eq!(err.to_string(), "unknown data domain 'portfolio'");
    }

    #[test]
    fn listing_domains_refresh_slower_than_live_feeds() {
        assert!(
            DataDomain::Collections.default_refresh_interval()
                > DataDomain::Mempool.default_refresh_interval()
        );
        assert_eq!(
            DataDomain::Mempool.default_refresh_interval(),
            Duration::from_secs(30)
        );
        assert_eq!(
            DataDomain::Hashrate.default_refresh_interval(),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&DataDomain::Hashrate).unwrap();
        assert_eq!(json, "\"hashrate\"");
    }
}
