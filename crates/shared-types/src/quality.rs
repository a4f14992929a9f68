// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Data quality classification for assembled snapshots

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Provenance of the values in a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    /// Every part came from a live provider response
    Live,
    /// Some parts were substituted or defaulted
    Degraded,
    /// Every part came from the fallback catalog
    Fallback,
}

impl DataQuality {
    /// Classify a snapshot from the number of fully live parts and fully
    /// substituted parts out of `total` parts
    ///
    /// A part that was live but had defaulted fields counts as neither, which
    /// always yields `Degraded`.
    pub fn classify(live_parts: usize, fallback_parts: usize, total: usize) -> Self {
        if total == 0 || fallback_parts >= total {
            Self::Fallback
        } else if live_parts >= total {
            Self::Live
        } else {
            Self::Degraded
        }
    }

    /// Returns the lowercase label used in logs and metrics
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Degraded => "degraded",
            Self::Fallback => "fallback",
        }
    }

    /// Check if any value in the snapshot came from a live provider
    pub fn has_live_data(self) -> bool {
        !matches!(self, Self::Fallback)
    }
}

impl std::fmt::Display for DataQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
