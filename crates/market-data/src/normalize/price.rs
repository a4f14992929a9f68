// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Spot price part

use serde_json::Value;

use super::{
    Normalize, Normalized,
    coerce::{FieldReader, as_f64, as_non_negative},
};
use crate::error::SchemaMismatch;

/// BTC/USD quote
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BtcQuote {
    /// Price in USD
    pub btc_usd: f64,
    /// 24h change, percent
    pub change_24h_percent: f64,
}

impl Normalize for BtcQuote {
    const PART: &'static str = "btcPrice";

    fn normalize(raw: &Value, defaults: &Self) -> Result<Normalized<Self>, SchemaMismatch> {
        let bitcoin = raw.get("bitcoin").unwrap_or(raw);
        let mut reader = FieldReader::object(bitcoin, "$.bitcoin")?;
        let quote = Self {
            btc_usd: reader.take("btcUsd", &["usd"], defaults.btc_usd, as_non_negative),
            change_24h_percent: reader.take(
                "change24hPercent",
                &["usd_24h_change"],
                defaults.change_24h_percent,
                as_f64,
            ),
        };
        reader.finish(Self::PART, quote)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const DEFAULTS: BtcQuote = BtcQuote {
        btc_usd: 43_000.0,
        change_24h_percent: 0.0,
    };

    #[test]
    fn quote_from_simple_price() {
        let raw = json!({"bitcoin": {"usd": 68_412.37, "usd_24h_change": -1.284}});
        let quote = BtcQuote::normalize(&raw, &DEFAULTS).unwrap();

        assert!(quote.is_complete());
        assert!((quote.value.btc_usd - 68_412.37).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_change_is_defaulted() {
        let raw = json!({"bitcoin": {"usd": "70000"}});
        let quote = BtcQuote::normalize(&raw, &DEFAULTS).unwrap();

        assert_eq!(quote.defaulted, vec!["change24hPercent"]);
    }

    #[test]
    fn negative_price_is_rejected() {
        let raw = json!({"bitcoin": {"usd": -5}});
        assert_eq!(
            BtcQuote::normalize(&raw, &DEFAULTS),
            Err(SchemaMismatch::Unreadable { part: "btcPrice" })
        );
        assert!(BtcQuote::normalize(&json!({"bitcoin": 5}), &DEFAULTS).is_err());
    }
}
