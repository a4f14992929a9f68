// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Wallet holdings parts

use serde_json::Value;
use shared_types::{MAX_PORTFOLIO_INSCRIPTIONS, RuneBalance};

use super::{
    Normalize, Normalized,
    coerce::{FieldReader, as_text, as_u64, list_items},
};
use crate::error::SchemaMismatch;

/// Inscriptions held by an address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InscriptionHoldings {
    /// Total held
    pub inscription_count: u64,
    /// Most recent ids
    pub inscription_ids: Vec<String>,
}

impl Normalize for InscriptionHoldings {
    const PART: &'static str = "inscriptions";

    fn normalize(raw: &Value, _defaults: &Self) -> Result<Normalized<Self>, SchemaMismatch> {
        let items = list_items(raw)?;
        let inscription_ids: Vec<String> = items
            .iter()
            .filter_map(|item| match item {
                Value::String(_) => as_text(item),
                _ => item.get("id").and_then(as_text),
            })
            .take(MAX_PORTFOLIO_INSCRIPTIONS)
            .collect();

        let total = raw
            .as_object()
            .and_then(|object| FieldReader::new(object).lookup(&["total", "count"]))
            .and_then(as_u64);
        let mut defaulted = Vec::new();
        let inscription_count = total.unwrap_or_else(|| {
            defaulted.push("inscriptionCount");
            inscription_ids.len() as u64
        });

        if !items.is_empty() && inscription_ids.is_empty() {
            return Err(SchemaMismatch::Unreadable { part: Self::PART });
        }
        Ok(Normalized {
            value: Self {
                inscription_count,
                inscription_ids,
            },
            defaulted,
        })
    }
}

/// Rune balances held by an address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuneHoldings(pub Vec<RuneBalance>);

impl Normalize for RuneHoldings {
    const PART: &'static str = "runeBalances";

    fn normalize(raw: &Value, _defaults: &Self) -> Result<Normalized<Self>, SchemaMismatch> {
        let items = list_items(raw)?;
        let mut defaulted = Vec::new();
        let mut balances = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            let reader = FieldReader::object(item, &format!("$[{index}]"))?;
            let rune = reader
                .lookup(&["spaced_rune", "rune", "name"])
                .and_then(as_text);
            let amount = reader.lookup(&["amount", "balance"]).and_then(as_text);
            match (rune, amount) {
                (Some(rune), Some(amount)) => balances.push(RuneBalance { rune, amount }),
                _ => defaulted.push("runeBalances"),
            }
        }

        if !items.is_empty() && balances.is_empty() {
            return Err(SchemaMismatch::Unreadable { part: Self::PART });
        }
        defaulted.dedup();
        Ok(Normalized {
            value: Self(balances),
            defaulted,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn inscriptions_are_capped() {
        let ids: Vec<Value> = (0..30).map(|i| json!({"id": format!("{i}i0")})).collect();
        let raw = json!({"total": 30, "results": ids});
        let holdings = InscriptionHoldings::normalize(&raw, &InscriptionHoldings::default())
            .unwrap()
            .value;

        assert_eq!(holdings.inscription_count, 30);
        assert_eq!(holdings.inscription_ids.len(), MAX_PORTFOLIO_INSCRIPTIONS);
    }

    #[test]
    fn inscription_count_defaults_to_listed_ids() {
        let raw = json!(["abci0", "defi0"]);
        let holdings =
            InscriptionHoldings::normalize(&raw, &InscriptionHoldings::default()).unwrap();

        assert_eq!(holdings.value.inscription_count, 2);
        assert_eq!(holdings.defaulted, vec!["inscriptionCount"]);
    }

    #[test]
    fn empty_wallet_is_complete() {
        let raw = json!({"total": 0, "results": []});
        let holdings =
            InscriptionHoldings::normalize(&raw, &InscriptionHoldings::default()).unwrap();
        assert!(holdings.is_complete());
        assert_eq!(holdings.value.inscription_count, 0);
    }

    #[test]
    fn rune_balances_keep_string_amounts() {
        let raw = json!({"results": [
            {"spaced_rune": "DOG•GO•TO•THE•MOON", "amount": "250000.00000"},
            {"spaced_rune": "BROKEN"}
        ]});
        let holdings = RuneHoldings::normalize(&raw, &RuneHoldings::default()).unwrap();

        assert_eq!(holdings.value.0.len(), 1);
        assert_eq!(holdings.value.0[0].amount, "250000.00000");
        assert_eq!(holdings.defaulted, vec!["runeBalances"]);
    }
}
