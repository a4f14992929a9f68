// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Ranked collection and rune listings
//!
//! Listings are whole-record parts: an item without a name rejects the
//! entire list, so a partially named list never reaches the dashboard.
//! Missing numeric fields on a named item default to zero.

use serde_json::Value;
use shared_types::{CollectionSummary, Ranked, RuneSummary};

use super::{
    Normalize, Normalized,
    coerce::{FieldReader, as_non_negative, as_text, as_u64, list_items},
};
use crate::error::SchemaMismatch;

const VOLUME_KEYS: &[&str] = &["volume_24h", "volume24h", "volume"];
const HOLDER_KEYS: &[&str] = &["holders", "unique_holders", "uniqueHolders"];

/// Collection listing before ranking
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionListing(pub Vec<CollectionSummary>);

/// Rune listing before ranking
#[derive(Debug, Clone, PartialEq)]
pub struct RuneListing(pub Vec<RuneSummary>);

fn read_items<T>(
    raw: &Value,
    part: &'static str,
    name_keys: &[&str],
    mut item: impl FnMut(String, &mut FieldReader<'_>) -> T,
) -> Result<Normalized<Vec<T>>, SchemaMismatch> {
    let items = list_items(raw)?;
    let mut defaulted = Vec::new();
    let mut values = Vec::with_capacity(items.len());

    for (index, raw_item) in items.iter().enumerate() {
        let mut reader = FieldReader::object(raw_item, &format!("$[{index}]"))?;
        let name = reader
            .lookup(name_keys)
            .and_then(as_text)
            .ok_or(SchemaMismatch::UnnamedItem { part, index })?;
        values.push(item(name, &mut reader));
        defaulted.extend(reader.into_defaulted());
    }

    defaulted.sort_unstable();
    defaulted.dedup();
    Ok(Normalized {
        value: values,
        defaulted,
    })
}

impl Normalize for CollectionListing {
    const PART: &'static str = "collections";

    fn normalize(raw: &Value, _defaults: &Self) -> Result<Normalized<Self>, SchemaMismatch> {
        let items = read_items(
            raw,
            Self::PART,
            &["name", "collection_name", "collectionName"],
            |name, reader| CollectionSummary {
                name,
                volume_24h: reader.take("collections.volume24h", VOLUME_KEYS, 0.0, as_non_negative),
                floor_price: reader.take(
                    "collections.floorPrice",
                    &["floor_price", "floorPrice"],
                    0.0,
                    as_non_negative,
                ),
                unique_holders: reader.take("collections.uniqueHolders", HOLDER_KEYS, 0, as_u64),
                rank: 0,
            },
        )?;
        Ok(Normalized {
            value: Self(items.value),
            defaulted: items.defaulted,
        })
    }
}

impl Normalize for RuneListing {
    const PART: &'static str = "runes";

    fn normalize(raw: &Value, _defaults: &Self) -> Result<Normalized<Self>, SchemaMismatch> {
        let items = read_items(
            raw,
            Self::PART,
            &["spaced_rune", "spacedRune", "name", "rune"],
            |name, reader| RuneSummary {
                name,
                volume_24h: reader.take("runes.volume24h", VOLUME_KEYS, 0.0, as_non_negative),
                price: reader.take("runes.price", &["price_sats", "price"], 0.0, as_non_negative),
                unique_holders: reader.take("runes.uniqueHolders", HOLDER_KEYS, 0, as_u64),
                rank: 0,
            },
        )?;
        Ok(Normalized {
            value: Self(items.value),
            defaulted: items.defaulted,
        })
    }
}

/// Sort by descending volume, break ties by name, keep `limit` items and
/// assign ranks `1..=N`
pub fn rank_by_volume<T: Ranked>(items: &mut Vec<T>, limit: usize) {
    items.sort_by(|a, b| {
        b.volume_24h()
            .total_cmp(&a.volume_24h())
            .then_with(|| a.name().cmp(b.name()))
    });
    items.truncate(limit);
    for (rank, item) in (1_u32..).zip(items.iter_mut()) {
        item.set_rank(rank);
    }
}
