// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Snapshot cache with atomic replacement
//!
//! Each domain owns one slot holding the most recently stored snapshot.
//! Storing swaps a single pointer, so readers see either the previous
//! snapshot or the new one, never a partially built record. The cache is an
//! explicit object created at startup and injected where it is needed.

use std::{sync::Arc, time::Duration};

use arc_swap::ArcSwapOption;
use shared_types::{
    CollectionsSnapshot, DataDomain, HashrateSnapshot, MempoolSnapshot, PriceTicker,
    RunesSnapshot, Snapshot,
};
use tokio::time::Instant;
use tracing::debug;

use crate::metrics;

/// A stored snapshot and when it was stored
#[derive(Debug)]
pub struct StoredSnapshot<T> {
    /// The snapshot
    pub value: Arc<T>,
    /// Storage time, used for staleness
    pub stored_at: Instant,
}

/// Single-domain cache slot
#[derive(Debug)]
pub struct SnapshotSlot<T> {
    current: ArcSwapOption<StoredSnapshot<T>>,
    ttl: Duration,
}

impl<T: Snapshot> SnapshotSlot<T> {
    /// Create an empty slot whose values go stale after `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            current: ArcSwapOption::empty(),
            ttl,
        }
    }

    /// Time after which a stored value is stale
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Replace the stored snapshot
    pub fn store(&self, value: Arc<T>) {
        self.current.store(Some(Arc::new(StoredSnapshot {
            value,
            stored_at: Instant::now(),
        })));
        metrics::record_cache_operation("store", T::DOMAIN.name());
        debug!(domain = T::DOMAIN.name(), "snapshot stored");
    }

    /// Latest stored snapshot regardless of age
    pub fn latest(&self) -> Option<Arc<T>> {
        self.current
            .load_full()
            .map(|stored| Arc::clone(&stored.value))
    }

    /// Latest stored snapshot if it is younger than the TTL
    pub fn fresh(&self) -> Option<Arc<T>> {
        let stored = self.current.load_full()?;
        if stored.stored_at.elapsed() < self.ttl {
            metrics::record_cache_operation("hit", T::DOMAIN.name());
            Some(Arc::clone(&stored.value))
        } else {
            metrics::record_cache_operation("stale", T::DOMAIN.name());
            None
        }
    }

    /// Whether the slot is empty or its value has outlived the TTL
    pub fn is_stale(&self) -> bool {
        self.current
            .load()
            .as_ref()
            .is_none_or(|stored| stored.stored_at.elapsed() >= self.ttl)
    }

    /// Drop the stored snapshot
    pub fn invalidate(&self) {
        self.current.store(None);
        metrics::record_cache_operation("invalidate", T::DOMAIN.name());
    }
}

/// One slot per shared data domain
#[derive(Debug)]
pub struct SnapshotCache {
    /// Mempool slot
    pub mempool: Arc<SnapshotSlot<MempoolSnapshot>>,
    /// Hashrate slot
    pub hashrate: Arc<SnapshotSlot<HashrateSnapshot>>,
    /// Collections slot
    pub collections: Arc<SnapshotSlot<CollectionsSnapshot>>,
    /// Runes slot
    pub runes: Arc<SnapshotSlot<RunesSnapshot>>,
    /// Price slot
    pub price: Arc<SnapshotSlot<PriceTicker>>,
}

impl SnapshotCache {
    /// Create empty slots with a TTL per domain
    pub fn new(ttl: impl Fn(DataDomain) -> Duration) -> Self {
        Self {
            mempool: Arc::new(SnapshotSlot::new(ttl(DataDomain::Mempool))),
            hashrate: Arc::new(SnapshotSlot::new(ttl(DataDomain::Hashrate))),
            collections: Arc::new(SnapshotSlot::new(ttl(DataDomain::Collections))),
            runes: Arc::new(SnapshotSlot::new(ttl(DataDomain::Runes))),
            price: Arc::new(SnapshotSlot::new(ttl(DataDomain::Price))),
        }
    }

    /// Whether a domain's slot is empty or stale
    pub fn is_stale(&self, domain: DataDomain) -> bool {
        match domain {
            DataDomain::Mempool => self.mempool.is_stale(),
            DataDomain::Hashrate => self.hashrate.is_stale(),
            DataDomain::Collections => self.collections.is_stale(),
            DataDomain::Runes => self.runes.is_stale(),
            DataDomain::Price => self.price.is_stale(),
        }
    }

    /// Drop one domain's snapshot
    pub fn invalidate(&self, domain: DataDomain) {
        match domain {
            DataDomain::Mempool => self.mempool.invalidate(),
            DataDomain::Hashrate => self.hashrate.invalidate(),
            DataDomain::Collections => self.collections.invalidate(),
            DataDomain::Runes => self.runes.invalidate(),
            DataDomain::Price => self.price.invalidate(),
        }
    }

    /// Drop every snapshot
    pub fn invalidate_all(&self) {
        for domain in DataDomain::all() {
            self.invalidate(*domain);
        }
    }
}
