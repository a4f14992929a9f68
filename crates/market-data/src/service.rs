// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Market data service
//!
//! [`MarketDataService`] wires the aggregator, the snapshot cache and one
//! [`Refresher`] per domain into the single object the API layer talks to.

use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use api_client::ProviderClient;
use futures::{FutureExt, future::join_all};
use shared_types::{
    CollectionsSnapshot, DataDomain, HashrateSnapshot, MempoolSnapshot, PriceTicker,
    RunesSnapshot, WalletAddress, WalletPortfolio,
};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    aggregator::{Aggregator, AggregatorConfig},
    cache::{SnapshotCache, SnapshotSlot},
    fallback::{CatalogEntry, FallbackCatalog},
    record::CanonicalRecord,
    scheduler::{RefreshStatus, RefreshTrigger, Refresher},
};

/// Stored snapshots go stale after this many refresh intervals
pub const DEFAULT_STALE_AFTER_INTERVALS: u32 = 2;

/// Refresh interval of each shared domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshIntervals {
    /// Mempool interval
    pub mempool: Duration,
    /// Hashrate interval
    pub hashrate: Duration,
    /// Collections interval
    pub collections: Duration,
    /// Runes interval
    pub runes: Duration,
    /// Price interval
    pub price: Duration,
}

impl RefreshIntervals {
    /// Interval of one domain
    pub fn get(&self, domain: DataDomain) -> Duration {
        match domain {
            DataDomain::Mempool => self.mempool,
            DataDomain::Hashrate => self.hashrate,
            DataDomain::Collections => self.collections,
            DataDomain::Runes => self.runes,
            DataDomain::Price => self.price,
        }
    }
}

impl Default for RefreshIntervals {
    fn default() -> Self {
        Self {
            mempool: DataDomain::Mempool.default_refresh_interval(),
            hashrate: DataDomain::Hashrate.default_refresh_interval(),
            collections: DataDomain::Collections.default_refresh_interval(),
            runes: DataDomain::Runes.default_refresh_interval(),
            price: DataDomain::Price.default_refresh_interval(),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketDataConfig {
    /// Aggregation tuning
    pub aggregator: AggregatorConfig,
    /// Refresh intervals
    pub intervals: RefreshIntervals,
    /// Multiple of the interval after which a snapshot is stale
    pub stale_after_intervals: u32,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            aggregator: AggregatorConfig::default(),
            intervals: RefreshIntervals::default(),
            stale_after_intervals: DEFAULT_STALE_AFTER_INTERVALS,
        }
    }
}

impl MarketDataConfig {
    /// Staleness threshold of one domain
    pub fn ttl(&self, domain: DataDomain) -> Duration {
        self.intervals
            .get(domain)
            .saturating_mul(self.stale_after_intervals.max(1))
    }
}

/// Aggregated, cached and periodically refreshed market data
#[derive(Debug)]
pub struct MarketDataService<P> {
    aggregator: Arc<Aggregator<P>>,
    cache: Arc<SnapshotCache>,
    mempool: Arc<Refresher<MempoolSnapshot>>,
    hashrate: Arc<Refresher<HashrateSnapshot>>,
    collections: Arc<Refresher<CollectionsSnapshot>>,
    runes: Arc<Refresher<RunesSnapshot>>,
    price: Arc<Refresher<PriceTicker>>,
    shutdown: CancellationToken,
    drivers: Mutex<Vec<JoinHandle<()>>>,
}

impl<P: ProviderClient + 'static> MarketDataService<P> {
    /// Create the service; call [`start`](Self::start) to begin scheduled refreshes
    pub fn new(
        provider: Arc<P>,
        catalog: Arc<FallbackCatalog>,
        config: &MarketDataConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let aggregator = Arc::new(Aggregator::new(
            provider,
            catalog,
            config.aggregator.clone(),
        ));
        let cache = Arc::new(SnapshotCache::new(|domain| config.ttl(domain)));

        Self {
            mempool: refresher(&aggregator, &cache.mempool, config, &shutdown, |a| async move {
                a.mempool().await
            }),
            hashrate: refresher(&aggregator, &cache.hashrate, config, &shutdown, |a| async move {
                a.hashrate().await
            }),
            collections: refresher(
                &aggregator,
                &cache.collections,
                config,
                &shutdown,
                |a| async move { a.collections().await },
            ),
            runes: refresher(&aggregator, &cache.runes, config, &shutdown, |a| async move {
                a.runes().await
            }),
            price: refresher(&aggregator, &cache.price, config, &shutdown, |a| async move {
                a.price().await
            }),
            aggregator,
            cache,
            shutdown,
            drivers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the refresh timers; the first refresh of every domain starts at once
    pub fn start(&self) {
        let mut drivers = self.drivers.lock().unwrap_or_else(PoisonError::into_inner);
        if !drivers.is_empty() {
            warn!("refresh timers already running");
            return;
        }
        drivers.extend([
            self.mempool.spawn_driver(),
            self.hashrate.spawn_driver(),
            self.collections.spawn_driver(),
            self.runes.spawn_driver(),
            self.price.spawn_driver(),
        ]);
        info!(domains = drivers.len(), "market data refresh started");
    }

    /// Stop the timers and wait for them to exit
    ///
    /// Runs still in flight complete, but their results are not stored.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let drivers =
            std::mem::take(&mut *self.drivers.lock().unwrap_or_else(PoisonError::into_inner));
        for result in join_all(drivers).await {
            if let Err(e) = result {
                warn!(error = %e, "refresh timer ended abnormally");
            }
        }
        info!("market data refresh stopped");
    }

    /// Latest mempool snapshot
    pub async fn mempool(&self) -> Arc<MempoolSnapshot> {
        self.mempool.get().await
    }

    /// Latest hashrate snapshot
    pub async fn hashrate(&self) -> Arc<HashrateSnapshot> {
        self.hashrate.get().await
    }

    /// Latest collection listing
    pub async fn collections(&self) -> Arc<CollectionsSnapshot> {
        self.collections.get().await
    }

    /// Latest rune listing
    pub async fn runes(&self) -> Arc<RunesSnapshot> {
        self.runes.get().await
    }

    /// Latest price ticker
    pub async fn price(&self) -> Arc<PriceTicker> {
        self.price.get().await
    }

    /// Latest snapshot of any domain
    pub async fn snapshot(&self, domain: DataDomain) -> CanonicalRecord {
        match domain {
            DataDomain::Mempool => CanonicalRecord::Mempool(self.mempool().await),
            DataDomain::Hashrate => CanonicalRecord::Hashrate(self.hashrate().await),
            DataDomain::Collections => CanonicalRecord::Collections(self.collections().await),
            DataDomain::Runes => CanonicalRecord::Runes(self.runes().await),
            DataDomain::Price => CanonicalRecord::Price(self.price().await),
        }
    }

    /// Manual refresh of one domain
    ///
    /// Supersedes an in-flight scheduled run and restarts the domain timer.
    /// Always yields a record: on failure the stored snapshot, or the catalog
    /// entry when nothing is stored.
    pub async fn refresh(&self, domain: DataDomain) -> CanonicalRecord {
        match domain {
            DataDomain::Mempool => manual(&self.mempool).await,
            DataDomain::Hashrate => manual(&self.hashrate).await,
            DataDomain::Collections => manual(&self.collections).await,
            DataDomain::Runes => manual(&self.runes).await,
            DataDomain::Price => manual(&self.price).await,
        }
    }

    /// Assemble a wallet portfolio; portfolios are never cached
    pub async fn wallet_portfolio(&self, address: &WalletAddress) -> WalletPortfolio {
        self.aggregator.portfolio(address).await
    }

    /// Refresh status of one domain
    pub fn status(&self, domain: DataDomain) -> RefreshStatus {
        match domain {
            DataDomain::Mempool => self.mempool.status(),
            DataDomain::Hashrate => self.hashrate.status(),
            DataDomain::Collections => self.collections.status(),
            DataDomain::Runes => self.runes.status(),
            DataDomain::Price => self.price.status(),
        }
    }

    /// Refresh status of every domain
    pub fn statuses(&self) -> Vec<RefreshStatus> {
        DataDomain::all().iter().map(|d| self.status(*d)).collect()
    }

    /// Watch one domain's refresh status
    pub fn subscribe(&self, domain: DataDomain) -> watch::Receiver<RefreshStatus> {
        match domain {
            DataDomain::Mempool => self.mempool.subscribe(),
            DataDomain::Hashrate => self.hashrate.subscribe(),
            DataDomain::Collections => self.collections.subscribe(),
            DataDomain::Runes => self.runes.subscribe(),
            DataDomain::Price => self.price.subscribe(),
        }
    }

    /// Snapshot cache
    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    /// Fallback catalog
    pub fn catalog(&self) -> &Arc<FallbackCatalog> {
        self.aggregator.catalog()
    }
}

fn refresher<P, T, F, Fut>(
    aggregator: &Arc<Aggregator<P>>,
    slot: &Arc<SnapshotSlot<T>>,
    config: &MarketDataConfig,
    shutdown: &CancellationToken,
    assemble: F,
) -> Arc<Refresher<T>>
where
    P: ProviderClient + 'static,
    T: CatalogEntry,
    F: Fn(Arc<Aggregator<P>>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    let fallback = Arc::new(T::entry(aggregator.catalog()).clone());
    let aggregator = Arc::clone(aggregator);
    Arc::new(Refresher::new(
        Arc::clone(slot),
        fallback,
        config.intervals.get(T::DOMAIN),
        shutdown.child_token(),
        move || assemble(Arc::clone(&aggregator)).boxed(),
    ))
}

async fn manual<T: CatalogEntry>(refresher: &Arc<Refresher<T>>) -> CanonicalRecord {
    let snapshot = match refresher.refresh(RefreshTrigger::Manual).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "manual refresh failed");
            refresher.get().await
        }
    };
    T::into_record(snapshot)
}

#[cfg(test)]
mod tests {
    use api_client::{Endpoint, StaticProvider, StaticResponse};
    use shared_types::DataQuality;

    use super::*;
    use crate::scheduler::RefreshPhase;

    fn service(provider: StaticProvider) -> (Arc<StaticProvider>, MarketDataService<StaticProvider>) {
        let provider = Arc::new(provider);
        let service = MarketDataService::new(
            Arc::clone(&provider),
            Arc::new(FallbackCatalog::builtin()),
            &MarketDataConfig::default(),
            CancellationToken::new(),
        );
        (provider, service)
    }

    #[test]
    fn ttl_is_a_multiple_of_the_interval() {
        let config = MarketDataConfig::default();
        assert_eq!(
            config.ttl(DataDomain::Price),
            DataDomain::Price.default_refresh_interval() * 2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reads_are_served_from_cache() {
        let (provider, service) = service(StaticProvider::demo());

        let first = service.price().await;
        let second = service.price().await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(provider.call_count(&Endpoint::BtcPrice), 1);
        assert_eq!(service.status(DataDomain::Price).phase, RefreshPhase::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_refresh_fetches_again() {
        let (provider, service) = service(StaticProvider::demo());

        service.runes().await;
        let refreshed = service.refresh(DataDomain::Runes).await;

        assert_eq!(refreshed.domain(), DataDomain::Runes);
        assert_eq!(provider.call_count(&Endpoint::Runes), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_providers_serve_catalog() {
        let (_, service) = service(
            StaticProvider::new()
                .with_response(&Endpoint::BtcPrice, StaticResponse::Status(500)),
        );

        let price = service.price().await;

        assert_eq!(price.data_quality, DataQuality::Fallback);
        assert!((price.btc_usd - service.catalog().price.btc_usd).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_timers() {
        let (provider, service) = service(StaticProvider::demo());
        service.start();
        tokio::time::sleep(Duration::from_secs(1)).await;
        service.shutdown().await;

        let calls = provider.total_calls();
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(provider.total_calls(), calls);
    }
}
