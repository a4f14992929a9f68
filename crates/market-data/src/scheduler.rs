// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Per-domain refresh scheduling
//!
//! A [`Refresher`] owns the refresh lifecycle of one domain:
//!
//! - **Timer**: a driver task triggers a scheduled refresh every interval
//! - **De-duplication**: a trigger arriving while a run is in flight joins
//!   that run through a shared future instead of starting another fan-out
//! - **Supersession**: a manual refresh replaces an in-flight scheduled or
//!   on-demand run; the older run still completes but its result is never
//!   stored. A manual refresh also restarts the domain timer
//! - **Shutdown**: timers stop; runs in flight complete but nothing they
//!   produce is stored
//!
//! Every phase change is published on a watch channel.

use std::{
    fmt,
    panic::AssertUnwindSafe,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use serde::Serialize;
use shared_types::{DataDomain, DataQuality, Snapshot};
use tokio::{
    sync::{Notify, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{cache::SnapshotSlot, error::RefreshError, metrics};

/// Shortest allowed refresh interval
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

type AssembleFn<T> = Arc<dyn Fn() -> BoxFuture<'static, T> + Send + Sync>;

/// Shared handle on one refresh run
pub type RefreshFuture<T> = Shared<BoxFuture<'static, Result<Arc<T>, RefreshError>>>;

/// What started a refresh run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTrigger {
    /// Interval timer
    Scheduled,
    /// A read found no fresh snapshot
    OnDemand,
    /// Explicit user request
    Manual,
}

impl RefreshTrigger {
    /// Label used in logs and metrics
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::OnDemand => "on_demand",
            Self::Manual => "manual",
        }
    }
}

/// Refresh lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPhase {
    /// Nothing fetched yet
    Idle,
    /// A run is in flight
    Fetching,
    /// The last run stored a snapshot
    Ready,
    /// The last run failed
    Error,
}

/// Observable refresh state of one domain
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatus {
    /// Domain
    pub domain: DataDomain,
    /// Current phase
    pub phase: RefreshPhase,
    /// Assembly time of the stored snapshot
    pub last_updated: Option<DateTime<Utc>>,
    /// Message of the last failed run
    pub last_error: Option<String>,
    /// Whether no snapshot younger than the TTL is stored
    pub is_stale: bool,
    /// Whether the first fetch is still in flight
    pub is_loading: bool,
    /// Quality of the stored snapshot
    pub data_quality: Option<DataQuality>,
}

impl RefreshStatus {
    fn idle(domain: DataDomain) -> Self {
        Self {
            domain,
            phase: RefreshPhase::Idle,
            last_updated: None,
            last_error: None,
            is_stale: true,
            is_loading: false,
            data_quality: None,
        }
    }
}

struct InFlight<T> {
    generation: u64,
    trigger: RefreshTrigger,
    future: RefreshFuture<T>,
}

/// Refresh lifecycle of one domain
pub struct Refresher<T> {
    interval: Duration,
    slot: Arc<SnapshotSlot<T>>,
    fallback: Arc<T>,
    assemble: AssembleFn<T>,
    in_flight: Mutex<Option<InFlight<T>>>,
    generation: AtomicU64,
    status: watch::Sender<RefreshStatus>,
    reset: Notify,
    shutdown: CancellationToken,
}

impl<T: Snapshot> fmt::Debug for Refresher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refresher")
            .field("domain", &T::DOMAIN)
            .field("interval", &self.interval)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<T: Snapshot> Refresher<T> {
    /// Create a refresher storing into `slot`
    ///
    /// `fallback` is served when a read finds nothing stored and the run it
    /// starts fails.
    pub fn new<F>(
        slot: Arc<SnapshotSlot<T>>,
        fallback: Arc<T>,
        interval: Duration,
        shutdown: CancellationToken,
        assemble: F,
    ) -> Self
    where
        F: Fn() -> BoxFuture<'static, T> + Send + Sync + 'static,
    {
        let (status, _) = watch::channel(RefreshStatus::idle(T::DOMAIN));
        Self {
            interval: interval.max(MIN_REFRESH_INTERVAL),
            slot,
            fallback,
            assemble: Arc::new(assemble),
            in_flight: Mutex::new(None),
            generation: AtomicU64::new(0),
            status,
            reset: Notify::new(),
            shutdown,
        }
    }

    /// Domain refreshed by this refresher
    pub fn domain(&self) -> DataDomain {
        T::DOMAIN
    }

    /// Timer interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Read-through access: the stored snapshot if fresh
    ///
    /// A stale snapshot is returned immediately while a background refresh
    /// revalidates it. With nothing stored the caller waits for a run, and
    /// gets the catalog fallback if that run fails.
    pub async fn get(self: &Arc<Self>) -> Arc<T> {
        if let Some(fresh) = self.slot.fresh() {
            return fresh;
        }
        if let Some(stale) = self.slot.latest() {
            self.trigger(RefreshTrigger::OnDemand);
            return stale;
        }

        metrics::record_cache_operation("miss", T::DOMAIN.name());
        match self.refresh(RefreshTrigger::OnDemand).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(domain = T::DOMAIN.name(), error = %e, "serving fallback snapshot");
                self.slot.latest().unwrap_or_else(|| self.fallback_now())
            }
        }
    }

    /// Start or join a refresh run and wait for its result
    ///
    /// # Errors
    ///
    /// Returns an error if the run panicked or the scheduler shut down
    pub async fn refresh(self: &Arc<Self>, trigger: RefreshTrigger) -> Result<Arc<T>, RefreshError> {
        self.start(trigger).await
    }

    /// Start or join a refresh run without waiting
    pub fn trigger(self: &Arc<Self>, trigger: RefreshTrigger) {
        drop(self.start(trigger));
    }

    /// Start a run, or return the in-flight one when it can be joined
    pub fn start(self: &Arc<Self>, trigger: RefreshTrigger) -> RefreshFuture<T> {
        let domain = T::DOMAIN.name();
        let mut in_flight = self.lock_in_flight();

        if let Some(current) = in_flight.as_ref() {
            let supersedes =
                trigger == RefreshTrigger::Manual && current.trigger != RefreshTrigger::Manual;
            if !supersedes {
                debug!(
                    domain,
                    trigger = trigger.as_str(),
                    generation = current.generation,
                    "joining in-flight refresh"
                );
                metrics::record_refresh(domain, trigger.as_str(), "joined");
                return current.future.clone();
            }
            info!(
                domain,
                superseded = current.generation,
                "manual refresh supersedes in-flight run"
            );
        }

        // runs are assembled in start order
        let assembly = (self.assemble)();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let span = info_span!(
            "refresh",
            domain,
            trigger = trigger.as_str(),
            generation,
            run_id = %Uuid::new_v4()
        );
        let future = Arc::clone(self)
            .run(generation, trigger, assembly)
            .instrument(span)
            .boxed()
            .shared();
        *in_flight = Some(InFlight {
            generation,
            trigger,
            future: future.clone(),
        });
        // status transitions are published under the in-flight lock
        self.publish_fetching();
        drop(in_flight);

        if trigger == RefreshTrigger::Manual {
            self.reset.notify_one();
        }
        // drive the run even if every caller stops waiting
        tokio::spawn(future.clone());
        future
    }

    /// Current status, with staleness evaluated now
    pub fn status(&self) -> RefreshStatus {
        let mut status = self.status.borrow().clone();
        status.is_stale = self.slot.is_stale();
        status
    }

    /// Subscribe to status changes
    pub fn subscribe(&self) -> watch::Receiver<RefreshStatus> {
        self.status.subscribe()
    }

    /// Spawn the interval driver
    ///
    /// The first tick fires immediately, so the initial fetch starts at
    /// once. The driver exits when the shutdown token is cancelled.
    pub fn spawn_driver(self: &Arc<Self>) -> JoinHandle<()> {
        let refresher = Arc::clone(self);
        tokio::spawn(async move {
            let domain = T::DOMAIN.name();
            let mut ticker = interval(refresher.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                domain,
                interval_secs = refresher.interval.as_secs(),
                "refresh timer started"
            );

            loop {
                tokio::select! {
                    () = refresher.shutdown.cancelled() => break,
                    () = refresher.reset.notified() => ticker.reset(),
                    _ = ticker.tick() => refresher.trigger(RefreshTrigger::Scheduled),
                }
            }
            info!(domain, "refresh timer stopped");
        })
    }

    /// Stop the timer and discard the results of runs in flight
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn run(
        self: Arc<Self>,
        generation: u64,
        trigger: RefreshTrigger,
        assembly: BoxFuture<'static, T>,
    ) -> Result<Arc<T>, RefreshError> {
        let domain = T::DOMAIN;
        let started = Instant::now();
        let outcome = AssertUnwindSafe(assembly).catch_unwind().await;

        let mut in_flight = self.lock_in_flight();
        if in_flight
            .as_ref()
            .is_some_and(|current| current.generation == generation)
        {
            *in_flight = None;
        }

        let snapshot = match outcome {
            Ok(snapshot) => Arc::new(snapshot),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                let error = RefreshError::Failed { domain, message };
                error!(error = %error, "refresh run failed");
                metrics::record_refresh(domain.name(), trigger.as_str(), "failed");
                if self.is_current(generation) {
                    self.publish_error(&error);
                }
                return Err(error);
            }
        };

        if self.shutdown.is_cancelled() {
            debug!("discarding refresh result after shutdown");
            metrics::record_refresh(domain.name(), trigger.as_str(), "discarded");
            return Err(RefreshError::ShuttingDown { domain });
        }
        if !self.is_current(generation) {
            debug!("discarding superseded refresh result");
            metrics::record_refresh(domain.name(), trigger.as_str(), "superseded");
            return Ok(snapshot);
        }

        self.slot.store(Arc::clone(&snapshot));
        self.publish_ready(&snapshot);
        drop(in_flight);
        metrics::record_refresh(domain.name(), trigger.as_str(), "stored");
        info!(
            data_quality = snapshot.data_quality().as_str(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "refresh stored"
        );
        Ok(snapshot)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<InFlight<T>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fallback_now(&self) -> Arc<T> {
        Arc::new(
            (*self.fallback)
                .clone()
                .stamped(Utc::now(), DataQuality::Fallback),
        )
    }

    fn publish_fetching(&self) {
        let has_value = self.slot.latest().is_some();
        let is_stale = self.slot.is_stale();
        self.status.send_modify(|status| {
            status.phase = RefreshPhase::Fetching;
            status.is_loading = !has_value;
            status.is_stale = is_stale;
        });
    }

    fn publish_ready(&self, snapshot: &T) {
        self.status.send_modify(|status| {
            status.phase = RefreshPhase::Ready;
            status.last_updated = Some(snapshot.observed_at());
            status.last_error = None;
            status.is_stale = false;
            status.is_loading = false;
            status.data_quality = Some(snapshot.data_quality());
        });
    }

    fn publish_error(&self, error: &RefreshError) {
        let is_stale = self.slot.is_stale();
        self.status.send_modify(|status| {
            status.phase = RefreshPhase::Error;
            status.last_error = Some(error.to_string());
            status.is_stale = is_stale;
            status.is_loading = false;
        });
    }
}
