//! Engine dependency bundle: every component a reconciliation loop
//! needs, passed by handle rather than reached through a singleton.

use std::time::Duration;

use driftlock_core::RetryPolicy;
use driftlock_diff::{ComparisonPolicy, KindOrdering};
use driftlock_health::HealthRegistry;
use driftlock_source::Fetcher;
use driftlock_store::DynStore;
use driftlock_sync::SyncEngine;
use driftlock_target::{DynTarget, Observer};

/// Tunables shared by every application loop.
#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    /// Fixed poll interval between unprompted reconciliation ticks.
    pub poll_interval: Duration,
    /// Newest sync records kept per application.
    pub history_retention: usize,
    /// Parallel sync items per application.
    pub worker_limit: usize,
    /// Bound on any single target-system call.
    pub call_timeout: Duration,
    /// Per-operation retry policy for transient target errors.
    pub retry: RetryPolicy,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            history_retention: 50,
            worker_limit: 4,
            call_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

/// The assembled engine: fetcher, observer, diff inputs, sync engine,
/// health registry, store, and settings.
pub struct EngineDeps {
    /// Desired-state fetcher.
    pub fetcher: Fetcher,
    /// Live-state observer.
    pub observer: Observer,
    /// Shared target handle (cascade deletion, connection reuse).
    pub target: DynTarget,
    /// Durable application + history store.
    pub store: DynStore,
    /// Comparison policy for the diff engine.
    pub policy: ComparisonPolicy,
    /// Kind dependency ordering.
    pub ordering: KindOrdering,
    /// Health rule registry.
    pub health: HealthRegistry,
    /// Sync engine.
    pub sync: SyncEngine,
    /// Loop tunables.
    pub settings: ControllerSettings,
}

impl EngineDeps {
    /// Wires the engine together around one target handle and one store.
    #[must_use]
    pub fn new(
        fetcher: Fetcher,
        target: DynTarget,
        store: DynStore,
        policy: ComparisonPolicy,
        ordering: KindOrdering,
        health: HealthRegistry,
        settings: ControllerSettings,
    ) -> Self {
        let observer = Observer::new(target.clone(), settings.call_timeout);
        let sync = SyncEngine::new(
            target.clone(),
            ordering.clone(),
            settings.retry,
            settings.worker_limit,
            settings.call_timeout,
        );
        Self {
            fetcher,
            observer,
            target,
            store,
            policy,
            ordering,
            health,
            sync,
            settings,
        }
    }
}
