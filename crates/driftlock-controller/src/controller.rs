//! The per-application reconciliation loop.

use std::sync::Arc;

use arc_swap::ArcSwap;
use driftlock_core::{
    AppStatus, Application, LiveObject, ObjectId, SyncMode, SyncPolicy, SyncState, SyncTrigger,
};
use driftlock_diff::{DiffContext, DiffReport, diff};
use time::OffsetDateTime;
use tokio::sync::{RwLock, mpsc, watch};
use tracing::{debug, info, warn};

use crate::deps::EngineDeps;
use crate::error::Result;

/// What happened to a trigger request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The trigger was queued and will run a sync.
    Queued,
    /// A sync (plus one follow-up) is already pending; the trigger
    /// collapsed into it.
    Coalesced,
}

/// One application's loop state. The loop task holds an `Arc` to this;
/// the registry holds another for status queries and triggers.
pub(crate) struct AppLoop {
    app: RwLock<Application>,
    status: ArcSwap<AppStatus>,
    cancel_tx: watch::Sender<bool>,
    deps: Arc<EngineDeps>,
}

impl AppLoop {
    pub(crate) fn new(app: Application, deps: Arc<EngineDeps>) -> Arc<Self> {
        let (cancel_tx, _) = watch::channel(false);
        Arc::new(Self {
            app: RwLock::new(app),
            status: ArcSwap::from_pointee(AppStatus::default()),
            cancel_tx,
            deps,
        })
    }

    /// Current status snapshot.
    pub(crate) fn status(&self) -> AppStatus {
        (**self.status.load()).clone()
    }

    /// The application definition.
    pub(crate) async fn application(&self) -> Application {
        self.app.read().await.clone()
    }

    /// Stops issuing new sync operations; in-flight calls finish.
    pub(crate) fn cancel_sync(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// The loop: a fixed-interval ticker, the trigger channel, and the
    /// shutdown signal. Reconciliation runs inline, so within one
    /// application everything is serialized; triggers arriving mid-tick
    /// sit in the capacity-1 channel and collapse into one follow-up.
    pub(crate) async fn run(
        self: Arc<Self>,
        mut trigger_rx: mpsc::Receiver<SyncTrigger>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let name = self.app.read().await.name.clone();
        info!(app = %name, "reconciliation loop started");
        let mut ticker = tokio::time::interval(self.deps.settings.poll_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.reconcile(None).await,
                maybe = trigger_rx.recv() => match maybe {
                    Some(trigger) => self.reconcile(Some(trigger)).await,
                    None => break,
                },
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!(app = %name, "reconciliation loop stopped");
    }

    /// One reconciliation pass with the error boundary: failures are
    /// recorded in status, never propagated out of the loop.
    pub(crate) async fn reconcile(&self, trigger: Option<SyncTrigger>) {
        let app = self.app.read().await.clone();
        match self.tick(&app, trigger).await {
            Ok(status) => self.status.store(Arc::new(status)),
            Err(err) => {
                warn!(app = %app.name, error = %err, "reconciliation failed");
                let mut status = self.status();
                status.error = Some(err.to_string());
                status.observed_at = Some(OffsetDateTime::now_utc());
                self.status.store(Arc::new(status));
            }
        }
    }

    /// fetch + observe → diff → (policy permitting) sync → re-observe →
    /// health → status.
    async fn tick(&self, app: &Application, external: Option<SyncTrigger>) -> Result<AppStatus> {
        let deps = &self.deps;
        let (desired, observed) = tokio::join!(
            deps.fetcher.fetch(app),
            deps.observer.observe(&app.name, &app.destination)
        );
        let desired = desired?;
        let mut observed = observed?;

        let mut report = diff(
            &desired,
            &observed.objects,
            &deps.policy,
            &deps.ordering,
            &DiffContext {
                application: &app.name,
                prune: app.sync_policy.prune,
                incomplete_kinds: &observed.incomplete_kinds,
            },
        );
        debug!(
            app = %app.name,
            drift = report.has_drift(),
            actionable = report.changes.len(),
            "tick compared"
        );

        let trigger = decide_trigger(external, &report, app.sync_policy);
        let mut last_record = None;
        if let Some(trigger) = trigger {
            // Fresh cancellation scope for this sync.
            let _ = self.cancel_tx.send(false);
            let record = deps
                .sync
                .sync(app, report.changes, trigger, self.cancel_tx.subscribe())
                .await;
            deps.store.append_history(&app.name, &record).await?;
            last_record = Some(record);

            // Re-observe the result and re-compare for status.
            observed = deps.observer.observe(&app.name, &app.destination).await?;
            report = diff(
                &desired,
                &observed.objects,
                &deps.policy,
                &deps.ordering,
                &DiffContext {
                    application: &app.name,
                    prune: app.sync_policy.prune,
                    incomplete_kinds: &observed.incomplete_kinds,
                },
            );
        }

        let desired_ids: Vec<ObjectId> = desired.iter().map(|o| o.id.clone()).collect();
        let owned: Vec<LiveObject> = observed
            .objects
            .iter()
            .filter(|o| o.owned_by(&app.name))
            .cloned()
            .collect();
        let (_, health) = deps.health.evaluate_all(&desired_ids, &owned);

        let mut status = AppStatus {
            sync: if report.has_drift() {
                SyncState::OutOfSync
            } else {
                SyncState::Synced
            },
            health,
            drift: report.summary(),
            orphans: report.orphans,
            incomplete_kinds: observed.incomplete_kinds,
            observed_at: Some(OffsetDateTime::now_utc()),
            last_sync_phase: None,
            last_synced_at: None,
            error: None,
        };
        match last_record {
            Some(record) => {
                status.last_sync_phase = Some(record.phase);
                status.last_synced_at = record.finished_at;
            }
            None => {
                let previous = self.status.load();
                status.last_sync_phase = previous.last_sync_phase;
                status.last_synced_at = previous.last_synced_at;
            }
        }
        Ok(status)
    }
}

/// Sync gating: an explicit trigger always syncs actionable drift;
/// automated policy syncs on its own; self-heal syncs drift found on a
/// poll tick without waiting for the next trigger. Manual policy without
/// a trigger detects and reports, nothing more.
fn decide_trigger(
    external: Option<SyncTrigger>,
    report: &DiffReport,
    policy: SyncPolicy,
) -> Option<SyncTrigger> {
    if report.changes.is_empty() {
        return None;
    }
    match external {
        Some(trigger) => Some(trigger),
        None => match policy.mode {
            SyncMode::Automated => Some(SyncTrigger::Automated),
            SyncMode::Manual if policy.self_heal => Some(SyncTrigger::SelfHeal),
            SyncMode::Manual => None,
        },
    }
}
