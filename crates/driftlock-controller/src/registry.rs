//! The process-wide application registry.
//!
//! Explicit lifecycle: `start` loads persisted applications and spawns
//! their loops; `shutdown` signals every loop and drains in-flight work.
//! The registry is passed by handle to whoever needs it (the HTTP
//! surface), never reached through a singleton.

use std::sync::Arc;

use dashmap::DashMap;
use driftlock_core::{
    AppStatus, Application, DeletionPolicy, SyncRecord, SyncTrigger, validate_name,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::controller::{AppLoop, TriggerOutcome};
use crate::deps::EngineDeps;
use crate::error::{ControllerError, Result};

struct AppEntry {
    app_loop: Arc<AppLoop>,
    trigger_tx: mpsc::Sender<SyncTrigger>,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

/// Registry of tracked applications and their running loops.
pub struct ControllerRegistry {
    deps: Arc<EngineDeps>,
    apps: DashMap<String, AppEntry>,
}

impl ControllerRegistry {
    /// Creates an empty registry over the assembled engine.
    #[must_use]
    pub fn new(deps: Arc<EngineDeps>) -> Self {
        Self {
            deps,
            apps: DashMap::new(),
        }
    }

    /// Loads persisted applications from the store and spawns a loop for
    /// each. Returns how many were resumed.
    pub async fn start(&self) -> Result<usize> {
        let apps = self.deps.store.list_applications().await?;
        let count = apps.len();
        for app in apps {
            self.spawn(app);
        }
        info!(applications = count, "controller registry started");
        Ok(count)
    }

    fn spawn(&self, app: Application) {
        let name = app.name.clone();
        let app_loop = AppLoop::new(app, self.deps.clone());
        // Capacity 1: a trigger arriving mid-sync schedules exactly one
        // follow-up; further triggers coalesce.
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(app_loop.clone().run(trigger_rx, shutdown_rx));

        self.apps.insert(
            name,
            AppEntry {
                app_loop,
                trigger_tx,
                shutdown_tx,
                join,
            },
        );
    }

    /// Declares a new application: persists it and starts its loop.
    pub async fn create_application(&self, app: Application) -> Result<()> {
        validate_name(&app.name)?;
        if self.apps.contains_key(&app.name) {
            return Err(ControllerError::already_exists(&app.name));
        }
        self.deps.store.put_application(&app).await?;
        info!(app = %app.name, source = %app.source, "application declared");
        self.spawn(app);
        Ok(())
    }

    /// Deletes an application. `Cascade` deletes every owned live object
    /// first; `Orphan` leaves deployed objects in place.
    pub async fn delete_application(&self, name: &str, policy: DeletionPolicy) -> Result<()> {
        let (_, entry) = self
            .apps
            .remove(name)
            .ok_or_else(|| ControllerError::unknown_application(name))?;

        // Stop the loop: cancel any in-flight sync (in-flight target
        // calls finish), then signal shutdown and drain.
        entry.app_loop.cancel_sync();
        let _ = entry.shutdown_tx.send(true);
        if let Err(err) = entry.join.await {
            error!(app = name, error = %err, "application loop panicked");
        }

        if policy == DeletionPolicy::Cascade {
            let app = entry.app_loop.application().await;
            match self.deps.observer.observe(name, &app.destination).await {
                Ok(observed) => {
                    for object in observed.objects.iter().filter(|o| o.owned_by(name)) {
                        if let Err(err) = self.deps.target.delete(&object.id, None).await {
                            warn!(app = name, object = %object.id, error = %err, "cascade delete failed");
                        }
                    }
                }
                Err(err) => {
                    warn!(app = name, error = %err, "cascade observation failed; objects orphaned");
                }
            }
        }

        self.deps.store.delete_application(name).await?;
        info!(app = name, policy = ?policy, "application deleted");
        Ok(())
    }

    /// Requests a manual sync. At most one sync per application runs at
    /// a time; triggers arriving mid-sync coalesce into one follow-up.
    pub fn trigger_sync(&self, name: &str) -> Result<TriggerOutcome> {
        let entry = self
            .apps
            .get(name)
            .ok_or_else(|| ControllerError::unknown_application(name))?;
        match entry.trigger_tx.try_send(SyncTrigger::Manual) {
            Ok(()) => Ok(TriggerOutcome::Queued),
            Err(mpsc::error::TrySendError::Full(_)) => Ok(TriggerOutcome::Coalesced),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(ControllerError::unknown_application(name))
            }
        }
    }

    /// Current status snapshot for one application.
    pub fn status(&self, name: &str) -> Result<AppStatus> {
        self.apps
            .get(name)
            .map(|entry| entry.app_loop.status())
            .ok_or_else(|| ControllerError::unknown_application(name))
    }

    /// The application definition plus its status.
    pub async fn get(&self, name: &str) -> Result<(Application, AppStatus)> {
        // Clone the handle out so no map lock is held across an await.
        let app_loop = self
            .apps
            .get(name)
            .map(|entry| entry.app_loop.clone())
            .ok_or_else(|| ControllerError::unknown_application(name))?;
        Ok((app_loop.application().await, app_loop.status()))
    }

    /// Every tracked application with its status, sorted by name.
    pub async fn list(&self) -> Vec<(Application, AppStatus)> {
        let loops: Vec<Arc<AppLoop>> = self
            .apps
            .iter()
            .map(|entry| entry.value().app_loop.clone())
            .collect();
        let mut result = Vec::with_capacity(loops.len());
        for app_loop in loops {
            result.push((app_loop.application().await, app_loop.status()));
        }
        result.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        result
    }

    /// Recent sync history for one application, oldest first.
    pub async fn history(&self, name: &str, limit: usize) -> Result<Vec<SyncRecord>> {
        if !self.apps.contains_key(name) {
            return Err(ControllerError::unknown_application(name));
        }
        Ok(self.deps.store.history(name, limit).await?)
    }

    /// Signals every loop and drains in-flight syncs.
    pub async fn shutdown(&self) {
        let names: Vec<String> = self.apps.iter().map(|e| e.key().clone()).collect();
        for name in names {
            if let Some((_, entry)) = self.apps.remove(&name) {
                let _ = entry.shutdown_tx.send(true);
                if let Err(err) = entry.join.await {
                    error!(app = %name, error = %err, "application loop panicked");
                }
            }
        }
        info!("controller registry stopped");
    }
}
