//! In-memory store backend.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use driftlock_core::{Application, SyncRecord};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::traits::StateStore;

/// Volatile store for tests and ephemeral runs.
pub struct InMemoryStore {
    apps: DashMap<String, Application>,
    history: RwLock<HashMap<String, Vec<SyncRecord>>>,
    retention: usize,
}

impl InMemoryStore {
    /// Creates a store retaining the newest `retention` records per
    /// application.
    #[must_use]
    pub fn new(retention: usize) -> Self {
        Self {
            apps: DashMap::new(),
            history: RwLock::new(HashMap::new()),
            retention: retention.max(1),
        }
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn list_applications(&self) -> Result<Vec<Application>> {
        let mut apps: Vec<Application> = self.apps.iter().map(|e| e.value().clone()).collect();
        apps.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(apps)
    }

    async fn get_application(&self, name: &str) -> Result<Option<Application>> {
        Ok(self.apps.get(name).map(|e| e.value().clone()))
    }

    async fn put_application(&self, app: &Application) -> Result<()> {
        self.apps.insert(app.name.clone(), app.clone());
        Ok(())
    }

    async fn delete_application(&self, name: &str) -> Result<()> {
        if self.apps.remove(name).is_none() {
            return Err(StoreError::not_found(name));
        }
        self.history.write().await.remove(name);
        Ok(())
    }

    async fn append_history(&self, name: &str, record: &SyncRecord) -> Result<()> {
        let mut history = self.history.write().await;
        let records = history.entry(name.to_string()).or_default();
        records.push(record.clone());
        if records.len() > self.retention {
            let excess = records.len() - self.retention;
            records.drain(..excess);
        }
        Ok(())
    }

    async fn history(&self, name: &str, limit: usize) -> Result<Vec<SyncRecord>> {
        let history = self.history.read().await;
        let records = history.get(name).cloned().unwrap_or_default();
        let skip = records.len().saturating_sub(limit);
        Ok(records.into_iter().skip(skip).collect())
    }
}
