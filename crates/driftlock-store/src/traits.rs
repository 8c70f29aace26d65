//! The state store trait.

use std::sync::Arc;

use async_trait::async_trait;
use driftlock_core::{Application, SyncRecord};

use crate::error::Result;

/// Shared handle to a state store backend.
pub type DynStore = Arc<dyn StateStore>;

/// Durable storage for application definitions and sync history.
///
/// Implementations must be thread-safe (`Send + Sync`). History is
/// append-only and ordering-preserving; retention is bounded with the
/// oldest records evicted first.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Lists every stored application.
    async fn list_applications(&self) -> Result<Vec<Application>>;

    /// Reads one application. Returns `None` if it does not exist.
    async fn get_application(&self, name: &str) -> Result<Option<Application>>;

    /// Creates or replaces an application definition.
    async fn put_application(&self, app: &Application) -> Result<()>;

    /// Deletes an application and its history.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the application does not exist.
    async fn delete_application(&self, name: &str) -> Result<()>;

    /// Appends a sync record to an application's history.
    async fn append_history(&self, name: &str, record: &SyncRecord) -> Result<()>;

    /// Returns up to `limit` of the newest history records, oldest first.
    async fn history(&self, name: &str, limit: usize) -> Result<Vec<SyncRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test that StateStore is object-safe
    fn _assert_store_object_safe(_: &dyn StateStore) {}
}
