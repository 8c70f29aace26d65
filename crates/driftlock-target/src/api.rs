//! The target system API seam.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use driftlock_core::{DesiredObject, LiveObject, ObjectId};

use crate::error::{Result, TargetError};

/// Shared handle to a target system backend.
pub type DynTarget = Arc<dyn TargetApi>;

/// The target system contract: list/get/create/update/delete per object
/// kind, idempotent-safe under retry via resource versions.
///
/// Implementations must be thread-safe (`Send + Sync`); a single handle is
/// shared by every application loop.
#[async_trait]
pub trait TargetApi: Send + Sync {
    /// Kinds this target can hold, for observation sweeps.
    async fn known_kinds(&self) -> Result<Vec<String>>;

    /// Lists all objects of a kind, optionally scoped to a namespace.
    ///
    /// # Errors
    ///
    /// Returns `TargetError::Unreachable` (transient) or
    /// `TargetError::PermissionDenied` (fatal).
    async fn list_kind(&self, kind: &str, namespace: Option<&str>) -> Result<Vec<LiveObject>>;

    /// Reads one object. Returns `None` if it does not exist.
    async fn get(&self, id: &ObjectId) -> Result<Option<LiveObject>>;

    /// Creates an object owned by `owner`.
    ///
    /// Idempotent-safe under retry: re-creating an object this owner
    /// already holds acts as an update rather than a hard failure.
    ///
    /// # Errors
    ///
    /// Returns `TargetError::Conflict` when another owner holds the
    /// identity and `TargetError::Validation` for a rejected spec.
    async fn create(&self, object: &DesiredObject, owner: &str) -> Result<LiveObject>;

    /// Updates an existing object. When `expected_version` is provided,
    /// the update succeeds only against that resource version.
    ///
    /// # Errors
    ///
    /// Returns `TargetError::NotFound` if the object does not exist and
    /// `TargetError::Conflict` on a version mismatch.
    async fn update(
        &self,
        object: &DesiredObject,
        owner: &str,
        expected_version: Option<&str>,
    ) -> Result<LiveObject>;

    /// Deletes an object. Deleting an absent object succeeds (idempotent
    /// under retry).
    async fn delete(&self, id: &ObjectId, expected_version: Option<&str>) -> Result<()>;
}

/// Bounds a target call with a timeout. A timed-out call is a transient
/// failure eligible for retry, never a success or a silent drop.
pub async fn with_timeout<T, F>(timeout: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(TargetError::unreachable(format!(
            "{operation} timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test that TargetApi is object-safe
    fn _assert_target_object_safe(_: &dyn TargetApi) {}

    #[tokio::test]
    async fn test_with_timeout_maps_to_unreachable() {
        let err = with_timeout(Duration::from_millis(5), "list", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, TargetError>(())
        })
        .await
        .unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("list timed out"));
    }

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let value = with_timeout(Duration::from_secs(1), "get", async {
            Ok::<_, TargetError>(7)
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
    }
}
