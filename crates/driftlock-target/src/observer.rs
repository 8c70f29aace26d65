//! Live-state observation with per-kind partial tolerance.

use std::time::Duration;

use driftlock_core::{Destination, LiveObject};
use tracing::{debug, warn};

use crate::api::{DynTarget, with_timeout};
use crate::error::{Result, TargetError};

/// Snapshot of the live state within an application's scope.
#[derive(Debug, Clone, Default)]
pub struct ObservedState {
    /// Observed objects, sorted by identity.
    pub objects: Vec<LiveObject>,
    /// Kinds whose listing failed this sweep; their objects are absent
    /// from `objects` and must not be treated as deleted.
    pub incomplete_kinds: Vec<String>,
}

impl ObservedState {
    /// True when every kind listed successfully.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.incomplete_kinds.is_empty()
    }
}

/// Queries the target for the current state of every object in an
/// application's scope.
///
/// Scope is ownership-marker-based for anything the application manages,
/// plus namespace visibility into the destination namespace so unowned
/// collisions can be reported (never acted on).
pub struct Observer {
    target: DynTarget,
    timeout: Duration,
}

impl Observer {
    /// Creates an observer over a target handle with a per-call timeout.
    #[must_use]
    pub fn new(target: DynTarget, timeout: Duration) -> Self {
        Self { target, timeout }
    }

    /// Observes the live state for `application` at `destination`.
    ///
    /// One kind's listing failure does not fail the sweep: the kind is
    /// flagged incomplete and the remaining kinds still return. A
    /// permission denial fails the whole observation.
    pub async fn observe(
        &self,
        application: &str,
        destination: &Destination,
    ) -> Result<ObservedState> {
        let kinds = with_timeout(self.timeout, "known_kinds", self.target.known_kinds()).await?;

        let mut state = ObservedState::default();
        for kind in kinds {
            let listing = with_timeout(
                self.timeout,
                "list",
                self.target.list_kind(&kind, None),
            )
            .await;
            match listing {
                Ok(objects) => {
                    state.objects.extend(
                        objects
                            .into_iter()
                            .filter(|obj| in_scope(obj, application, destination)),
                    );
                }
                Err(err) if err.is_permission() => return Err(err),
                Err(err) if err.is_transient() => {
                    warn!(kind = %kind, error = %err, "kind listing incomplete");
                    state.incomplete_kinds.push(kind);
                }
                Err(err) => return Err(TargetError::internal(err.to_string())),
            }
        }

        state.objects.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(
            app = %application,
            objects = state.objects.len(),
            incomplete = state.incomplete_kinds.len(),
            "live state observed"
        );
        Ok(state)
    }
}

/// Ownership decides what the engine may act on; destination-namespace
/// visibility lets unowned collisions be reported as advisory.
fn in_scope(object: &LiveObject, application: &str, destination: &Destination) -> bool {
    if object.owned_by(application) {
        return true;
    }
    match (&object.id.namespace, &destination.namespace) {
        (Some(ns), Some(dest)) => ns == dest,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryTarget;
    use serde_json::json;
    use std::sync::Arc;

    fn destination() -> Destination {
        Destination {
            endpoint: "memory://local".into(),
            namespace: Some("prod".into()),
        }
    }

    fn manifest(kind: &str, ns: Option<&str>, name: &str) -> serde_json::Value {
        match ns {
            Some(ns) => json!({"kind": kind, "metadata": {"name": name, "namespace": ns}}),
            None => json!({"kind": kind, "metadata": {"name": name}}),
        }
    }

    #[tokio::test]
    async fn test_observe_selects_by_owner_and_namespace() {
        let target = Arc::new(InMemoryTarget::new());
        target.seed(manifest("Workload", Some("prod"), "api"), Some("shop"));
        target.seed(manifest("Workload", Some("prod"), "legacy"), None);
        target.seed(manifest("Workload", Some("dev"), "other"), Some("other-app"));
        target.seed(manifest("Namespace", None, "prod"), Some("shop"));

        let observer = Observer::new(target, Duration::from_secs(1));
        let state = observer.observe("shop", &destination()).await.unwrap();

        let names: Vec<_> = state.objects.iter().map(|o| o.id.name.clone()).collect();
        // Owned objects (api, prod namespace object) plus the unowned
        // in-namespace collision (legacy); the dev object is out of scope.
        assert_eq!(names, vec!["prod", "api", "legacy"]);
        assert!(state.is_complete());
    }

    #[tokio::test]
    async fn test_observe_tolerates_partial_listing_failure() {
        let target = Arc::new(InMemoryTarget::new());
        target.seed(manifest("Workload", Some("prod"), "api"), Some("shop"));
        target.seed(manifest("ConfigMap", Some("prod"), "db"), Some("shop"));
        target.fail_list_kind("Workload");

        let observer = Observer::new(target, Duration::from_secs(1));
        let state = observer.observe("shop", &destination()).await.unwrap();

        assert_eq!(state.incomplete_kinds, vec!["Workload".to_string()]);
        assert_eq!(state.objects.len(), 1);
        assert_eq!(state.objects[0].id.kind, "ConfigMap");
    }

    #[tokio::test]
    async fn test_observe_permission_denied_is_fatal() {
        let target = Arc::new(InMemoryTarget::new());
        target.deny_all(true);

        let observer = Observer::new(target, Duration::from_secs(1));
        let err = observer.observe("shop", &destination()).await.unwrap_err();
        assert!(err.is_permission());
    }
}
