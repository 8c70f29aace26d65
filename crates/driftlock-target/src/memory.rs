//! In-memory target backend with fault injection.
//!
//! Backs tests and local runs. Fault injection covers the failure modes
//! the engine must tolerate: per-kind listing failures, transient write
//! windows, permission denial, and per-object validation rejection.

use std::collections::{BTreeSet, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use driftlock_core::{DesiredObject, LiveObject, ObjectId};
use serde_json::Value;

use crate::api::TargetApi;
use crate::error::{Result, TargetError};

#[derive(Debug, Clone)]
struct StoredObject {
    manifest: Value,
    status: Value,
    resource_version: String,
    owner: Option<String>,
}

#[derive(Default)]
struct Faults {
    fail_list_kinds: Mutex<HashSet<String>>,
    transient_writes: AtomicU32,
    deny_all: AtomicBool,
    reject_objects: Mutex<HashSet<ObjectId>>,
}

/// In-memory target system.
pub struct InMemoryTarget {
    objects: DashMap<ObjectId, StoredObject>,
    kinds: Mutex<BTreeSet<String>>,
    version_counter: AtomicU64,
    writes: AtomicU64,
    faults: Faults,
}

impl InMemoryTarget {
    /// Creates an empty target with the built-in kinds registered.
    #[must_use]
    pub fn new() -> Self {
        let kinds: BTreeSet<String> = ["Namespace", "Workload", "ConfigMap", "Job"]
            .into_iter()
            .map(String::from)
            .collect();
        Self {
            objects: DashMap::new(),
            kinds: Mutex::new(kinds),
            version_counter: AtomicU64::new(1),
            writes: AtomicU64::new(0),
            faults: Faults::default(),
        }
    }

    fn next_version(&self) -> String {
        self.version_counter
            .fetch_add(1, Ordering::SeqCst)
            .to_string()
    }

    fn register_kind(&self, kind: &str) {
        self.kinds
            .lock()
            .expect("kinds lock")
            .insert(kind.to_string());
    }

    fn to_live(id: &ObjectId, stored: &StoredObject) -> LiveObject {
        LiveObject {
            id: id.clone(),
            manifest: stored.manifest.clone(),
            status: stored.status.clone(),
            resource_version: stored.resource_version.clone(),
            owner: stored.owner.clone(),
        }
    }

    fn check_write_faults(&self, id: &ObjectId, operation: &str) -> Result<()> {
        if self.faults.deny_all.load(Ordering::SeqCst) {
            return Err(TargetError::permission_denied(operation));
        }
        let budget = &self.faults.transient_writes;
        if budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(TargetError::unreachable("injected transient failure"));
        }
        if self
            .faults
            .reject_objects
            .lock()
            .expect("faults lock")
            .contains(id)
        {
            return Err(TargetError::validation(id.clone(), "rejected by target"));
        }
        Ok(())
    }

    // ==================== Seeding and inspection ====================

    /// Inserts an object directly, bypassing fault injection. Used to
    /// seed live state in tests and local runs.
    pub fn seed(&self, manifest: Value, owner: Option<&str>) -> LiveObject {
        let object = DesiredObject::from_manifest(manifest, None).expect("seed manifest");
        self.register_kind(&object.id.kind);
        let stored = StoredObject {
            manifest: object.manifest,
            status: Value::Object(serde_json::Map::new()),
            resource_version: self.next_version(),
            owner: owner.map(String::from),
        };
        let live = Self::to_live(&object.id, &stored);
        self.objects.insert(object.id, stored);
        live
    }

    /// Overwrites the observed status of an object.
    pub fn set_status(&self, id: &ObjectId, status: Value) {
        if let Some(mut entry) = self.objects.get_mut(id) {
            entry.status = status;
        }
    }

    /// Removes an object directly (simulates out-of-band deletion).
    pub fn remove(&self, id: &ObjectId) {
        self.objects.remove(id);
    }

    /// Number of write calls (create/update/delete) attempted so far.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    // ==================== Fault injection ====================

    /// Makes listings of `kind` fail with `Unreachable`.
    pub fn fail_list_kind(&self, kind: &str) {
        self.faults
            .fail_list_kinds
            .lock()
            .expect("faults lock")
            .insert(kind.to_string());
    }

    /// Makes the next `n` write calls fail with `Unreachable`.
    pub fn fail_next_writes(&self, n: u32) {
        self.faults.transient_writes.store(n, Ordering::SeqCst);
    }

    /// Denies every call with `PermissionDenied`.
    pub fn deny_all(&self, denied: bool) {
        self.faults.deny_all.store(denied, Ordering::SeqCst);
    }

    /// Makes writes touching `id` fail with `Validation`.
    pub fn reject_object(&self, id: ObjectId) {
        self.faults
            .reject_objects
            .lock()
            .expect("faults lock")
            .insert(id);
    }
}

impl Default for InMemoryTarget {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TargetApi for InMemoryTarget {
    async fn known_kinds(&self) -> Result<Vec<String>> {
        if self.faults.deny_all.load(Ordering::SeqCst) {
            return Err(TargetError::permission_denied("known_kinds"));
        }
        Ok(self.kinds.lock().expect("kinds lock").iter().cloned().collect())
    }

    async fn list_kind(&self, kind: &str, namespace: Option<&str>) -> Result<Vec<LiveObject>> {
        if self.faults.deny_all.load(Ordering::SeqCst) {
            return Err(TargetError::permission_denied(format!("list {kind}")));
        }
        if self
            .faults
            .fail_list_kinds
            .lock()
            .expect("faults lock")
            .contains(kind)
        {
            return Err(TargetError::unreachable(format!(
                "injected list failure for {kind}"
            )));
        }

        let mut result: Vec<LiveObject> = self
            .objects
            .iter()
            .filter(|entry| entry.key().kind == kind)
            .filter(|entry| namespace.is_none() || entry.key().namespace.as_deref() == namespace)
            .map(|entry| Self::to_live(entry.key(), entry.value()))
            .collect();
        result.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(result)
    }

    async fn get(&self, id: &ObjectId) -> Result<Option<LiveObject>> {
        if self.faults.deny_all.load(Ordering::SeqCst) {
            return Err(TargetError::permission_denied(format!("get {id}")));
        }
        Ok(self.objects.get(id).map(|e| Self::to_live(id, e.value())))
    }

    async fn create(&self, object: &DesiredObject, owner: &str) -> Result<LiveObject> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_write_faults(&object.id, "create")?;

        if let Some(existing) = self.objects.get(&object.id) {
            // Retried create of our own object acts as an update.
            if existing.owner.as_deref() == Some(owner) {
                let version = existing.resource_version.clone();
                drop(existing);
                return self.update(object, owner, Some(&version)).await;
            }
            return Err(TargetError::conflict(
                object.id.clone(),
                "none",
                existing.resource_version.clone(),
            ));
        }

        self.register_kind(&object.id.kind);
        let stored = StoredObject {
            manifest: object.manifest.clone(),
            status: Value::Object(serde_json::Map::new()),
            resource_version: self.next_version(),
            owner: Some(owner.to_string()),
        };
        let live = Self::to_live(&object.id, &stored);
        self.objects.insert(object.id.clone(), stored);
        Ok(live)
    }

    async fn update(
        &self,
        object: &DesiredObject,
        owner: &str,
        expected_version: Option<&str>,
    ) -> Result<LiveObject> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_write_faults(&object.id, "update")?;

        let Some(mut entry) = self.objects.get_mut(&object.id) else {
            return Err(TargetError::not_found(object.id.clone()));
        };
        if let Some(expected) = expected_version
            && expected != entry.resource_version
        {
            return Err(TargetError::conflict(
                object.id.clone(),
                expected,
                entry.resource_version.clone(),
            ));
        }

        entry.manifest = object.manifest.clone();
        entry.owner = Some(owner.to_string());
        entry.resource_version = self.next_version();
        Ok(Self::to_live(&object.id, entry.value()))
    }

    async fn delete(&self, id: &ObjectId, expected_version: Option<&str>) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_write_faults(id, "delete")?;

        if let Some(entry) = self.objects.get(id) {
            if let Some(expected) = expected_version
                && expected != entry.resource_version
            {
                return Err(TargetError::conflict(
                    id.clone(),
                    expected,
                    entry.resource_version.clone(),
                ));
            }
        } else {
            // Deleting an absent object is a success under retry.
            return Ok(());
        }
        self.objects.remove(id);
        Ok(())
    }
}
