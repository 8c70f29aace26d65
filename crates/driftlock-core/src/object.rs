//! Object identity and the desired/live object representations.
//!
//! Every target-system object is identified by `(kind, namespace, name)`.
//! Desired objects carry the fully rendered specification; live objects
//! additionally carry the observed status, the resource version used for
//! optimistic concurrency, and the ownership marker naming the managing
//! application.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};

/// Label key identifying which application manages an object.
///
/// Ownership selection is always by this marker, never by name prefix, so
/// the engine cannot adopt unrelated objects.
pub const OWNER_LABEL: &str = "driftlock.dev/application";

/// Identity of a target-system object: `(kind, namespace, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId {
    /// The object kind (e.g., "Workload", "Namespace").
    pub kind: String,
    /// The namespace, if the kind is namespaced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// The object name.
    pub name: String,
}

impl ObjectId {
    /// Creates a namespaced object identity.
    #[must_use]
    pub fn namespaced(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    /// Creates a cluster-scoped object identity.
    #[must_use]
    pub fn cluster(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            namespace: None,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// A fully rendered object specification as produced by the fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredObject {
    /// The object identity.
    pub id: ObjectId,
    /// The fully rendered specification.
    pub manifest: Value,
}

impl DesiredObject {
    /// Parses a rendered manifest into a desired object.
    ///
    /// The manifest must carry `kind` and `metadata.name`;
    /// `metadata.namespace` falls back to `default_namespace` when absent.
    pub fn from_manifest(manifest: Value, default_namespace: Option<&str>) -> Result<Self> {
        let kind = manifest
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::missing_field("kind"))?
            .to_string();
        let metadata = manifest
            .get("metadata")
            .and_then(Value::as_object)
            .ok_or_else(|| CoreError::missing_field("metadata"))?;
        let name = metadata
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::missing_field("metadata.name"))?;
        if name.is_empty() {
            return Err(CoreError::invalid_manifest("metadata.name is empty"));
        }
        let namespace = metadata
            .get("namespace")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| default_namespace.map(str::to_string));

        let id = ObjectId {
            kind,
            namespace,
            name: name.to_string(),
        };
        Ok(Self { id, manifest })
    }

    /// Returns the ownership marker, if present in the manifest labels.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.manifest
            .pointer(&format!("/metadata/labels/{}", escaped_owner_label()))
            .and_then(Value::as_str)
    }

    /// Stamps the ownership marker into the manifest labels.
    pub fn set_owner(&mut self, application: &str) {
        if let Some(metadata) = self
            .manifest
            .get_mut("metadata")
            .and_then(Value::as_object_mut)
        {
            let labels = metadata
                .entry("labels")
                .or_insert_with(|| serde_json::json!({}));
            if let Some(labels) = labels.as_object_mut() {
                labels.insert(
                    OWNER_LABEL.to_string(),
                    Value::String(application.to_string()),
                );
            }
        }
    }
}

/// An object as currently observed in the target system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveObject {
    /// The object identity.
    pub id: ObjectId,
    /// The specification as stored in the target system.
    pub manifest: Value,
    /// The observed status reported by the target system.
    #[serde(default)]
    pub status: Value,
    /// Optimistic concurrency token.
    pub resource_version: String,
    /// The application managing this object, per the ownership marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl LiveObject {
    /// Returns true when this object is owned by the given application.
    #[must_use]
    pub fn owned_by(&self, application: &str) -> bool {
        self.owner.as_deref() == Some(application)
    }
}

// JSON pointer tokens escape "/" as "~1".
fn escaped_owner_label() -> String {
    OWNER_LABEL.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_id_display() {
        let id = ObjectId::namespaced("Workload", "prod", "api");
        assert_eq!(id.to_string(), "Workload/prod/api");

        let id = ObjectId::cluster("Namespace", "prod");
        assert_eq!(id.to_string(), "Namespace/prod");
    }

    #[test]
    fn test_from_manifest() {
        let manifest = json!({
            "kind": "Workload",
            "metadata": {"name": "api", "namespace": "prod"},
            "spec": {"replicas": 2}
        });
        let obj = DesiredObject::from_manifest(manifest, None).expect("valid manifest");
        assert_eq!(obj.id, ObjectId::namespaced("Workload", "prod", "api"));
    }

    #[test]
    fn test_from_manifest_default_namespace() {
        let manifest = json!({
            "kind": "Workload",
            "metadata": {"name": "api"}
        });
        let obj = DesiredObject::from_manifest(manifest, Some("staging")).expect("valid");
        assert_eq!(obj.id.namespace.as_deref(), Some("staging"));
    }

    #[test]
    fn test_from_manifest_missing_name() {
        let manifest = json!({"kind": "Workload", "metadata": {}});
        let err = DesiredObject::from_manifest(manifest, None).unwrap_err();
        assert!(err.to_string().contains("metadata.name"));
    }

    #[test]
    fn test_owner_roundtrip() {
        let manifest = json!({
            "kind": "Workload",
            "metadata": {"name": "api", "namespace": "prod"}
        });
        let mut obj = DesiredObject::from_manifest(manifest, None).unwrap();
        assert_eq!(obj.owner(), None);

        obj.set_owner("shop");
        assert_eq!(obj.owner(), Some("shop"));
        assert_eq!(
            obj.manifest["metadata"]["labels"][OWNER_LABEL],
            json!("shop")
        );
    }

    #[test]
    fn test_live_object_ownership() {
        let live = LiveObject {
            id: ObjectId::namespaced("Workload", "prod", "api"),
            manifest: json!({}),
            status: json!({}),
            resource_version: "3".into(),
            owner: Some("shop".into()),
        };
        assert!(live.owned_by("shop"));
        assert!(!live.owned_by("other"));
    }
}
