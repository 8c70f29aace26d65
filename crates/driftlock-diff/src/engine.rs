//! The diff engine: desired vs. live, field by field.

use driftlock_core::{DesiredObject, DriftSummary, LiveObject, ObjectId, OpAction};
use indexmap::IndexMap;
use json_patch::PatchOperation;
use serde_json::Value;
use tracing::warn;

use crate::ordering::KindOrdering;
use crate::policy::ComparisonPolicy;

/// One field-level change inside a Modify diff.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    /// JSON pointer into the object document.
    pub path: String,
    /// The live value, absent for additions.
    pub before: Option<Value>,
    /// The desired value, absent for removals.
    pub after: Option<Value>,
}

/// A typed difference between desired and live state.
#[derive(Debug, Clone)]
pub enum Diff {
    /// Desired object absent from live state.
    Add(DesiredObject),
    /// Owned live object absent from desired state (prune enabled).
    Remove(LiveObject),
    /// Object present on both sides with differing fields.
    Modify {
        /// The desired specification.
        desired: DesiredObject,
        /// The live object being updated.
        live: LiveObject,
        /// Field-level changes, live → desired.
        changes: Vec<FieldChange>,
    },
}

impl Diff {
    /// Identity of the object this diff targets.
    #[must_use]
    pub fn id(&self) -> &ObjectId {
        match self {
            Self::Add(desired) => &desired.id,
            Self::Remove(live) => &live.id,
            Self::Modify { desired, .. } => &desired.id,
        }
    }

    /// The write this diff requires.
    #[must_use]
    pub fn action(&self) -> OpAction {
        match self {
            Self::Add(_) => OpAction::Create,
            Self::Remove(_) => OpAction::Delete,
            Self::Modify { .. } => OpAction::Update,
        }
    }
}

/// Inputs qualifying a comparison.
#[derive(Debug, Clone)]
pub struct DiffContext<'a> {
    /// The application whose ownership marker gates Removes.
    pub application: &'a str,
    /// Whether Remove diffs are actionable.
    pub prune: bool,
    /// Kinds whose live listing was incomplete this tick; no Remove is
    /// ever generated for them.
    pub incomplete_kinds: &'a [String],
}

/// Ordered diff output plus the advisory findings that are reported but
/// never acted on.
#[derive(Debug, Clone, Default)]
pub struct DiffReport {
    /// Actionable diffs in dependency order.
    pub changes: Vec<Diff>,
    /// Live-only objects not owned by the application.
    pub orphans: Vec<ObjectId>,
    /// Owned live-only objects withheld because prune is disabled.
    pub advisory_removes: Vec<ObjectId>,
}

impl DiffReport {
    /// True when desired and live state match and nothing was withheld.
    #[must_use]
    pub fn has_drift(&self) -> bool {
        !self.changes.is_empty() || !self.advisory_removes.is_empty()
    }

    /// Drift counts for status reporting. Withheld removes count as
    /// drift even though they are not actionable.
    #[must_use]
    pub fn summary(&self) -> DriftSummary {
        let mut summary = DriftSummary::default();
        for change in &self.changes {
            match change {
                Diff::Add(_) => summary.adds += 1,
                Diff::Remove(_) => summary.removes += 1,
                Diff::Modify { .. } => summary.modifies += 1,
            }
        }
        summary.removes += self.advisory_removes.len();
        summary
    }
}

/// Compares desired and live object sets under a comparison policy.
///
/// Objects present on both sides resolve to Modify (this also covers the
/// rename race where one identity would otherwise surface as Add plus
/// Remove). Live-only objects become Remove only when owned by the
/// application, their kind listed completely, and prune is enabled.
#[must_use]
pub fn diff(
    desired: &[DesiredObject],
    live: &[LiveObject],
    policy: &ComparisonPolicy,
    ordering: &KindOrdering,
    ctx: &DiffContext<'_>,
) -> DiffReport {
    let mut desired_by_id: IndexMap<ObjectId, &DesiredObject> = IndexMap::new();
    for object in desired {
        if desired_by_id.insert(object.id.clone(), object).is_some() {
            warn!(object = %object.id, "duplicate desired object, last rendering wins");
        }
    }
    let live_by_id: IndexMap<ObjectId, &LiveObject> =
        live.iter().map(|obj| (obj.id.clone(), obj)).collect();

    let mut upserts: Vec<Diff> = Vec::new();
    let mut removes: Vec<Diff> = Vec::new();
    let mut report = DiffReport::default();

    for (id, desired_obj) in &desired_by_id {
        match live_by_id.get(id) {
            Some(live_obj) => {
                let desired_norm = policy.normalized(&id.kind, &desired_obj.manifest);
                let live_norm = policy.normalized(&id.kind, &live_obj.manifest);
                if desired_norm != live_norm {
                    let changes = field_changes(&live_norm, &desired_norm);
                    upserts.push(Diff::Modify {
                        desired: (*desired_obj).clone(),
                        live: (*live_obj).clone(),
                        changes,
                    });
                }
            }
            None => upserts.push(Diff::Add((*desired_obj).clone())),
        }
    }

    for (id, live_obj) in &live_by_id {
        if desired_by_id.contains_key(id) {
            continue;
        }
        if !live_obj.owned_by(ctx.application) {
            report.orphans.push(id.clone());
            continue;
        }
        if ctx.incomplete_kinds.iter().any(|k| k == &id.kind) {
            // Never delete on partial knowledge.
            continue;
        }
        if ctx.prune {
            removes.push(Diff::Remove((*live_obj).clone()));
        } else {
            report.advisory_removes.push(id.clone());
        }
    }

    // Dependency order: prerequisites first for upserts, inverse for
    // removes (dependents deleted before what they depend on).
    upserts.sort_by(|a, b| {
        (ordering.weight(&a.id().kind), a.id()).cmp(&(ordering.weight(&b.id().kind), b.id()))
    });
    removes.sort_by(|a, b| {
        (-ordering.weight(&a.id().kind), a.id()).cmp(&(-ordering.weight(&b.id().kind), b.id()))
    });

    report.changes = upserts;
    report.changes.append(&mut removes);
    report.orphans.sort();
    report.advisory_removes.sort();
    report
}

/// Field-level changes between two normalized documents, live → desired.
fn field_changes(live: &Value, desired: &Value) -> Vec<FieldChange> {
    json_patch::diff(live, desired)
        .0
        .into_iter()
        .filter_map(|op| match op {
            PatchOperation::Add(add) => Some(FieldChange {
                path: add.path.to_string(),
                before: None,
                after: Some(add.value),
            }),
            PatchOperation::Remove(remove) => {
                let path = remove.path.to_string();
                Some(FieldChange {
                    before: live.pointer(&path).cloned(),
                    path,
                    after: None,
                })
            }
            PatchOperation::Replace(replace) => {
                let path = replace.path.to_string();
                Some(FieldChange {
                    before: live.pointer(&path).cloned(),
                    path,
                    after: Some(replace.value),
                })
            }
            // diff() emits only add/remove/replace.
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::KIND_DEFINITION;
    use serde_json::json;

    fn desired(kind: &str, ns: Option<&str>, name: &str, spec: Value) -> DesiredObject {
        let metadata = match ns {
            Some(ns) => json!({"name": name, "namespace": ns}),
            None => json!({"name": name}),
        };
        DesiredObject::from_manifest(json!({"kind": kind, "metadata": metadata, "spec": spec}), None)
            .unwrap()
    }

    fn live_from(desired_obj: &DesiredObject, owner: Option<&str>) -> LiveObject {
        LiveObject {
            id: desired_obj.id.clone(),
            manifest: desired_obj.manifest.clone(),
            status: json!({}),
            resource_version: "1".into(),
            owner: owner.map(String::from),
        }
    }

    fn ctx(prune: bool) -> DiffContext<'static> {
        DiffContext {
            application: "shop",
            prune,
            incomplete_kinds: &[],
        }
    }

    fn run(desired: &[DesiredObject], live: &[LiveObject], context: &DiffContext<'_>) -> DiffReport {
        diff(
            desired,
            live,
            &ComparisonPolicy::new(),
            &KindOrdering::new(),
            context,
        )
    }

    #[test]
    fn test_converged_state_is_empty() {
        let d = desired("Workload", Some("prod"), "api", json!({"replicas": 2}));
        let l = live_from(&d, Some("shop"));
        let report = run(&[d], &[l], &ctx(true));
        assert!(!report.has_drift());
        assert!(report.summary().is_empty());
    }

    #[test]
    fn test_modify_only_with_unowned_sibling() {
        // desired = {A: replicas=2}, live = {A: replicas=1, B unowned},
        // prune=true: exactly Modify(A); B untouched.
        let a_desired = desired("Workload", Some("prod"), "a", json!({"replicas": 2}));
        let a_live = LiveObject {
            manifest: json!({
                "kind": "Workload",
                "metadata": {"name": "a", "namespace": "prod"},
                "spec": {"replicas": 1}
            }),
            ..live_from(&a_desired, Some("shop"))
        };
        let b_live = live_from(
            &desired("Workload", Some("prod"), "b", json!({})),
            None,
        );

        let report = run(&[a_desired], &[a_live, b_live.clone()], &ctx(true));
        assert_eq!(report.changes.len(), 1);
        match &report.changes[0] {
            Diff::Modify { desired, changes, .. } => {
                assert_eq!(desired.id.name, "a");
                assert_eq!(changes.len(), 1);
                assert_eq!(changes[0].path, "/spec/replicas");
                assert_eq!(changes[0].before, Some(json!(1)));
                assert_eq!(changes[0].after, Some(json!(2)));
            }
            other => panic!("expected Modify, got {other:?}"),
        }
        assert_eq!(report.orphans, vec![b_live.id]);
    }

    #[test]
    fn test_unowned_objects_never_removed() {
        // No Remove regardless of prune policy when the marker mismatches.
        let stray = live_from(
            &desired("Workload", Some("prod"), "stray", json!({})),
            Some("other-app"),
        );
        for prune in [true, false] {
            let report = run(&[], &[stray.clone()], &ctx(prune));
            assert!(report.changes.is_empty());
            assert_eq!(report.orphans, vec![stray.id.clone()]);
        }
    }

    #[test]
    fn test_prune_disabled_reports_advisory() {
        let owned = live_from(
            &desired("Workload", Some("prod"), "old", json!({})),
            Some("shop"),
        );
        let report = run(&[], &[owned.clone()], &ctx(false));
        assert!(report.changes.is_empty());
        assert_eq!(report.advisory_removes, vec![owned.id]);
        assert!(report.has_drift());
        assert_eq!(report.summary().removes, 1);
    }

    #[test]
    fn test_prune_enabled_removes_owned() {
        let owned = live_from(
            &desired("Workload", Some("prod"), "old", json!({})),
            Some("shop"),
        );
        let report = run(&[], &[owned], &ctx(true));
        assert_eq!(report.changes.len(), 1);
        assert!(matches!(report.changes[0], Diff::Remove(_)));
    }

    #[test]
    fn test_incomplete_kind_suppresses_remove() {
        let owned = live_from(
            &desired("Workload", Some("prod"), "old", json!({})),
            Some("shop"),
        );
        let incomplete = vec!["Workload".to_string()];
        let context = DiffContext {
            application: "shop",
            prune: true,
            incomplete_kinds: &incomplete,
        };
        let report = run(&[], &[owned], &context);
        assert!(report.changes.is_empty());
        assert!(report.advisory_removes.is_empty());
    }

    #[test]
    fn test_same_identity_resolves_to_modify_not_add_remove() {
        let new = desired("Workload", Some("prod"), "api", json!({"image": "v2"}));
        let old = LiveObject {
            manifest: json!({
                "kind": "Workload",
                "metadata": {"name": "api", "namespace": "prod"},
                "spec": {"image": "v1"}
            }),
            ..live_from(&new, Some("shop"))
        };
        let report = run(&[new], &[old], &ctx(true));
        assert_eq!(report.changes.len(), 1);
        assert!(matches!(report.changes[0], Diff::Modify { .. }));
    }

    #[test]
    fn test_dependency_ordering() {
        let workload = desired("Workload", Some("prod"), "api", json!({}));
        let ns = desired("Namespace", None, "prod", json!({}));
        let definition = desired(KIND_DEFINITION, None, "Queue", json!({}));
        let queue = desired("Queue", Some("prod"), "orders", json!({}));

        let report = run(
            &[queue, workload, definition, ns],
            &[],
            &ctx(true),
        );
        let kinds: Vec<&str> = report
            .changes
            .iter()
            .map(|c| c.id().kind.as_str())
            .collect();
        assert_eq!(kinds, vec!["Namespace", KIND_DEFINITION, "Workload", "Queue"]);
    }

    #[test]
    fn test_removes_ordered_inverse_and_after_upserts() {
        let add_cm = desired("ConfigMap", Some("prod"), "settings", json!({}));
        let old_ns = live_from(&desired("Namespace", None, "legacy", json!({})), Some("shop"));
        let old_workload = live_from(
            &desired("Workload", Some("legacy"), "api", json!({})),
            Some("shop"),
        );

        let report = run(&[add_cm], &[old_ns, old_workload], &ctx(true));
        let order: Vec<_> = report
            .changes
            .iter()
            .map(|c| (c.action(), c.id().kind.clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                (OpAction::Create, "ConfigMap".to_string()),
                (OpAction::Delete, "Workload".to_string()),
                (OpAction::Delete, "Namespace".to_string()),
            ]
        );
    }

    #[test]
    fn test_policy_excludes_server_defaults() {
        let d = desired("Workload", Some("prod"), "api", json!({"replicas": 2}));
        let mut live_manifest = d.manifest.clone();
        live_manifest["metadata"]["creationTimestamp"] = json!("2026-01-01T00:00:00Z");
        live_manifest["spec"]["nodePort"] = json!(30123);
        let l = LiveObject {
            manifest: live_manifest,
            ..live_from(&d, Some("shop"))
        };

        let policy = ComparisonPolicy::standard().with_ignore(None, "/spec/nodePort");
        let report = diff(
            &[d],
            &[l],
            &policy,
            &KindOrdering::new(),
            &ctx(true),
        );
        assert!(!report.has_drift());
    }
}
