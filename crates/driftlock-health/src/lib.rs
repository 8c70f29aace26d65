//! Health evaluation for live objects.
//!
//! Rules are polymorphic over object kind through a registry lookup, not
//! an inheritance hierarchy. Unrecognized kinds evaluate to `Unknown`
//! rather than assumed-Healthy. The aggregate rollup is worst-of-children
//! and additionally scores desired-but-absent objects as `Missing`.

pub mod rules;

use std::collections::HashMap;
use std::sync::Arc;

use driftlock_core::{HealthState, LiveObject, ObjectId};
use tracing::debug;

pub use rules::{JobRule, PresenceRule, WorkloadRule};

/// A health rule for one object kind.
pub trait HealthRule: Send + Sync {
    /// Classifies a live object's reported status.
    fn evaluate(&self, object: &LiveObject) -> HealthState;
}

/// Registry mapping kind identifiers to health rules.
pub struct HealthRegistry {
    rules: HashMap<String, Arc<dyn HealthRule>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        let mut rules: HashMap<String, Arc<dyn HealthRule>> = HashMap::new();
        rules.insert("Workload".into(), Arc::new(WorkloadRule::default()));
        rules.insert("Job".into(), Arc::new(JobRule));
        rules.insert("Namespace".into(), Arc::new(PresenceRule));
        rules.insert("ConfigMap".into(), Arc::new(PresenceRule));
        Self { rules }
    }
}

impl HealthRegistry {
    /// Creates the registry with the built-in rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or overrides) the rule for a kind.
    #[must_use]
    pub fn with_rule(mut self, kind: impl Into<String>, rule: Arc<dyn HealthRule>) -> Self {
        self.rules.insert(kind.into(), rule);
        self
    }

    /// Evaluates one live object. Kinds without a registered rule are
    /// `Unknown`.
    #[must_use]
    pub fn evaluate(&self, object: &LiveObject) -> HealthState {
        match self.rules.get(&object.id.kind) {
            Some(rule) => rule.evaluate(object),
            None => HealthState::Unknown,
        }
    }

    /// Evaluates an application's object set: every desired object that
    /// is absent from live state scores `Missing`; live objects score
    /// per their kind's rule. Returns per-object states and the
    /// worst-of-children aggregate.
    #[must_use]
    pub fn evaluate_all(
        &self,
        desired_ids: &[ObjectId],
        live: &[LiveObject],
    ) -> (Vec<(ObjectId, HealthState)>, HealthState) {
        let mut states: Vec<(ObjectId, HealthState)> = Vec::new();

        for object in live {
            states.push((object.id.clone(), self.evaluate(object)));
        }
        for id in desired_ids {
            if !live.iter().any(|obj| &obj.id == id) {
                states.push((id.clone(), HealthState::Missing));
            }
        }

        let aggregate = HealthState::aggregate(states.iter().map(|(_, s)| *s));
        debug!(objects = states.len(), aggregate = %aggregate, "health evaluated");
        (states, aggregate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn live(kind: &str, name: &str, status: serde_json::Value) -> LiveObject {
        live_with_spec(kind, name, json!({}), status)
    }

    fn live_with_spec(
        kind: &str,
        name: &str,
        spec: serde_json::Value,
        status: serde_json::Value,
    ) -> LiveObject {
        LiveObject {
            id: ObjectId::namespaced(kind, "prod", name),
            manifest: json!({
                "kind": kind,
                "metadata": {"name": name, "namespace": "prod"},
                "spec": spec
            }),
            status,
            resource_version: "1".into(),
            owner: Some("shop".into()),
        }
    }

    #[test]
    fn test_unknown_kind_is_unknown_not_healthy() {
        let registry = HealthRegistry::new();
        let object = live("SomethingNew", "x", json!({"ready": true}));
        assert_eq!(registry.evaluate(&object), HealthState::Unknown);
    }

    #[test]
    fn test_rollup_reports_degraded() {
        // Children {Healthy, Degraded, Progressing} roll up Degraded.
        let registry = HealthRegistry::new();
        let healthy = live("ConfigMap", "settings", json!({}));
        let degraded = live("Job", "migrate", json!({"phase": "Failed"}));
        let progressing = live_with_spec(
            "Workload",
            "api",
            json!({"replicas": 3}),
            json!({"readyReplicas": 1}),
        );

        let (states, aggregate) =
            registry.evaluate_all(&[], &[healthy, degraded, progressing]);
        assert_eq!(states.len(), 3);
        assert_eq!(aggregate, HealthState::Degraded);
    }

    #[test]
    fn test_desired_but_absent_is_missing() {
        let registry = HealthRegistry::new();
        let desired = vec![ObjectId::namespaced("Workload", "prod", "api")];
        let (states, aggregate) = registry.evaluate_all(&desired, &[]);
        assert_eq!(states, vec![(desired[0].clone(), HealthState::Missing)]);
        assert_eq!(aggregate, HealthState::Missing);
    }

    #[test]
    fn test_empty_application_is_healthy() {
        let registry = HealthRegistry::new();
        let (states, aggregate) = registry.evaluate_all(&[], &[]);
        assert!(states.is_empty());
        assert_eq!(aggregate, HealthState::Healthy);
    }

    #[test]
    fn test_custom_rule_registration() {
        struct AlwaysDegraded;
        impl HealthRule for AlwaysDegraded {
            fn evaluate(&self, _object: &LiveObject) -> HealthState {
                HealthState::Degraded
            }
        }

        let registry = HealthRegistry::new().with_rule("Queue", Arc::new(AlwaysDegraded));
        let object = live("Queue", "orders", json!({}));
        assert_eq!(registry.evaluate(&object), HealthState::Degraded);
    }
}
