//! Built-in health rules.

use driftlock_core::{HealthState, LiveObject};
use serde_json::Value;

use crate::HealthRule;

/// Stateless-workload rule: healthy when the observed ready replica count
/// matches the desired count and no recent restart storm is reported.
pub struct WorkloadRule {
    /// Restarts within the reporting window that count as a storm.
    pub restart_storm_threshold: u64,
}

impl Default for WorkloadRule {
    fn default() -> Self {
        Self {
            restart_storm_threshold: 5,
        }
    }
}

impl HealthRule for WorkloadRule {
    fn evaluate(&self, object: &LiveObject) -> HealthState {
        let desired = object
            .manifest
            .pointer("/spec/replicas")
            .and_then(Value::as_u64)
            .unwrap_or(1);
        let ready = object
            .status
            .get("readyReplicas")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let recent_restarts = object
            .status
            .get("recentRestarts")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        if recent_restarts >= self.restart_storm_threshold {
            return HealthState::Degraded;
        }
        if ready == desired {
            HealthState::Healthy
        } else {
            HealthState::Progressing
        }
    }
}

/// Batch-job rule: healthy only on terminal success, degraded on
/// terminal failure. A terminal job is never Progressing.
pub struct JobRule;

impl HealthRule for JobRule {
    fn evaluate(&self, object: &LiveObject) -> HealthState {
        match object.status.get("phase").and_then(Value::as_str) {
            Some("Succeeded") => HealthState::Healthy,
            Some("Failed") => HealthState::Degraded,
            _ => HealthState::Progressing,
        }
    }
}

/// Rule for kinds whose presence is their health (namespaces, config).
pub struct PresenceRule;

impl HealthRule for PresenceRule {
    fn evaluate(&self, _object: &LiveObject) -> HealthState {
        HealthState::Healthy
    }
}
