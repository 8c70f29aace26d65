//! Kind dependency ordering.
//!
//! A registry maps kind identifiers to ordering weights, looked up at
//! runtime. Lower weights apply first: namespaces before namespaced
//! objects, kind definitions before instances of the kinds they define.

use std::collections::HashMap;

use driftlock_core::ObjectId;

/// Kind that registers new object kinds with the target system.
pub const KIND_DEFINITION: &str = "KindDefinition";

/// Ordering registry mapping kind identifiers to dependency weights.
#[derive(Debug, Clone)]
pub struct KindOrdering {
    weights: HashMap<String, i32>,
    default_weight: i32,
}

impl Default for KindOrdering {
    fn default() -> Self {
        let weights = HashMap::from([
            ("Namespace".to_string(), 0),
            (KIND_DEFINITION.to_string(), 10),
            ("ConfigMap".to_string(), 20),
            ("Workload".to_string(), 30),
            ("Job".to_string(), 40),
        ]);
        Self {
            weights,
            // Unrecognized kinds apply after everything built in; they are
            // usually instances of a KindDefinition.
            default_weight: 100,
        }
    }
}

impl KindOrdering {
    /// Creates the default ordering.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or overrides) a kind's weight.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>, weight: i32) -> Self {
        self.weights.insert(kind.into(), weight);
        self
    }

    /// Returns the dependency weight for a kind.
    #[must_use]
    pub fn weight(&self, kind: &str) -> i32 {
        self.weights
            .get(kind)
            .copied()
            .unwrap_or(self.default_weight)
    }

    /// True when `child` cannot exist (or apply) unless `parent` applied
    /// first: an object depends on its namespace, and an instance of a
    /// custom kind depends on the definition naming that kind.
    #[must_use]
    pub fn hard_dependency(&self, child: &ObjectId, parent: &ObjectId) -> bool {
        if parent.kind == "Namespace"
            && child.kind != "Namespace"
            && child.namespace.as_deref() == Some(parent.name.as_str())
        {
            return true;
        }
        parent.kind == KIND_DEFINITION && parent.name == child.kind
    }
}
