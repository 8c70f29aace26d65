//! Comparison policy: which fields to ignore, which defaults to assume.

use serde_json::Value;

/// What to do with a field before comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldAction {
    /// Remove the field from both documents before comparing.
    Ignore,
    /// Treat an absent field as holding this server-side default.
    Normalize(Value),
}

#[derive(Debug, Clone)]
struct PolicyRule {
    /// Restrict the rule to one kind; `None` applies to every kind.
    kind: Option<String>,
    pointer: String,
    action: FieldAction,
}

/// Maps object paths (JSON pointers, optionally kind-scoped) to ignore or
/// normalize actions, excluding server-injected defaults from comparison.
#[derive(Debug, Clone, Default)]
pub struct ComparisonPolicy {
    rules: Vec<PolicyRule>,
}

impl ComparisonPolicy {
    /// Creates an empty policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The default policy: ignores bookkeeping fields every target
    /// injects on write.
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with_ignore(None, "/metadata/creationTimestamp")
            .with_ignore(None, "/metadata/generation")
            .with_ignore(None, "/status")
    }

    /// Adds an ignore rule.
    #[must_use]
    pub fn with_ignore(mut self, kind: Option<&str>, pointer: impl Into<String>) -> Self {
        self.rules.push(PolicyRule {
            kind: kind.map(String::from),
            pointer: pointer.into(),
            action: FieldAction::Ignore,
        });
        self
    }

    /// Adds a normalize rule: an absent field compares as `default`.
    #[must_use]
    pub fn with_normalize(
        mut self,
        kind: Option<&str>,
        pointer: impl Into<String>,
        default: Value,
    ) -> Self {
        self.rules.push(PolicyRule {
            kind: kind.map(String::from),
            pointer: pointer.into(),
            action: FieldAction::Normalize(default),
        });
        self
    }

    /// Applies the policy to a document of the given kind, in place.
    pub fn apply(&self, kind: &str, doc: &mut Value) {
        for rule in &self.rules {
            if let Some(rule_kind) = &rule.kind
                && rule_kind != kind
            {
                continue;
            }
            match &rule.action {
                FieldAction::Ignore => remove_at(doc, &rule.pointer),
                FieldAction::Normalize(default) => ensure_at(doc, &rule.pointer, default),
            }
        }
    }

    /// Returns a normalized copy of a document.
    #[must_use]
    pub fn normalized(&self, kind: &str, doc: &Value) -> Value {
        let mut copy = doc.clone();
        self.apply(kind, &mut copy);
        copy
    }
}

fn split_pointer(pointer: &str) -> Option<(String, String)> {
    let idx = pointer.rfind('/')?;
    let (parent, last) = pointer.split_at(idx);
    let token = last[1..].replace("~1", "/").replace("~0", "~");
    Some((parent.to_string(), token))
}

/// Removes the value at `pointer`, if present.
fn remove_at(doc: &mut Value, pointer: &str) {
    let Some((parent, token)) = split_pointer(pointer) else {
        return;
    };
    let parent_value = if parent.is_empty() {
        Some(doc)
    } else {
        doc.pointer_mut(&parent)
    };
    if let Some(Value::Object(map)) = parent_value {
        map.remove(&token);
    }
}

/// Sets `default` at `pointer` when the field is absent, creating
/// intermediate objects as needed.
fn ensure_at(doc: &mut Value, pointer: &str, default: &Value) {
    let Some((parent, token)) = split_pointer(pointer) else {
        return;
    };
    let mut current = doc;
    if !parent.is_empty() {
        for segment in parent.split('/').skip(1) {
            let key = segment.replace("~1", "/").replace("~0", "~");
            let Value::Object(map) = current else {
                return;
            };
            current = map
                .entry(key)
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
        }
    }
    if let Value::Object(map) = current {
        map.entry(token).or_insert_with(|| default.clone());
    }
}
