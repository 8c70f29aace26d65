//! Secret resolution seam with leak-proof value handling.
//!
//! Rendered documents may carry `secret://<reference>` placeholders. The
//! fetcher resolves them through a [`SecretResolver`] at fetch time, on
//! every tick; resolved values are never cached across ticks and never
//! appear in history or logs.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, SourceError};

/// Scheme prefix marking a secret reference inside a rendered document.
pub const SECRET_SCHEME: &str = "secret://";

/// A resolved secret value whose Debug and Display output is redacted.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    /// Wraps a resolved value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Exposes the underlying value. Call sites are the audit surface.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString(<redacted>)")
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Resolves secret references to values.
#[async_trait]
pub trait SecretResolver: Send + Sync {
    /// Resolves a reference (without the `secret://` prefix).
    ///
    /// # Errors
    ///
    /// Returns `SourceError::SecretUnavailable` when the reference does
    /// not resolve and `SourceError::AccessDenied` when the store refuses
    /// access.
    async fn resolve(&self, reference: &str) -> Result<SecretString>;
}

/// Map-backed resolver for tests and local runs.
#[derive(Default)]
pub struct StaticSecretResolver {
    values: HashMap<String, String>,
    denied: Vec<String>,
}

impl StaticSecretResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resolvable reference.
    #[must_use]
    pub fn with_secret(mut self, reference: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(reference.into(), value.into());
        self
    }

    /// Marks a reference as access-denied.
    #[must_use]
    pub fn with_denied(mut self, reference: impl Into<String>) -> Self {
        self.denied.push(reference.into());
        self
    }
}

#[async_trait]
impl SecretResolver for StaticSecretResolver {
    async fn resolve(&self, reference: &str) -> Result<SecretString> {
        if self.denied.iter().any(|d| d == reference) {
            return Err(SourceError::access_denied(reference));
        }
        self.values
            .get(reference)
            .map(|v| SecretString::new(v.clone()))
            .ok_or_else(|| SourceError::secret_unavailable(reference))
    }
}

/// Walks a document and resolves every `secret://` string value in place.
pub async fn resolve_secret_refs(doc: &mut Value, resolver: &dyn SecretResolver) -> Result<()> {
    match doc {
        Value::String(s) => {
            if let Some(reference) = s.strip_prefix(SECRET_SCHEME) {
                let resolved = resolver.resolve(reference).await?;
                *s = resolved.expose().to_string();
            }
        }
        Value::Array(items) => {
            for item in items {
                Box::pin(resolve_secret_refs(item, resolver)).await?;
            }
        }
        Value::Object(map) => {
            for (_, value) in map.iter_mut() {
                Box::pin(resolve_secret_refs(value, resolver)).await?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_secret_string_redacted() {
        let secret = SecretString::new("hunter2");
        assert_eq!(format!("{secret:?}"), "SecretString(<redacted>)");
        assert_eq!(secret.to_string(), "<redacted>");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[tokio::test]
    async fn test_resolve_refs_in_place() {
        let resolver = StaticSecretResolver::new().with_secret("db/password", "hunter2");
        let mut doc = json!({
            "kind": "ConfigMap",
            "data": {
                "password": "secret://db/password",
                "plain": "visible",
                "nested": ["secret://db/password"]
            }
        });
        resolve_secret_refs(&mut doc, &resolver).await.unwrap();
        assert_eq!(doc["data"]["password"], "hunter2");
        assert_eq!(doc["data"]["plain"], "visible");
        assert_eq!(doc["data"]["nested"][0], "hunter2");
    }

    #[tokio::test]
    async fn test_unresolved_reference_fails() {
        let resolver = StaticSecretResolver::new();
        let mut doc = json!({"password": "secret://missing"});
        let err = resolve_secret_refs(&mut doc, &resolver).await.unwrap_err();
        assert!(matches!(err, SourceError::SecretUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_denied_reference_fails() {
        let resolver = StaticSecretResolver::new().with_denied("locked");
        let mut doc = json!({"password": "secret://locked"});
        let err = resolve_secret_refs(&mut doc, &resolver).await.unwrap_err();
        assert!(matches!(err, SourceError::AccessDenied { .. }));
    }
}
