//! The `Application` entity: what to deploy, where, and under which policy.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{CoreError, Result};

/// Where the desired state comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Repository location (implementation-specific, e.g. a directory root).
    pub location: String,
    /// Revision to check out. `None` means the repository default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    /// Path inside the checkout holding the rendered-source directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.location)?;
        if let Some(rev) = &self.revision {
            write!(f, "@{rev}")?;
        }
        if let Some(path) = &self.path {
            write!(f, ":{path}")?;
        }
        Ok(())
    }
}

/// Where objects are deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Target system endpoint.
    pub endpoint: String,
    /// Default namespace for namespaced objects without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Whether syncs require an explicit trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Drift is detected and reported, but never acted on without a trigger.
    #[default]
    Manual,
    /// A non-empty diff schedules a sync on its own.
    Automated,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Automated => write!(f, "automated"),
        }
    }
}

/// Per-application sync behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncPolicy {
    /// Manual or automated sync.
    #[serde(default)]
    pub mode: SyncMode,
    /// Whether live objects absent from desired state may be deleted.
    #[serde(default)]
    pub prune: bool,
    /// Whether drift detected outside a trigger schedules an immediate sync.
    #[serde(default)]
    pub self_heal: bool,
}

/// What happens to deployed objects when an application is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletionPolicy {
    /// Leave deployed objects in place, dropping ownership tracking.
    #[default]
    Orphan,
    /// Delete every owned live object before removing the application.
    Cascade,
}

/// A tracked application: source, destination, and sync policy.
///
/// Created by user declaration; mutated only by the application controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    /// Unique application name.
    pub name: String,
    /// Desired-state source reference.
    pub source: SourceRef,
    /// Deployment destination.
    pub destination: Destination,
    /// Sync policy.
    #[serde(default)]
    pub sync_policy: SyncPolicy,
    /// Declaration time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Application {
    /// Creates a new application, validating the name.
    pub fn new(
        name: impl Into<String>,
        source: SourceRef,
        destination: Destination,
        sync_policy: SyncPolicy,
    ) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            source,
            destination,
            sync_policy,
            created_at: OffsetDateTime::now_utc(),
        })
    }
}

/// Application names are lowercase alphanumerics and dashes, max 63 chars.
pub fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 63
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-');
    if valid {
        Ok(())
    } else {
        Err(CoreError::invalid_application_name(name))
    }
}
