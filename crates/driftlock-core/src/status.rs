//! Sync attempt records and the externally visible application status.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::health::HealthState;
use crate::object::ObjectId;

/// Whether the live state matches the desired state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// No comparison has completed yet.
    #[default]
    Unknown,
    /// Desired and live state match under the comparison policy.
    Synced,
    /// Drift was detected.
    OutOfSync,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Synced => write!(f, "synced"),
            Self::OutOfSync => write!(f, "out-of-sync"),
        }
    }
}

/// What caused a sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncTrigger {
    /// Explicit external trigger.
    Manual,
    /// Automated policy reacting to a non-empty diff.
    Automated,
    /// Self-heal reacting to drift detected on a poll tick.
    SelfHeal,
}

impl std::fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Automated => write!(f, "automated"),
            Self::SelfHeal => write!(f, "self-heal"),
        }
    }
}

/// Lifecycle of one sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    /// Created, not yet executing.
    Pending,
    /// Applying diff items.
    Running,
    /// Every item succeeded.
    Succeeded,
    /// Every executed item failed.
    Failed,
    /// Some items succeeded, some failed or were skipped.
    PartiallyFailed,
}

impl SyncPhase {
    /// Whether this phase is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::PartiallyFailed)
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::PartiallyFailed => write!(f, "partially-failed"),
        }
    }
}

/// The write issued for one diff item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpAction {
    /// Object created in the target system.
    Create,
    /// Object updated in place.
    Update,
    /// Object deleted (prune).
    Delete,
}

impl std::fmt::Display for OpAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Terminal outcome of one diff item's execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "result")]
pub enum OpOutcome {
    /// The write was applied.
    Succeeded,
    /// The write failed; the message names the final error.
    Failed {
        /// Final error description.
        message: String,
    },
    /// The item was not executed; the reason names why.
    Skipped {
        /// Why execution was withheld.
        reason: String,
    },
}

impl OpOutcome {
    /// Returns true for the `Succeeded` variant.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// One execution attempt of a diff item. Immutable once terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// The object the item targets.
    pub object: ObjectId,
    /// The write that was (or would have been) issued.
    pub action: OpAction,
    /// Terminal outcome.
    pub outcome: OpOutcome,
    /// Retries consumed before the terminal outcome.
    pub retries: u32,
    /// When the outcome became terminal.
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
}

/// One sync attempt, as recorded in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    /// Attempt id.
    pub id: Uuid,
    /// What caused the attempt.
    pub trigger: SyncTrigger,
    /// Current (or terminal) phase.
    pub phase: SyncPhase,
    /// When the attempt started.
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    /// When the attempt reached a terminal phase.
    #[serde(default, with = "time::serde::rfc3339::option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<OffsetDateTime>,
    /// Per-item operation records.
    pub operations: Vec<OperationRecord>,
    /// Attempt-level note (e.g. cancellation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SyncRecord {
    /// Starts a new attempt in the `Running` phase.
    #[must_use]
    pub fn start(trigger: SyncTrigger) -> Self {
        Self {
            id: Uuid::new_v4(),
            trigger,
            phase: SyncPhase::Running,
            started_at: OffsetDateTime::now_utc(),
            finished_at: None,
            operations: Vec::new(),
            message: None,
        }
    }

    /// Finalizes the attempt: derives the terminal phase from the recorded
    /// operations and stamps the finish time.
    pub fn finish(&mut self) {
        let total = self.operations.len();
        let succeeded = self
            .operations
            .iter()
            .filter(|op| op.outcome.is_success())
            .count();
        let failed = self
            .operations
            .iter()
            .filter(|op| matches!(op.outcome, OpOutcome::Failed { .. }))
            .count();

        self.phase = if failed == 0 && succeeded == total {
            SyncPhase::Succeeded
        } else if succeeded == 0 && failed > 0 && failed == total {
            SyncPhase::Failed
        } else if failed > 0 || succeeded < total {
            SyncPhase::PartiallyFailed
        } else {
            SyncPhase::Succeeded
        };
        self.finished_at = Some(OffsetDateTime::now_utc());
    }
}

/// Drift counts from the most recent comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DriftSummary {
    /// Objects to create.
    pub adds: usize,
    /// Objects to delete (prune enabled) or advisory removals.
    pub removes: usize,
    /// Objects to update.
    pub modifies: usize,
}

impl DriftSummary {
    /// True when no drift was detected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adds == 0 && self.removes == 0 && self.modifies == 0
    }
}

/// Externally visible application status: sync + health.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppStatus {
    /// Sync comparison state.
    pub sync: SyncState,
    /// Aggregate health rollup.
    pub health: HealthState,
    /// Drift counts from the last comparison.
    #[serde(default)]
    pub drift: DriftSummary,
    /// Live-only, unowned objects reported but never acted on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orphans: Vec<ObjectId>,
    /// Kinds whose listing failed on the last observation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incomplete_kinds: Vec<String>,
    /// When the last comparison completed.
    #[serde(default, with = "time::serde::rfc3339::option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<OffsetDateTime>,
    /// Phase of the most recent sync attempt, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_phase: Option<SyncPhase>,
    /// When the most recent sync attempt finished.
    #[serde(default, with = "time::serde::rfc3339::option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<OffsetDateTime>,
    /// Last reconciliation error, if the tick failed outright.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
