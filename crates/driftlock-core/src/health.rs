//! Health classification and the worst-of-children rollup.

use serde::{Deserialize, Serialize};

/// Coarse health classification of a live object, or an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// The object has converged to its desired shape.
    Healthy,
    /// The object is converging.
    Progressing,
    /// The object reports a terminal or persistent failure.
    Degraded,
    /// The object is desired but absent from live state.
    Missing,
    /// No rule recognizes the kind, or status is indeterminate.
    #[default]
    Unknown,
}

impl HealthState {
    /// Severity order for the aggregate rollup:
    /// Degraded > Progressing > Missing > Unknown > Healthy.
    #[must_use]
    pub fn severity(self) -> u8 {
        match self {
            Self::Degraded => 4,
            Self::Progressing => 3,
            Self::Missing => 2,
            Self::Unknown => 1,
            Self::Healthy => 0,
        }
    }

    /// Worst-of-children rollup. An empty set is Healthy.
    #[must_use]
    pub fn aggregate<I: IntoIterator<Item = HealthState>>(children: I) -> HealthState {
        children
            .into_iter()
            .max_by_key(|s| s.severity())
            .unwrap_or(HealthState::Healthy)
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Progressing => write!(f, "progressing"),
            Self::Degraded => write!(f, "degraded"),
            Self::Missing => write!(f, "missing"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}
