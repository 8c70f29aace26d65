//! Core data model for the Driftlock reconciliation engine.
//!
//! This crate defines the types shared across the engine: object identity,
//! desired/live object representations, the `Application` entity with its
//! sync policy, sync attempt records, health classification, and the
//! attempt/retry primitives used by every component that talks to the
//! target system.

pub mod application;
pub mod error;
pub mod health;
pub mod object;
pub mod retry;
pub mod status;

pub use application::{
    Application, DeletionPolicy, Destination, SourceRef, SyncMode, SyncPolicy, validate_name,
};
pub use error::{CoreError, Result};
pub use health::HealthState;
pub use object::{DesiredObject, LiveObject, ObjectId, OWNER_LABEL};
pub use retry::{Attempt, RetryOutcome, RetryPolicy};
pub use status::{
    AppStatus, DriftSummary, OpAction, OpOutcome, OperationRecord, SyncPhase, SyncRecord,
    SyncState, SyncTrigger,
};
