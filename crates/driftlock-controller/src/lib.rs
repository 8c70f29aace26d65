//! The application controller: owns the reconciliation loop lifecycle.
//!
//! Each tracked application gets its own scheduled loop: on a fixed poll
//! interval or an explicit trigger, fetch and observe run concurrently,
//! the diff engine compares, and — policy permitting — the sync engine
//! executes. Every sync attempt lands in durable history; current status
//! is exposed through a lock-free snapshot. Applications reconcile
//! independently and in parallel; within one application, reconciliation
//! is serialized and concurrent triggers coalesce into at most one
//! follow-up sync.
//!
//! All per-application failures are caught at this boundary and recorded
//! in status; a single application never takes the controller down.

pub mod controller;
pub mod deps;
pub mod error;
pub mod registry;

pub use controller::TriggerOutcome;
pub use deps::{ControllerSettings, EngineDeps};
pub use error::{ControllerError, Result};
pub use registry::ControllerRegistry;
