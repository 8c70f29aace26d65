//! Target system access for the Driftlock reconciliation engine.
//!
//! [`TargetApi`] is the seam to the system being reconciled: versioned
//! CRUD per object kind, idempotent-safe under retry via resource
//! versions. [`InMemoryTarget`] backs tests and local runs and supports
//! fault injection. [`Observer`] produces the live-state snapshot for an
//! application, tolerating partial per-kind failures.

pub mod api;
pub mod error;
pub mod memory;
pub mod observer;

pub use api::{DynTarget, TargetApi, with_timeout};
pub use error::{Result, TargetError};
pub use memory::InMemoryTarget;
pub use observer::{ObservedState, Observer};
