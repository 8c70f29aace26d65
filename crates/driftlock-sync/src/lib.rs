//! The sync engine: executes a diff against the target system.
//!
//! One sync attempt moves through `Pending → Running → {Succeeded,
//! Failed, PartiallyFailed}`. Items execute in dependency waves;
//! independent items within a wave run in parallel under a worker-pool
//! limit. Transient target errors retry with exponential backoff;
//! validation errors fail the item immediately without blocking
//! independent siblings; a failed item marks its transitive dependents
//! Skipped. Cancellation stops issuing new operations while letting
//! in-flight calls finish.

pub mod engine;
mod plan;

pub use engine::SyncEngine;
