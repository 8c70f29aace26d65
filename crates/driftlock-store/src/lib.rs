//! Durable state for the Driftlock controller.
//!
//! Application definitions and sync history must survive controller
//! restarts. History is append-only and ordering-preserving, with bounded
//! retention (oldest evicted first). [`InMemoryStore`] backs tests;
//! [`FsStore`] persists one JSON document per application plus a
//! JSON-lines history log.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use fs::FsStore;
pub use memory::InMemoryStore;
pub use traits::{DynStore, StateStore};
