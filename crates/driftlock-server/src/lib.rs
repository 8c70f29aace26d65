//! Driftlock server: the controller daemon plus its HTTP surface.
//!
//! Wires the engine together (fetcher, target, store, diff policy, health
//! rules, controller registry) from configuration and exposes application
//! status and manual sync triggers over HTTP.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod handlers;
pub mod observability;
pub mod server;

pub use bootstrap::build_registry;
pub use server::{DriftlockServer, ServerBuilder, build_app};
