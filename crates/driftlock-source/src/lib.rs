//! Desired-state fetching for the Driftlock reconciliation engine.
//!
//! The fetcher composes three seams, all external collaborators from the
//! engine's point of view:
//!
//! - [`SourceRepository`] resolves a source reference to a checked-out
//!   directory of rendered-source files.
//! - [`ManifestRenderer`] turns that directory into fully resolved object
//!   documents (templating and overlay languages live behind this trait,
//!   never inside the engine).
//! - [`SecretResolver`] resolves `secret://` references found in rendered
//!   documents into values that are redacted everywhere they could leak.
//!
//! The fetch result is finite and restartable: it is safe to re-fetch on
//! every reconciliation tick, and nothing is cached here.

pub mod error;
pub mod fetcher;
pub mod renderer;
pub mod repository;
pub mod secrets;

pub use error::{Result, SourceError};
pub use fetcher::Fetcher;
pub use renderer::{CommandRenderer, ManifestRenderer, PassthroughRenderer};
pub use repository::{LocalRepository, SourceRepository};
pub use secrets::{SecretResolver, SecretString, StaticSecretResolver};
