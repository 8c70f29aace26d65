//! Repository source seam: resolve a source reference to a directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use driftlock_core::SourceRef;

use crate::error::{Result, SourceError};

/// Resolves a `(location, revision, path)` reference to a directory of
/// rendered-source files.
///
/// Implementations must be thread-safe (`Send + Sync`); a checkout is
/// read-only from the engine's point of view.
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Resolves the reference, returning the directory holding the
    /// rendered-source files.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::SourceUnavailable` if any component of the
    /// reference cannot be resolved.
    async fn checkout(&self, source: &SourceRef) -> Result<PathBuf>;
}

/// Filesystem-backed repository.
///
/// `location` is a directory under the configured root; `revision`, when
/// present, names a subdirectory of the location (one directory per
/// published revision); `path` points inside the revision.
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    /// Creates a repository rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, source: &SourceRef) -> PathBuf {
        let mut dir = self.root.join(&source.location);
        if let Some(revision) = &source.revision {
            dir = dir.join(revision);
        }
        if let Some(path) = &source.path {
            dir = dir.join(path);
        }
        dir
    }
}

#[async_trait]
impl SourceRepository for LocalRepository {
    async fn checkout(&self, source: &SourceRef) -> Result<PathBuf> {
        let dir = self.resolve(source);
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(SourceError::unavailable(
                source.to_string(),
                format!("{} is not a directory", dir.display()),
            )),
            Err(e) => Err(SourceError::unavailable(
                source.to_string(),
                format!("{}: {e}", dir.display()),
            )),
        }
    }
}

/// Lists manifest-bearing files (`.json`, `.ndjson`) in a checkout, sorted
/// by name so re-fetches see a stable order.
pub(crate) async fn manifest_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str());
        if matches!(ext, Some("json") | Some("ndjson")) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
