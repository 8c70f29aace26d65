//! Filesystem store backend.
//!
//! Layout under the data directory:
//!
//! ```text
//! <root>/apps/<name>.json       one document per application
//! <root>/history/<name>.jsonl   append-only sync history log
//! ```
//!
//! History appends never rewrite existing lines; the log is compacted to
//! the newest `retention` records only once it grows past twice the
//! retention bound, so a restart always observes an ordering-preserving
//! suffix.

use std::path::PathBuf;

use async_trait::async_trait;
use driftlock_core::{Application, SyncRecord};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::traits::StateStore;

/// Durable filesystem-backed store.
pub struct FsStore {
    root: PathBuf,
    retention: usize,
}

impl FsStore {
    /// Opens (creating if needed) a store under `root`, retaining the
    /// newest `retention` history records per application.
    pub async fn open(root: impl Into<PathBuf>, retention: usize) -> Result<Self> {
        let root = root.into();
        for sub in ["apps", "history"] {
            let dir = root.join(sub);
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| StoreError::io(dir.display().to_string(), e))?;
        }
        Ok(Self {
            root,
            retention: retention.max(1),
        })
    }

    fn app_path(&self, name: &str) -> PathBuf {
        self.root.join("apps").join(format!("{name}.json"))
    }

    fn history_path(&self, name: &str) -> PathBuf {
        self.root.join("history").join(format!("{name}.jsonl"))
    }

    async fn read_history(&self, name: &str) -> Result<Vec<SyncRecord>> {
        let path = self.history_path(name);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(path.display().to_string(), e)),
        };
        let mut records = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            records.push(serde_json::from_str(line)?);
        }
        Ok(records)
    }

    async fn compact_history(&self, name: &str, records: &[SyncRecord]) -> Result<()> {
        let keep = records.len().saturating_sub(self.retention);
        let mut content = String::new();
        for record in &records[keep..] {
            content.push_str(&serde_json::to_string(record)?);
            content.push('\n');
        }
        let path = self.history_path(name);
        let tmp = path.with_extension("jsonl.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| StoreError::io(tmp.display().to_string(), e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::io(path.display().to_string(), e))?;
        debug!(app = name, kept = self.retention, "history compacted");
        Ok(())
    }
}

#[async_trait]
impl StateStore for FsStore {
    async fn list_applications(&self) -> Result<Vec<Application>> {
        let dir = self.root.join("apps");
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| StoreError::io(dir.display().to_string(), e))?;

        let mut apps = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(dir.display().to_string(), e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| StoreError::io(path.display().to_string(), e))?;
            apps.push(serde_json::from_str(&text)?);
        }
        apps.sort_by(|a: &Application, b: &Application| a.name.cmp(&b.name));
        Ok(apps)
    }

    async fn get_application(&self, name: &str) -> Result<Option<Application>> {
        let path = self.app_path(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path.display().to_string(), e)),
        }
    }

    async fn put_application(&self, app: &Application) -> Result<()> {
        let path = self.app_path(&app.name);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(app)?;
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| StoreError::io(tmp.display().to_string(), e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::io(path.display().to_string(), e))?;
        Ok(())
    }

    async fn delete_application(&self, name: &str) -> Result<()> {
        let path = self.app_path(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::not_found(name));
            }
            Err(e) => return Err(StoreError::io(path.display().to_string(), e)),
        }
        match tokio::fs::remove_file(self.history_path(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(
                self.history_path(name).display().to_string(),
                e,
            )),
        }
    }

    async fn append_history(&self, name: &str, record: &SyncRecord) -> Result<()> {
        let path = self.history_path(name);
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| StoreError::io(path.display().to_string(), e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StoreError::io(path.display().to_string(), e))?;
        file.flush()
            .await
            .map_err(|e| StoreError::io(path.display().to_string(), e))?;

        let records = self.read_history(name).await?;
        if records.len() > self.retention * 2 {
            self.compact_history(name, &records).await?;
        }
        Ok(())
    }

    async fn history(&self, name: &str, limit: usize) -> Result<Vec<SyncRecord>> {
        let records = self.read_history(name).await?;
        let skip = records.len().saturating_sub(self.retention.min(limit));
        Ok(records.into_iter().skip(skip).collect())
    }
}
