//! The fetch pipeline: checkout, render, resolve secrets, parse, stamp
//! ownership.

use std::sync::Arc;

use driftlock_core::{Application, DesiredObject};
use tracing::debug;

use crate::error::{Result, SourceError};
use crate::renderer::ManifestRenderer;
use crate::repository::SourceRepository;
use crate::secrets::{SecretResolver, resolve_secret_refs};

/// Produces the desired object set for an application.
///
/// Stateless by contract: every call re-resolves the source reference,
/// re-renders, and re-resolves secrets. Caching, if any, is the
/// application controller's responsibility.
pub struct Fetcher {
    repository: Arc<dyn SourceRepository>,
    renderer: Arc<dyn ManifestRenderer>,
    secrets: Arc<dyn SecretResolver>,
}

impl Fetcher {
    /// Creates a fetcher over the three collaborator seams.
    #[must_use]
    pub fn new(
        repository: Arc<dyn SourceRepository>,
        renderer: Arc<dyn ManifestRenderer>,
        secrets: Arc<dyn SecretResolver>,
    ) -> Self {
        Self {
            repository,
            renderer,
            secrets,
        }
    }

    /// Fetches the fully rendered desired state for `app`.
    ///
    /// Every returned object carries the ownership marker for `app` and a
    /// namespace (the destination default when the manifest has none).
    pub async fn fetch(&self, app: &Application) -> Result<Vec<DesiredObject>> {
        let dir = self.repository.checkout(&app.source).await?;
        debug!(app = %app.name, dir = %dir.display(), "source checked out");

        let documents = self.renderer.render(&dir).await?;
        let default_namespace = app.destination.namespace.as_deref();

        let mut objects = Vec::with_capacity(documents.len());
        for (index, mut doc) in documents.into_iter().enumerate() {
            resolve_secret_refs(&mut doc, self.secrets.as_ref()).await?;
            let mut object = DesiredObject::from_manifest(doc, default_namespace).map_err(
                |source| SourceError::InvalidManifest {
                    origin: format!("{} document {index}", self.renderer.name()),
                    source,
                },
            )?;
            object.set_owner(&app.name);
            objects.push(object);
        }

        debug!(app = %app.name, count = objects.len(), "desired state fetched");
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::PassthroughRenderer;
    use crate::repository::LocalRepository;
    use crate::secrets::StaticSecretResolver;
    use driftlock_core::{Application, Destination, OWNER_LABEL, SourceRef, SyncPolicy};

    fn app(location: &str) -> Application {
        Application::new(
            "shop",
            SourceRef {
                location: location.into(),
                revision: None,
                path: None,
            },
            Destination {
                endpoint: "memory://local".into(),
                namespace: Some("prod".into()),
            },
            SyncPolicy::default(),
        )
        .expect("valid application")
    }

    async fn write_manifest(dir: &std::path::Path, name: &str, content: &str) {
        tokio::fs::write(dir.join(name), content).await.expect("write manifest");
    }

    fn fetcher(root: &std::path::Path, secrets: StaticSecretResolver) -> Fetcher {
        Fetcher::new(
            Arc::new(LocalRepository::new(root)),
            Arc::new(PassthroughRenderer::new()),
            Arc::new(secrets),
        )
    }

    #[tokio::test]
    async fn test_fetch_stamps_owner_and_namespace() {
        let root = tempfile::tempdir().expect("tmp dir");
        let repo_dir = root.path().join("shop");
        tokio::fs::create_dir_all(&repo_dir).await.unwrap();
        write_manifest(
            &repo_dir,
            "api.json",
            r#"{"kind": "Workload", "metadata": {"name": "api"}, "spec": {"replicas": 2}}"#,
        )
        .await;

        let objects = fetcher(root.path(), StaticSecretResolver::new())
            .fetch(&app("shop"))
            .await
            .expect("fetch");

        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].id.namespace.as_deref(), Some("prod"));
        assert_eq!(
            objects[0].manifest["metadata"]["labels"][OWNER_LABEL],
            "shop"
        );
    }

    #[tokio::test]
    async fn test_fetch_resolves_secrets() {
        let root = tempfile::tempdir().expect("tmp dir");
        let repo_dir = root.path().join("shop");
        tokio::fs::create_dir_all(&repo_dir).await.unwrap();
        write_manifest(
            &repo_dir,
            "cm.json",
            r#"{"kind": "ConfigMap", "metadata": {"name": "db"}, "data": {"password": "secret://db/password"}}"#,
        )
        .await;

        let secrets = StaticSecretResolver::new().with_secret("db/password", "hunter2");
        let objects = fetcher(root.path(), secrets)
            .fetch(&app("shop"))
            .await
            .expect("fetch");
        assert_eq!(objects[0].manifest["data"]["password"], "hunter2");
    }

    #[tokio::test]
    async fn test_fetch_missing_source() {
        let root = tempfile::tempdir().expect("tmp dir");
        let err = fetcher(root.path(), StaticSecretResolver::new())
            .fetch(&app("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_fetch_invalid_manifest() {
        let root = tempfile::tempdir().expect("tmp dir");
        let repo_dir = root.path().join("shop");
        tokio::fs::create_dir_all(&repo_dir).await.unwrap();
        write_manifest(&repo_dir, "bad.json", r#"{"kind": "Workload", "metadata": {}}"#).await;

        let err = fetcher(root.path(), StaticSecretResolver::new())
            .fetch(&app("shop"))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::InvalidManifest { .. }));
    }

    #[tokio::test]
    async fn test_fetch_is_restartable() {
        let root = tempfile::tempdir().expect("tmp dir");
        let repo_dir = root.path().join("shop");
        tokio::fs::create_dir_all(&repo_dir).await.unwrap();
        write_manifest(
            &repo_dir,
            "api.json",
            r#"{"kind": "Workload", "metadata": {"name": "api"}}"#,
        )
        .await;

        let fetcher = fetcher(root.path(), StaticSecretResolver::new());
        let first = fetcher.fetch(&app("shop")).await.expect("first fetch");
        let second = fetcher.fetch(&app("shop")).await.expect("second fetch");
        assert_eq!(first, second);
    }
}
