//! Engine assembly from configuration.

use std::sync::Arc;

use driftlock_controller::{ControllerRegistry, EngineDeps};
use driftlock_diff::{ComparisonPolicy, KindOrdering};
use driftlock_health::HealthRegistry;
use driftlock_source::{
    CommandRenderer, Fetcher, LocalRepository, ManifestRenderer, PassthroughRenderer,
    StaticSecretResolver,
};
use driftlock_store::{DynStore, FsStore};
use driftlock_target::{DynTarget, InMemoryTarget};

use crate::config::AppConfig;

/// Builds the controller registry from configuration: filesystem store,
/// local repository root, configured renderer, and the bundled in-memory
/// target backend. Persisted applications are not yet started; call
/// `registry.start()` for that.
pub async fn build_registry(cfg: &AppConfig) -> anyhow::Result<Arc<ControllerRegistry>> {
    let store: DynStore = Arc::new(
        FsStore::open(cfg.store.data_dir.clone(), cfg.controller.history_retention).await?,
    );
    let target: DynTarget = Arc::new(InMemoryTarget::new());

    let renderer: Arc<dyn ManifestRenderer> = match &cfg.source.renderer {
        Some(renderer) => Arc::new(CommandRenderer::new(
            renderer.command.clone(),
            renderer.args.clone(),
        )),
        None => Arc::new(PassthroughRenderer::new()),
    };
    let mut secrets = StaticSecretResolver::new();
    for (reference, value) in &cfg.source.secrets {
        secrets = secrets.with_secret(reference, value);
    }
    let fetcher = Fetcher::new(
        Arc::new(LocalRepository::new(cfg.source.root.clone())),
        renderer,
        Arc::new(secrets),
    );

    let deps = Arc::new(EngineDeps::new(
        fetcher,
        target,
        store,
        ComparisonPolicy::standard(),
        KindOrdering::new(),
        HealthRegistry::new(),
        cfg.controller_settings(),
    ));
    Ok(Arc::new(ControllerRegistry::new(deps)))
}
