use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use driftlock_controller::ControllerRegistry;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{self, AppState};

pub struct DriftlockServer {
    addr: SocketAddr,
    app: Router,
    registry: Arc<ControllerRegistry>,
}

pub fn build_app(registry: Arc<ControllerRegistry>) -> Router {
    let state = AppState { registry };
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        // Application lifecycle and status
        .route(
            "/applications",
            get(handlers::list_applications).post(handlers::create_application),
        )
        .route(
            "/applications/{name}",
            get(handlers::get_application).delete(handlers::delete_application),
        )
        .route("/applications/{name}/sync", post(handlers::sync_application))
        .route(
            "/applications/{name}/history",
            get(handlers::application_history),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct ServerBuilder {
    addr: SocketAddr,
    registry: Arc<ControllerRegistry>,
}

impl ServerBuilder {
    pub fn new(registry: Arc<ControllerRegistry>) -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            registry,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn build(self) -> DriftlockServer {
        let app = build_app(self.registry.clone());
        DriftlockServer {
            addr: self.addr,
            app,
            registry: self.registry,
        }
    }
}

impl DriftlockServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        // Drain in-flight syncs before the process exits.
        self.registry.shutdown().await;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
