//! HTTP surface smoke tests against an in-memory engine.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use driftlock_controller::{ControllerRegistry, ControllerSettings, EngineDeps};
use driftlock_core::{RetryPolicy, SyncState};
use driftlock_diff::{ComparisonPolicy, KindOrdering};
use driftlock_health::HealthRegistry;
use driftlock_server::build_app;
use driftlock_source::{Fetcher, LocalRepository, PassthroughRenderer, StaticSecretResolver};
use driftlock_store::{DynStore, InMemoryStore};
use driftlock_target::InMemoryTarget;
use tower::ServiceExt;

fn test_registry(repo_root: &std::path::Path) -> Arc<ControllerRegistry> {
    let fetcher = Fetcher::new(
        Arc::new(LocalRepository::new(repo_root)),
        Arc::new(PassthroughRenderer::new()),
        Arc::new(StaticSecretResolver::new()),
    );
    let deps = Arc::new(EngineDeps::new(
        fetcher,
        Arc::new(InMemoryTarget::new()),
        Arc::new(InMemoryStore::new(20)) as DynStore,
        ComparisonPolicy::standard(),
        KindOrdering::new(),
        HealthRegistry::new(),
        ControllerSettings {
            poll_interval: Duration::from_millis(50),
            history_retention: 20,
            worker_limit: 2,
            call_timeout: Duration::from_secs(2),
            retry: RetryPolicy::default(),
        },
    ));
    Arc::new(ControllerRegistry::new(deps))
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn application_lifecycle_over_http() {
    let repo = tempfile::tempdir().unwrap();
    let app_dir = repo.path().join("shop");
    std::fs::create_dir_all(&app_dir).unwrap();
    std::fs::write(
        app_dir.join("api.json"),
        serde_json::json!({
            "kind": "Workload",
            "metadata": {"name": "api", "namespace": "prod"},
            "spec": {"replicas": 1}
        })
        .to_string(),
    )
    .unwrap();

    let registry = test_registry(repo.path());
    let router = build_app(registry.clone());

    // Health endpoints respond.
    let response = router
        .clone()
        .oneshot(empty_request("GET", "/healthz"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Declare an application.
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/applications",
            serde_json::json!({
                "name": "shop",
                "source": {"location": "shop"},
                "destination": {"endpoint": "memory://local", "namespace": "prod"},
                "sync_policy": {"mode": "automated"}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Re-declaring conflicts.
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/applications",
            serde_json::json!({
                "name": "shop",
                "source": {"location": "shop"},
                "destination": {"endpoint": "memory://local"}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Invalid names are rejected up front.
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/applications",
            serde_json::json!({
                "name": "Not Valid",
                "source": {"location": "x"},
                "destination": {"endpoint": "memory://local"}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The automated loop converges shortly after declaration.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    loop {
        let status = registry.status("shop").unwrap();
        if status.sync == SyncState::Synced {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "never converged");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // Status, manual sync, and history endpoints respond.
    for (method, uri) in [
        ("GET", "/applications"),
        ("GET", "/applications/shop"),
        ("POST", "/applications/shop/sync"),
        ("GET", "/applications/shop/history"),
    ] {
        let response = router
            .clone()
            .oneshot(empty_request(method, uri))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{method} {uri}");
    }

    // Unknown applications are 404.
    let response = router
        .clone()
        .oneshot(empty_request("GET", "/applications/ghost"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Deletion removes the application.
    let response = router
        .clone()
        .oneshot(empty_request("DELETE", "/applications/shop?cascade=true"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = router
        .clone()
        .oneshot(empty_request("GET", "/applications/shop"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    registry.shutdown().await;
}
