//! HTTP handlers for the status and control surface.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use driftlock_controller::{ControllerRegistry, TriggerOutcome};
use driftlock_core::{
    AppStatus, Application, DeletionPolicy, Destination, SourceRef, SyncPolicy, SyncRecord,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::api::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ControllerRegistry>,
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "driftlock",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn readyz() -> &'static str {
    "ok"
}

/// One application as returned by the API.
#[derive(Debug, Serialize)]
pub struct ApplicationView {
    #[serde(flatten)]
    pub application: Application,
    pub status: AppStatus,
}

pub async fn list_applications(State(state): State<AppState>) -> Json<Vec<ApplicationView>> {
    let apps = state
        .registry
        .list()
        .await
        .into_iter()
        .map(|(application, status)| ApplicationView {
            application,
            status,
        })
        .collect();
    Json(apps)
}

pub async fn get_application(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApplicationView>, ApiError> {
    let (application, status) = state.registry.get(&name).await?;
    Ok(Json(ApplicationView {
        application,
        status,
    }))
}

/// Request body for declaring an application.
#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    pub name: String,
    pub source: SourceRef,
    pub destination: Destination,
    #[serde(default)]
    pub sync_policy: SyncPolicy,
}

pub async fn create_application(
    State(state): State<AppState>,
    Json(request): Json<CreateApplicationRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let app = Application::new(
        request.name,
        request.source,
        request.destination,
        request.sync_policy,
    )
    .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let name = app.name.clone();
    state.registry.create_application(app).await?;
    Ok((StatusCode::CREATED, Json(json!({"name": name}))))
}

pub async fn sync_application(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state.registry.trigger_sync(&name)?;
    let outcome = match outcome {
        TriggerOutcome::Queued => "queued",
        TriggerOutcome::Coalesced => "coalesced",
    };
    Ok(Json(json!({"outcome": outcome})))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    20
}

pub async fn application_history(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<SyncRecord>>, ApiError> {
    Ok(Json(state.registry.history(&name, query.limit).await?))
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub cascade: bool,
}

pub async fn delete_application(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<StatusCode, ApiError> {
    let policy = if query.cascade {
        DeletionPolicy::Cascade
    } else {
        DeletionPolicy::Orphan
    };
    state.registry.delete_application(&name, policy).await?;
    Ok(StatusCode::NO_CONTENT)
}
