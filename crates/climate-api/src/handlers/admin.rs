//! Operational endpoints.

use axum::Json;
use axum::extract::State;
use climate_domain::HealthStatus;
use serde_json::Value;

use super::contract;
use crate::context::AppState;
use crate::error::ApiResult;

/// `POST /api/v2/admin/refresh`: reload raw data, rebuild, and swap.
pub async fn refresh(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    tracing::info!("Snapshot refresh requested");
    let snapshot = state.snapshots.refresh(state.source.as_ref()).await?;
    contract(&snapshot.info())
}

/// `GET /api/v2/admin/snapshot`
pub async fn snapshot_info(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    contract(&state.snapshots.current().info())
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let snapshot = state.snapshots.current();
    contract(&HealthStatus {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        generation: snapshot.generation(),
        countries: snapshot.len(),
    })
}
