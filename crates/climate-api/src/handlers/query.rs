//! Read-only endpoints over the current snapshot.

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use climate_domain::MasterRow;
use serde::Deserialize;
use serde_json::Value;

use super::{contract, query_params};
use crate::context::AppState;
use crate::error::ApiResult;

#[derive(Debug, Default, Deserialize)]
pub struct GreenGrowthParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForecastParams {
    pub target_year: Option<i32>,
}

/// `GET /api/v2/country/{iso3}`
pub async fn country_profile(
    State(state): State<AppState>,
    Path(iso3): Path<String>,
) -> ApiResult<Json<Value>> {
    let engine = state.engine();
    let profile = engine.snapshot().country_profile(&iso3)?;
    contract(profile)
}

/// `GET /api/v2/analytics/correlation/{x}/{y}`
pub async fn correlation(
    State(state): State<AppState>,
    Path((x, y)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    contract(&state.engine().correlation(&x, &y)?)
}

/// `GET /api/v2/analytics/green-growth`
pub async fn green_growth(
    State(state): State<AppState>,
    params: Result<Query<GreenGrowthParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let params = query_params(params)?;
    contract(&state.engine().green_growth(params.limit)?)
}

/// `GET /api/v2/analytics/forecast/{iso3}/{indicator}`
pub async fn forecast(
    State(state): State<AppState>,
    Path((iso3, indicator)): Path<(String, String)>,
    params: Result<Query<ForecastParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let target_year = query_params(params)?
        .target_year
        .unwrap_or(state.config.forecast_target_year);
    contract(&state.engine().forecast(&iso3, &indicator, target_year)?)
}

/// `GET /api/v2/meta/countries`
pub async fn countries(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    contract(&state.snapshots.current().countries())
}

/// `GET /api/v2/meta/indicators`
pub async fn indicators(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    contract(&state.snapshots.current().indicators())
}

/// `GET /api/v1/data/master`
///
/// Rows are flat, so each one is also checked against the catalog's columns.
pub async fn master_table(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let engine = state.engine();
    let Json(table) = contract(&engine.master_table())?;
    let keys: Vec<&str> = engine
        .snapshot()
        .catalog()
        .indicators()
        .map(|def| def.key.as_str())
        .collect();
    table
        .as_array()
        .into_iter()
        .flatten()
        .try_for_each(|row| MasterRow::check_columns(row, keys.iter().copied()))?;
    Ok(Json(table))
}
