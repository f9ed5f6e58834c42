//! # HTTP Handlers
//!
//! Every JSON payload passes through [`contract`] on its way out, so a
//! response that drifts from the shared schema fails as a 500 instead of
//! reaching a client with a renamed field.

pub mod admin;
pub mod query;

use axum::Json;
use axum::extract::Query;
use axum::extract::rejection::QueryRejection;
use climate_domain::Contract;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// Serialize a payload and validate it against its declared field set.
pub(crate) fn contract<T: Contract>(payload: &T) -> ApiResult<Json<Value>> {
    Ok(Json(payload.to_contract_value()?))
}

/// Unwrap query parameters, reporting a malformed query in the API error shape.
pub(crate) fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    params
        .map(|Query(inner)| inner)
        .map_err(|e| ApiError::InvalidInput(e.body_text()))
}
