//! HTTP surface for the hive server.

pub mod commands;
pub mod hives;
pub mod request_id;
mod routes;

use axum::{http::StatusCode, Json};
use hive_core::HiveError;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;

pub fn routes() -> axum::Router<Arc<AppState>> {
    routes::create_router()
}

pub type ApiError = (StatusCode, Json<Value>);

pub(crate) fn error_body(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

pub(crate) fn hive_error(err: HiveError) -> ApiError {
    let status = match &err {
        HiveError::DroneNotFound { .. } | HiveError::HiveNotFound { .. } => StatusCode::NOT_FOUND,
        HiveError::AlreadyInHive { .. } => StatusCode::CONFLICT,
        HiveError::NotHiveMember { .. }
        | HiveError::HubMissing { .. }
        | HiveError::IdenticalHubs { .. } => StatusCode::BAD_REQUEST,
    };
    error_body(status, err.to_string())
}

#[cfg(test)]
mod tests;
