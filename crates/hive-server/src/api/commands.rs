//! Command polling and routed submission.
//!
//! Drones poll their own queue; operators submit commands that are routed
//! through the mesh.

use axum::{
    extract::{Path, State},
    Json,
};
use hive_core::Command;
use serde::Deserialize;
use std::sync::Arc;

use crate::api::{hive_error, ApiError};
use crate::mesh_router::RouteResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RouteCommandRequest {
    pub command: Command,
    /// Falls back to the configured default threshold
    pub minimum_weight: Option<f64>,
}

/// Pop the next queued command.
/// GET /v1/drones/:drone_id/commands/next
pub async fn get_next_command(
    State(state): State<Arc<AppState>>,
    Path(drone_id): Path<String>,
) -> Json<Option<Command>> {
    let command = state.coordination.get_next_command(&drone_id);
    if let Some(command) = &command {
        tracing::debug!("Drone {} picked up {}", drone_id, command.command_id);
    }
    Json(command)
}

/// Queued commands, oldest first, without consuming them.
/// GET /v1/drones/:drone_id/commands
pub async fn get_all_commands(
    State(state): State<Arc<AppState>>,
    Path(drone_id): Path<String>,
) -> Json<Vec<Command>> {
    Json(state.coordination.get_all_commands(&drone_id))
}

/// Deliver a command through the mesh.
/// POST /v1/commands/route
///
/// An unreachable target is reported in the body with `success: false`.
pub async fn route_command(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RouteCommandRequest>,
) -> Result<Json<RouteResult>, ApiError> {
    let minimum_weight = request
        .minimum_weight
        .map(hive_core::clamp_weight)
        .unwrap_or(state.config().default_minimum_weight);
    state
        .coordination
        .route_command(request.command, minimum_weight)
        .map(Json)
        .map_err(hive_error)
}
