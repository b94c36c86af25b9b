//! REST API routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use hive_core::{ConnectionAnalysis, Drone, Interference, Telemetry};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::{commands, error_body, hives, request_id, ApiError};
use crate::connections::{WeightUpdate, WeightUpdateOutcome};
use crate::state::AppState;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    let drone_routes = Router::new()
        .route("/v1/drones", put(upsert_drone))
        .route("/v1/drones", get(list_drones))
        .route("/v1/drones/:drone_id", get(get_drone))
        .route("/v1/drones/:drone_id", delete(remove_drone))
        .route("/v1/drones/:drone_id/connection", get(analyze_connection))
        .route("/v1/drones/:drone_id/telemetry", post(report_telemetry))
        .route("/v1/drones/:drone_id/interferences", get(drone_interferences))
        .route("/v1/drones/:drone_id/commands/next", get(commands::get_next_command))
        .route("/v1/drones/:drone_id/commands", get(commands::get_all_commands));

    let hive_routes = Router::new()
        .route("/v1/hives", post(hives::create_hive))
        .route("/v1/hives", get(hives::list_hives))
        .route("/v1/hives/:hive_id", delete(hives::remove_hive))
        .route("/v1/hives/:hive_id/drones", post(hives::join_drones))
        .route(
            "/v1/hives/:hive_id/drones/:drone_id/connected",
            get(hives::connected_drones),
        )
        .route("/v1/hives/:hive_id/entry-relays", put(hives::set_entry_relays))
        .route("/v1/hives/:hive_id/topology", post(hives::rebuild_topology))
        .route("/v1/hives/:hive_id/connectivity", get(hives::swarm_connectivity))
        .route("/v1/hives/:hive_id/interferences", post(hives::announce_interference));

    let mesh_routes = Router::new()
        .route("/v1/connections", put(degrade_connections))
        .route("/v1/commands/route", post(commands::route_command));

    drone_routes
        .merge(hive_routes)
        .merge(mesh_routes)
        .layer(middleware::from_fn(request_id::tag_request))
}

// === Request/Response types ===

#[derive(Debug, Serialize)]
pub struct UpsertDroneResponse {
    pub drone: Drone,
    pub is_new: bool,
}

#[derive(Debug, Deserialize)]
pub struct ConnectionQuery {
    /// Falls back to the configured default threshold
    pub minimum_weight: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct TelemetryReport {
    pub lat: f64,
    pub lon: f64,
    pub altitude_m: f64,
    pub battery_pct: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// One weight change or a batch of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DegradeRequest {
    Many(Vec<WeightUpdate>),
    One(WeightUpdate),
}

// === Handlers ===

async fn upsert_drone(
    State(state): State<Arc<AppState>>,
    Json(drone): Json<Drone>,
) -> Result<(StatusCode, Json<UpsertDroneResponse>), ApiError> {
    if drone.id.trim().is_empty() {
        return Err(error_body(StatusCode::BAD_REQUEST, "Drone id must not be empty"));
    }
    let drone_id = drone.id.clone();
    let is_new = state.drones.add(drone);
    let stored = state
        .drones
        .get_by_id(&drone_id)
        .ok_or_else(|| error_body(StatusCode::CONFLICT, "Drone removed during upsert"))?;

    tracing::info!(
        "{} drone {} ({} links)",
        if is_new { "Registered" } else { "Updated" },
        drone_id,
        stored.connections.len()
    );
    let status = if is_new { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(UpsertDroneResponse { drone: stored, is_new })))
}

async fn list_drones(State(state): State<Arc<AppState>>) -> Json<Vec<Drone>> {
    Json(state.drones.get_all())
}

async fn get_drone(
    State(state): State<Arc<AppState>>,
    Path(drone_id): Path<String>,
) -> Result<Json<Drone>, ApiError> {
    state
        .drones
        .get_by_id(&drone_id)
        .map(Json)
        .ok_or_else(|| error_body(StatusCode::NOT_FOUND, format!("Drone {} not found", drone_id)))
}

async fn remove_drone(
    State(state): State<Arc<AppState>>,
    Path(drone_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !state.drones.remove(&drone_id) {
        return Err(error_body(StatusCode::NOT_FOUND, format!("Drone {} not found", drone_id)));
    }
    tracing::info!("Removed drone {}", drone_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn analyze_connection(
    State(state): State<Arc<AppState>>,
    Path(drone_id): Path<String>,
    Query(query): Query<ConnectionQuery>,
) -> Result<Json<ConnectionAnalysis>, ApiError> {
    let minimum_weight = match query.minimum_weight {
        Some(w) if !(0.0..=1.0).contains(&w) => {
            return Err(error_body(
                StatusCode::BAD_REQUEST,
                "minimum_weight must be between 0 and 1",
            ))
        }
        Some(w) => w,
        None => state.config().default_minimum_weight,
    };
    Ok(Json(state.analyzer.analyze_connection(&drone_id, minimum_weight)))
}

async fn report_telemetry(
    State(state): State<Arc<AppState>>,
    Path(drone_id): Path<String>,
    Json(report): Json<TelemetryReport>,
) -> Result<StatusCode, ApiError> {
    let telemetry = Telemetry {
        drone_id: drone_id.clone(),
        lat: report.lat,
        lon: report.lon,
        altitude_m: report.altitude_m,
        battery_pct: report.battery_pct,
        timestamp: report.timestamp.unwrap_or_else(Utc::now),
    };
    if !state.store().record_telemetry(telemetry) {
        return Err(error_body(StatusCode::NOT_FOUND, format!("Drone {} not found", drone_id)));
    }
    tracing::debug!("Telemetry from {}", drone_id);
    Ok(StatusCode::ACCEPTED)
}

async fn drone_interferences(
    State(state): State<Arc<AppState>>,
    Path(drone_id): Path<String>,
) -> Json<Vec<Interference>> {
    Json(state.store().interferences_for_drone(&drone_id))
}

async fn degrade_connections(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DegradeRequest>,
) -> Json<Value> {
    let updates = match request {
        DegradeRequest::Many(updates) => updates,
        DegradeRequest::One(update) => vec![update],
    };
    let outcomes: Vec<WeightUpdateOutcome> = state.connections.degrade(&updates);
    let applied = outcomes.iter().filter(|o| o.success).count();
    Json(json!({
        "applied": applied,
        "failed": outcomes.len() - applied,
        "results": outcomes,
    }))
}
