//! Hive management, topology and connectivity endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use hive_core::{Hive, HiveError, SwarmConnectivity};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::{error_body, hive_error, ApiError};
use crate::coordination::JoinResult;
use crate::notify::{InterferenceAnnouncement, InterferenceRequest};
use crate::state::AppState;
use crate::topology::{TopologyReport, TopologyRequest};

#[derive(Debug, Deserialize)]
pub struct CreateHiveRequest {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub drone_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EntryRelaysRequest {
    /// Empty restores the default (every relay-type drone)
    #[serde(default)]
    pub relay_ids: Vec<String>,
}

fn hive_not_found(hive_id: &str) -> ApiError {
    hive_error(HiveError::HiveNotFound {
        hive_id: hive_id.to_string(),
    })
}

/// POST /v1/hives
pub async fn create_hive(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateHiveRequest>,
) -> Result<(StatusCode, Json<Hive>), ApiError> {
    let hive_id = request.id.trim().to_string();
    if hive_id.is_empty() {
        return Err(error_body(StatusCode::BAD_REQUEST, "Hive id must not be empty"));
    }
    if !state.hives.add(Hive::new(hive_id.clone(), request.name)) {
        return Err(error_body(
            StatusCode::CONFLICT,
            format!("Hive {} already exists", hive_id),
        ));
    }
    tracing::info!("Created hive {}", hive_id);
    let hive = state
        .hives
        .get_by_id(&hive_id)
        .ok_or_else(|| hive_not_found(&hive_id))?;
    Ok((StatusCode::CREATED, Json(hive)))
}

/// GET /v1/hives
pub async fn list_hives(State(state): State<Arc<AppState>>) -> Json<Vec<Hive>> {
    Json(state.hives.get_all())
}

/// DELETE /v1/hives/:hive_id
pub async fn remove_hive(
    State(state): State<Arc<AppState>>,
    Path(hive_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !state.hives.remove(&hive_id) {
        return Err(hive_not_found(&hive_id));
    }
    tracing::info!("Removed hive {}", hive_id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/hives/:hive_id/drones
pub async fn join_drones(
    State(state): State<Arc<AppState>>,
    Path(hive_id): Path<String>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<Value>, ApiError> {
    if !state.hives.exists(&hive_id) {
        return Err(hive_not_found(&hive_id));
    }
    let results: Vec<JoinResult> = state.coordination.batch_join(&hive_id, &request.drone_ids);
    let joined = results.iter().filter(|r| r.success).count();
    Ok(Json(json!({
        "hive_id": hive_id,
        "joined": joined,
        "failed": results.len() - joined,
        "results": results,
    })))
}

/// GET /v1/hives/:hive_id/drones/:drone_id/connected
pub async fn connected_drones(
    State(state): State<Arc<AppState>>,
    Path((hive_id, drone_id)): Path<(String, String)>,
) -> Result<Json<Vec<String>>, ApiError> {
    state
        .coordination
        .get_connected_drones(&hive_id, &drone_id)
        .map(Json)
        .map_err(hive_error)
}

/// PUT /v1/hives/:hive_id/entry-relays
pub async fn set_entry_relays(
    State(state): State<Arc<AppState>>,
    Path(hive_id): Path<String>,
    Json(request): Json<EntryRelaysRequest>,
) -> Result<Json<Hive>, ApiError> {
    state
        .coordination
        .set_entry_relays(&hive_id, request.relay_ids)
        .map_err(hive_error)?;
    state
        .hives
        .get_by_id(&hive_id)
        .map(Json)
        .ok_or_else(|| hive_not_found(&hive_id))
}

/// POST /v1/hives/:hive_id/topology
///
/// Tears down the selected drones' links and builds the requested topology.
/// Defaults to every member of the hive; explicit ids must all be members.
pub async fn rebuild_topology(
    State(state): State<Arc<AppState>>,
    Path(hive_id): Path<String>,
    Json(request): Json<TopologyRequest>,
) -> Result<Json<TopologyReport>, ApiError> {
    if !state.hives.exists(&hive_id) {
        return Err(hive_not_found(&hive_id));
    }
    if let Some(weight) = request.weight {
        if !weight.is_finite() {
            return Err(error_body(StatusCode::BAD_REQUEST, "weight must be a finite number"));
        }
    }
    let members = state.hives.get_drone_ids(&hive_id);
    let drone_ids = match &request.drone_ids {
        Some(ids) => {
            if let Some(outsider) = ids.iter().find(|id| !members.contains(id)) {
                return Err(hive_error(HiveError::NotHiveMember {
                    drone_id: outsider.clone(),
                    hive_id: hive_id.clone(),
                }));
            }
            ids.clone()
        }
        None => members,
    };

    let report = state.topology.rebuild(&drone_ids, &request);
    tracing::info!(
        "Hive {} topology {}: -{} +{} links",
        hive_id,
        report.topology,
        report.removed_edges,
        report.created_edges
    );
    Ok(Json(report))
}

/// GET /v1/hives/:hive_id/connectivity
pub async fn swarm_connectivity(
    State(state): State<Arc<AppState>>,
    Path(hive_id): Path<String>,
) -> Result<Json<SwarmConnectivity>, ApiError> {
    state
        .analyzer
        .analyze_swarm_connectivity(&hive_id)
        .map(Json)
        .ok_or_else(|| hive_not_found(&hive_id))
}

/// POST /v1/hives/:hive_id/interferences
pub async fn announce_interference(
    State(state): State<Arc<AppState>>,
    Path(hive_id): Path<String>,
    Json(request): Json<InterferenceRequest>,
) -> Result<Json<InterferenceAnnouncement>, ApiError> {
    state
        .notifier
        .announce_interference(&hive_id, request)
        .await
        .map(Json)
        .map_err(hive_error)
}
