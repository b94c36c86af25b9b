use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::{api, config::Config, notify::DroneNotifier, state::AppState};

fn setup_app() -> (axum::Router, Arc<AppState>) {
    let config = Config {
        topology_seed: Some(42),
        ..Config::default()
    };
    let state = Arc::new(AppState::with_notifier(config, DroneNotifier::Store));
    let app = api::routes().with_state(state.clone());
    (app, state)
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = if status == StatusCode::NO_CONTENT || status == StatusCode::ACCEPTED {
        Value::Null
    } else {
        read_json(response).await
    };
    (status, body)
}

async fn seed_chain(app: &axum::Router) {
    for drone in [
        json!({"id": "relay1", "drone_type": "relay",
               "connections": [{"target_drone_id": "relay2", "weight": 1.0}]}),
        json!({"id": "relay2", "drone_type": "relay",
               "connections": [{"target_drone_id": "target", "weight": 1.0}]}),
        json!({"id": "target"}),
    ] {
        let (status, _) = send(app, json_request("PUT", "/v1/drones", drone)).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = send(app, json_request("POST", "/v1/hives", json!({"id": "H1"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/v1/hives/H1/drones",
            json!({"drone_ids": ["relay1", "relay2", "target"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["joined"], 3);
    let (status, _) = send(
        app,
        json_request("PUT", "/v1/hives/H1/entry-relays", json!({"relay_ids": ["relay1"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn upsert_reports_new_then_existing() {
    let (app, _state) = setup_app();
    let drone = json!({"id": "D1", "connections": [{"target_drone_id": "D2", "weight": 3.0}]});

    let (status, body) = send(&app, json_request("PUT", "/v1/drones", drone.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["is_new"], true);
    assert_eq!(body["drone"]["connections"][0]["weight"], 1.0);

    let (status, body) = send(&app, json_request("PUT", "/v1/drones", drone)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_new"], false);
}

#[tokio::test]
async fn response_echoes_request_id() {
    let (app, _state) = setup_app();
    let request = Request::builder()
        .uri("/v1/drones")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-123");
}

#[tokio::test]
async fn connection_analysis_over_chain() {
    let (app, _state) = setup_app();
    seed_chain(&app).await;

    let (status, body) = send(&app, get("/v1/drones/target/connection?minimum_weight=0.5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_connect"], true);
    assert_eq!(body["path"], json!(["relay1", "relay2", "target"]));
    assert_eq!(body["hop_count"], 2);

    let (status, _) = send(&app, get("/v1/drones/target/connection?minimum_weight=2")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn route_then_poll_commands() {
    let (app, _state) = setup_app();
    seed_chain(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/v1/commands/route",
            json!({"command": {"target_drone_id": "target", "type": "STOP"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["relays_used"], 2);

    let (_, queued) = send(&app, get("/v1/drones/relay1/commands")).await;
    assert_eq!(queued.as_array().unwrap().len(), 1);
    assert_eq!(queued[0]["type"], "RELAY");
    assert_eq!(queued[0]["next_hop_drone_id"], "relay2");

    let (_, next) = send(&app, get("/v1/drones/relay1/commands/next")).await;
    assert_eq!(next["command_id"], queued[0]["command_id"]);
    let (_, empty) = send(&app, get("/v1/drones/relay1/commands/next")).await;
    assert!(empty.is_null());

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/v1/commands/route",
            json!({"command": {"target_drone_id": "ghost", "type": "STOP"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn join_conflict_is_reported_per_drone() {
    let (app, _state) = setup_app();
    seed_chain(&app).await;
    send(&app, json_request("POST", "/v1/hives", json!({"id": "H2"}))).await;

    let (status, body) = send(
        &app,
        json_request("POST", "/v1/hives/H2/drones", json!({"drone_ids": ["target"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["results"][0]["success"], false);

    let (status, _) = send(
        &app,
        json_request("POST", "/v1/hives/H9/drones", json!({"drone_ids": ["target"]})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rebuild_and_inspect_connectivity() {
    let (app, _state) = setup_app();
    seed_chain(&app).await;

    let (status, body) = send(
        &app,
        json_request("POST", "/v1/hives/H1/topology", json!({"topology": "mesh", "weight": 0.9})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed_edges"], 2);
    assert_eq!(body["created_edges"], 6);

    let (status, body) = send(&app, get("/v1/hives/H1/connectivity")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connected_components"], 1);
    assert_eq!(body["is_fully_connected"], true);

    let (_, body) = send(&app, get("/v1/hives/H1/drones/relay1/connected")).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/v1/hives/H1/topology",
            json!({"topology": "star", "hub_id": "nope"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["warning"].is_string());
    assert_eq!(body["created_edges"], 0);
}

#[tokio::test]
async fn rebuild_rejects_drones_outside_the_hive() {
    let (app, state) = setup_app();
    seed_chain(&app).await;
    let (status, _) = send(
        &app,
        json_request(
            "PUT",
            "/v1/drones",
            json!({"id": "outsider",
                   "connections": [{"target_drone_id": "target", "weight": 0.7}]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/v1/hives/H1/topology",
            json!({"topology": "mesh", "drone_ids": ["relay1", "outsider"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("outsider"));

    // Nothing was torn down
    let outsider = state.drones.get_by_id("outsider").unwrap();
    assert!(outsider.has_connection_to("target"));
    let relay1 = state.drones.get_by_id("relay1").unwrap();
    assert!(relay1.has_connection_to("relay2"));
}

#[tokio::test]
async fn degrade_single_and_batch() {
    let (app, state) = setup_app();
    seed_chain(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            "/v1/connections",
            json!({"from_drone_id": "relay2", "to_drone_id": "target", "weight": 0.2}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], 1);
    assert_eq!(state.connections.get_weight("relay2", "target"), Some(0.2));

    let (_, body) = send(
        &app,
        json_request(
            "PUT",
            "/v1/connections",
            json!([
                {"from_drone_id": "relay1", "to_drone_id": "relay2", "weight": 0.4},
                {"from_drone_id": "target", "to_drone_id": "relay1", "weight": 0.4}
            ]),
        ),
    )
    .await;
    assert_eq!(body["applied"], 1);
    assert_eq!(body["failed"], 1);

    let (_, body) = send(&app, get("/v1/drones/target/connection")).await;
    assert_eq!(body["can_connect"], false);
}

#[tokio::test]
async fn interference_reaches_every_member() {
    let (app, _state) = setup_app();
    seed_chain(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/v1/hives/H1/interferences",
            json!({"description": "rf noise", "lat": 1.0, "lon": 2.0, "radius_m": 50.0, "strength": 0.7}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivered"], 3);

    let (_, seen) = send(&app, get("/v1/drones/target/interferences")).await;
    assert_eq!(seen.as_array().unwrap().len(), 1);
    assert_eq!(seen[0]["description"], "rf noise");
}

#[tokio::test]
async fn telemetry_for_unknown_drone_is_rejected() {
    let (app, state) = setup_app();
    seed_chain(&app).await;

    let report = json!({"lat": 1.0, "lon": 2.0, "altitude_m": 40.0, "battery_pct": 80.0});
    let (status, _) = send(&app, json_request("POST", "/v1/drones/target/telemetry", report.clone())).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(state.store().latest_telemetry("target").unwrap().altitude_m, 40.0);

    let (status, _) = send(&app, json_request("POST", "/v1/drones/ghost/telemetry", report)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_hive_frees_its_drones() {
    let (app, state) = setup_app();
    seed_chain(&app).await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/v1/hives/H1")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(state.hives.hive_of("relay1").is_none());

    let (status, _) = send(&app, get("/v1/hives/H1/connectivity")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
