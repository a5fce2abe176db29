//! Integration tests for the observer API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. The in-memory store backs the state, so the
//! full prepare/run/stop/reset lifecycle runs without touching disk.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use robosim_core::config::SimulationConfig;
use robosim_observer::{AppState, build_router};
use robosim_store::{FactoryStore, InMemoryFactoryStore};
use robosim_types::{
    ComponentId, ComponentKindSnapshot, ComponentSnapshot, FactoryId, FactorySnapshot,
    RobotSnapshot, Shape,
};
use serde_json::Value;
use tokio::sync::broadcast;
use tower::ServiceExt;

// =========================================================================
// Helpers
// =========================================================================

/// One machine and one robot five grid steps apart, so the robot has a
/// clear straight route as soon as the simulation runs.
fn make_snapshot(id: &str) -> FactorySnapshot {
    FactorySnapshot {
        id: FactoryId::new(id),
        name: "Puck Factory".to_owned(),
        width: 200,
        height: 200,
        running: false,
        captured_at: Utc::now(),
        components: vec![
            ComponentSnapshot {
                id: ComponentId::new(),
                name: "Machine 1".to_owned(),
                position: robosim_types::Position::new(25, 5),
                shape: Shape::Rectangle {
                    width: 15,
                    height: 15,
                },
                kind: ComponentKindSnapshot::Machine,
            },
            ComponentSnapshot {
                id: ComponentId::new(),
                name: "Robot 1".to_owned(),
                position: robosim_types::Position::new(5, 5),
                shape: Shape::Circle { radius: 2 },
                kind: ComponentKindSnapshot::Robot(RobotSnapshot {
                    battery_capacity: 10,
                    speed: 5,
                    blocked: false,
                    successful_moves: 0,
                    target_names: vec!["Machine 1".to_owned()],
                    current_target_name: None,
                    memorized_position: None,
                }),
            },
        ],
    }
}

async fn make_test_state() -> Arc<AppState<InMemoryFactoryStore>> {
    let store = InMemoryFactoryStore::new();
    store.persist(&make_snapshot("factory-1")).await.unwrap();

    let config = SimulationConfig {
        tick_interval_ms: 5,
        grid_resolution: 5,
    };
    Arc::new(AppState::new(store, config))
}

async fn send(
    state: &Arc<AppState<InMemoryFactoryStore>>,
    request: Request<Body>,
) -> axum::response::Response {
    build_router(Arc::clone(state)).oneshot(request).await.unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

// =========================================================================
// Status page and store surface
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let state = make_test_state().await;

    let response = send(&state, get("/")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn test_list_factories() {
    let state = make_test_state().await;

    let response = send(&state, get("/api/factories")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["factories"][0], "factory-1");
}

#[tokio::test]
async fn test_get_factory() {
    let state = make_test_state().await;

    let response = send(&state, get("/api/factories/factory-1")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["name"], "Puck Factory");
    assert_eq!(json["components"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_get_factory_not_found() {
    let state = make_test_state().await;

    let response = send(&state, get("/api/factories/no-such-factory")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_put_factory_stores_under_path_id() {
    let state = make_test_state().await;
    let snapshot = make_snapshot("ignored-body-id");

    let request = Request::put("/api/factories/uploaded")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&snapshot).unwrap()))
        .unwrap();
    let response = send(&state, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let stored = state.store.read(&FactoryId::new("uploaded")).await.unwrap();
    assert_eq!(stored.id, FactoryId::new("uploaded"));
    assert_eq!(stored.name, "Puck Factory");
}

#[tokio::test]
async fn test_put_factory_blank_id_is_bad_request() {
    let state = make_test_state().await;
    let snapshot = make_snapshot("factory-1");

    let request = Request::put("/api/factories/%20%20")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&snapshot).unwrap()))
        .unwrap();
    let response = send(&state, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_put_factory_id_with_separator_is_bad_request() {
    let state = make_test_state().await;
    let snapshot = make_snapshot("factory-1");

    // %2F decodes to a slash inside the path segment.
    let request = Request::put("/api/factories/nested%2Ffactory")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&snapshot).unwrap()))
        .unwrap();
    let response = send(&state, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =========================================================================
// Simulation lifecycle
// =========================================================================

#[tokio::test]
async fn test_prepare_registers_a_simulation() {
    let state = make_test_state().await;

    let response = send(&state, post("/api/simulations/factory-1/prepare")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&state, get("/api/simulations")).await;
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["simulations"][0]["id"], "factory-1");
    assert_eq!(json["simulations"][0]["running"], false);
    assert_eq!(json["simulations"][0]["robots"], 1);
}

#[tokio::test]
async fn test_prepare_unknown_factory_not_found() {
    let state = make_test_state().await;

    let response = send(&state, post("/api/simulations/no-such-factory/prepare")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_prepare_twice_rebroadcasts_without_rebuilding() {
    let state = make_test_state().await;
    let id = FactoryId::new("factory-1");

    let response = send(&state, post("/api/simulations/factory-1/prepare")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let first = state.active(&id).await.unwrap();
    let mut receiver = first.notifier.subscribe();

    let response = send(&state, post("/api/simulations/factory-1/prepare")).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Same simulation instance, and the current snapshot was re-sent.
    let second = state.active(&id).await.unwrap();
    assert!(Arc::ptr_eq(&first.simulation, &second.simulation));
    let rebroadcast = receiver.try_recv().unwrap();
    assert_eq!(rebroadcast.id, id);
}

#[tokio::test]
async fn test_run_without_prepare_not_found() {
    let state = make_test_state().await;

    let response = send(&state, post("/api/simulations/factory-1/run")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stop_without_prepare_not_found() {
    let state = make_test_state().await;

    let response = send(&state, post("/api/simulations/factory-1/stop")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reset_without_prepare_not_found() {
    let state = make_test_state().await;

    let response = send(
        &state,
        Request::delete("/api/simulations/factory-1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_run_drives_robots_until_stopped() {
    let state = make_test_state().await;

    let response = send(&state, post("/api/simulations/factory-1/prepare")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(&state, post("/api/simulations/factory-1/run")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut moved = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let response = send(&state, get("/api/simulations/factory-1/robots")).await;
        let json = body_to_json(response.into_body()).await;
        if json["robots"][0]["successful_moves"].as_u64().unwrap_or(0) > 0 {
            moved = true;
            break;
        }
    }
    assert!(moved, "robot never committed a move");

    let response = send(&state, post("/api/simulations/factory-1/stop")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&state, get("/api/simulations/factory-1")).await;
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["running"], false);
}

#[tokio::test]
async fn test_running_simulation_broadcasts_snapshots() {
    let state = make_test_state().await;
    let id = FactoryId::new("factory-1");

    let response = send(&state, post("/api/simulations/factory-1/prepare")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut receiver = state.active(&id).await.unwrap().notifier.subscribe();

    let response = send(&state, post("/api/simulations/factory-1/run")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let moved = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match receiver.recv().await {
                Ok(snapshot) => {
                    if snapshot
                        .robots()
                        .any(|(_, robot)| robot.successful_moves > 0)
                    {
                        break true;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break false,
            }
        }
    })
    .await
    .unwrap();
    assert!(moved, "no snapshot with a committed move arrived");

    let response = send(&state, post("/api/simulations/factory-1/stop")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_reset_detaches_and_closes_the_stream() {
    let state = make_test_state().await;
    let id = FactoryId::new("factory-1");

    let response = send(&state, post("/api/simulations/factory-1/prepare")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut receiver = state.active(&id).await.unwrap().notifier.subscribe();

    let response = send(
        &state,
        Request::delete("/api/simulations/factory-1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&state, get("/api/simulations")).await;
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 0);

    // Draining the receiver ends with a closed channel once the factory
    // and its notifier are dropped.
    let closed = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            match receiver.recv().await {
                Err(broadcast::error::RecvError::Closed) => break true,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            }
        }
    })
    .await
    .unwrap();
    assert!(closed);
}

#[tokio::test]
async fn test_robot_diagnostics_fields() {
    let state = make_test_state().await;

    let response = send(&state, post("/api/simulations/factory-1/prepare")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&state, get("/api/simulations/factory-1/robots")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;

    assert_eq!(json["count"], 1);
    assert_eq!(json["robots"][0]["name"], "Robot 1");
    assert_eq!(json["robots"][0]["blocked"], false);
    assert_eq!(json["robots"][0]["lively_locked"], false);
    assert_eq!(json["robots"][0]["speed"], 5);
}

#[tokio::test]
async fn test_nonexistent_route_returns_404() {
    let state = make_test_state().await;

    let response = send(&state, get("/api/nonexistent")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
