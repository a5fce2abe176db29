//! Axum router construction for the observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use robosim_store::FactoryStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::control;
use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/simulations/:id` -- `WebSocket` snapshot stream
/// - `GET /api/factories` -- list stored factory ids
/// - `GET|PUT /api/factories/:id` -- read or persist a factory snapshot
/// - `GET /api/simulations` -- list prepared simulations
/// - `GET|DELETE /api/simulations/:id` -- live snapshot, or reset
/// - `GET /api/simulations/:id/robots` -- per-robot diagnostics
/// - `POST /api/simulations/:id/prepare|run|stop` -- lifecycle commands
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router<S: FactoryStore + 'static>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router: Router<Arc<AppState<S>>> = Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/simulations/{id}", get(ws::ws_simulation))
        // Store surface
        .route("/api/factories", get(handlers::list_factories))
        .route(
            "/api/factories/{id}",
            get(handlers::get_factory).put(handlers::put_factory),
        )
        // Simulation surface
        .route("/api/simulations", get(handlers::list_simulations))
        .route(
            "/api/simulations/{id}",
            get(handlers::get_simulation).delete(control::reset),
        )
        .route("/api/simulations/{id}/robots", get(handlers::list_robots))
        .route("/api/simulations/{id}/prepare", post(control::prepare))
        .route("/api/simulations/{id}/run", post(control::run))
        .route("/api/simulations/{id}/stop", post(control::stop))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    router.with_state(state)
}
