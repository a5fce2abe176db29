//! Read-side REST handlers for the observer server.
//!
//! Factory endpoints serve the persistent store; simulation endpoints
//! serve the live state of prepared factories via the shared
//! [`AppState`]. Lifecycle commands live in [`crate::control`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/factories` | List stored factory ids |
//! | `GET` | `/api/factories/:id` | Read a stored factory snapshot |
//! | `PUT` | `/api/factories/:id` | Persist a factory snapshot |
//! | `GET` | `/api/simulations` | List prepared simulations |
//! | `GET` | `/api/simulations/:id` | Current snapshot of a prepared factory |
//! | `GET` | `/api/simulations/:id/robots` | Per-robot diagnostic rows |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};
use robosim_store::FactoryStore;
use robosim_types::{FactoryId, FactorySnapshot};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing server status and API links.
///
/// This is the placeholder dashboard until the React frontend consumes
/// the `WebSocket` stream directly.
pub async fn index<S: FactoryStore>(State(state): State<Arc<AppState<S>>>) -> impl IntoResponse {
    let stored = state.store.list().await.map_or(0, |ids| ids.len());
    let simulations = state.simulations.read().await;
    let active = simulations.len();
    let running = simulations
        .values()
        .filter(|entry| entry.simulation.is_running())
        .count();
    drop(simulations);

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Robosim Observer</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Robosim Observer</h1>
    <p class="subtitle">Factory simulation control and monitoring server</p>

    <p>Status: <span class="status">RUNNING</span></p>

    <div>
        <div class="metric">
            <div class="label">Stored factories</div>
            <div class="value">{stored}</div>
        </div>
        <div class="metric">
            <div class="label">Prepared</div>
            <div class="value">{active}</div>
        </div>
        <div class="metric">
            <div class="label">Running</div>
            <div class="value">{running}</div>
        </div>
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li>GET <a href="/api/factories">/api/factories</a> -- List stored factory ids</li>
        <li>GET /api/factories/:id -- Read a stored factory snapshot</li>
        <li>PUT /api/factories/:id -- Persist a factory snapshot</li>
        <li>GET <a href="/api/simulations">/api/simulations</a> -- List prepared simulations</li>
        <li>GET /api/simulations/:id -- Current snapshot of a prepared factory</li>
        <li>GET /api/simulations/:id/robots -- Per-robot diagnostics</li>
        <li>POST /api/simulations/:id/prepare -- Load a factory and attach replication</li>
        <li>POST /api/simulations/:id/run -- Start the robot workers</li>
        <li>POST /api/simulations/:id/stop -- Stop the robot workers</li>
        <li>DELETE /api/simulations/:id -- Reset and detach a simulation</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li><code>ws://host:port/ws/simulations/:id</code> -- Live snapshot stream</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/factories -- list stored factory ids
// ---------------------------------------------------------------------------

/// List the ids of every factory in the persistent store.
pub async fn list_factories<S: FactoryStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ObserverError> {
    let ids = state.store.list().await?;

    Ok(Json(serde_json::json!({
        "count": ids.len(),
        "factories": ids,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/factories/:id -- read a stored factory snapshot
// ---------------------------------------------------------------------------

/// Return the stored snapshot for a single factory.
pub async fn get_factory<S: FactoryStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.store.read(&FactoryId::new(id)).await?;
    Ok(Json(snapshot))
}

// ---------------------------------------------------------------------------
// PUT /api/factories/:id -- persist a factory snapshot
// ---------------------------------------------------------------------------

/// Store the snapshot in the request body under the id in the path.
///
/// The path segment is authoritative for the storage key: the snapshot's
/// own id is replaced before persisting.
pub async fn put_factory<S: FactoryStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(mut snapshot): Json<FactorySnapshot>,
) -> Result<impl IntoResponse, ObserverError> {
    snapshot.id = FactoryId::new(id);
    state.store.persist(&snapshot).await?;

    Ok(Json(serde_json::json!({
        "ok": true,
        "id": snapshot.id,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/simulations -- list prepared simulations
// ---------------------------------------------------------------------------

/// List every prepared simulation with its running state and robot count.
pub async fn list_simulations<S: FactoryStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ObserverError> {
    let simulations = state.simulations.read().await;

    let entries: Vec<serde_json::Value> = simulations
        .iter()
        .map(|(id, active)| {
            let factory = active.simulation.factory();
            serde_json::json!({
                "id": id,
                "name": factory.name(),
                "running": factory.is_running(),
                "robots": factory.robot_statuses().len(),
                "subscribers": active.notifier.receiver_count(),
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "count": entries.len(),
        "simulations": entries,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/simulations/:id -- current snapshot of a prepared factory
// ---------------------------------------------------------------------------

/// Return a fresh snapshot of a prepared factory's live state.
pub async fn get_simulation<S: FactoryStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let factory_id = FactoryId::new(id);
    let active = state
        .active(&factory_id)
        .await
        .ok_or_else(|| ObserverError::not_prepared(&factory_id))?;

    Ok(Json(active.simulation.factory().snapshot()))
}

// ---------------------------------------------------------------------------
// GET /api/simulations/:id/robots -- per-robot diagnostics
// ---------------------------------------------------------------------------

/// Return one diagnostic row per robot, including the lively-lock verdict
/// computed against the rest of the floor at request time.
pub async fn list_robots<S: FactoryStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let factory_id = FactoryId::new(id);
    let active = state
        .active(&factory_id)
        .await
        .ok_or_else(|| ObserverError::not_prepared(&factory_id))?;

    let robots = active.simulation.factory().robot_statuses();

    Ok(Json(serde_json::json!({
        "count": robots.len(),
        "robots": robots,
    })))
}
