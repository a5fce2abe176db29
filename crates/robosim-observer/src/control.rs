//! Simulation lifecycle handlers.
//!
//! These endpoints move a factory between the persistent store and the
//! registry of live simulations. They are the only write authority over
//! the registry; the read endpoints in [`crate::handlers`] never mutate
//! it.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/simulations/:id/prepare` | Load the factory and attach replication |
//! | `POST` | `/api/simulations/:id/run` | Set the running flag and spawn robot workers |
//! | `POST` | `/api/simulations/:id/stop` | Clear the running flag and join the workers |
//! | `DELETE` | `/api/simulations/:id` | Stop if needed and drop the simulation |

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use robosim_core::Simulation;
use robosim_model::{BroadcastNotifier, Factory, GridPathFinder, PathFinder};
use robosim_store::FactoryStore;
use robosim_types::FactoryId;
use tracing::info;

use crate::error::ObserverError;
use crate::state::{ActiveSimulation, AppState, SNAPSHOT_CHANNEL_CAPACITY};

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct ControlResponse {
    /// Whether the operation succeeded.
    ok: bool,
    /// Human-readable message.
    message: String,
}

// ---------------------------------------------------------------------------
// POST /api/simulations/:id/prepare
// ---------------------------------------------------------------------------

/// Load a factory from the store and register it as a live simulation.
///
/// The factory is hydrated from its stored snapshot, wired to a fresh
/// broadcast channel, and given a path finder built from the configured
/// grid resolution. The initial snapshot is broadcast before the handler
/// returns, after the prepare hook has had a chance to subscribe. Robots
/// do not tick until [`run`] is called.
///
/// Preparing an id that is already live does not rebuild anything; the
/// current snapshot is re-broadcast so late consumers can sync.
pub async fn prepare<S: FactoryStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let factory_id = FactoryId::new(id);

    // Hold the registry lock across the load so two concurrent prepares
    // cannot both build the same factory.
    let mut simulations = state.simulations.write().await;

    if let Some(active) = simulations.get(&factory_id) {
        active.simulation.factory().notify_observers();
        return Ok(Json(ControlResponse {
            ok: true,
            message: "Simulation already prepared, snapshot re-broadcast".to_owned(),
        }));
    }

    let snapshot = state.store.read(&factory_id).await?;

    let notifier = BroadcastNotifier::new(SNAPSHOT_CHANNEL_CAPACITY);
    let mut factory = Factory::from_snapshot(&snapshot);
    factory.set_notifier(Box::new(notifier.clone()));
    let factory = Arc::new(factory);

    let path_finder: Arc<dyn PathFinder> =
        Arc::new(GridPathFinder::new(state.config.grid_resolution));
    let simulation = Arc::new(Simulation::new(
        Arc::clone(&factory),
        path_finder,
        Duration::from_millis(state.config.tick_interval_ms),
    ));

    let active = ActiveSimulation {
        simulation,
        notifier,
    };

    // Attach replication before the initial broadcast so the first
    // snapshot is not lost.
    if let Some(hook) = &state.on_prepare {
        hook(&factory_id, &active);
    }
    factory.notify_observers();

    let robots = factory.robot_statuses().len();
    info!(factory = %factory_id, robots, "Simulation prepared");

    simulations.insert(factory_id, active);

    Ok(Json(ControlResponse {
        ok: true,
        message: format!("Simulation prepared with {robots} robots"),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/simulations/:id/run
// ---------------------------------------------------------------------------

/// Start the robot workers of a prepared simulation.
///
/// Sets the factory's running flag and spawns one worker per robot.
/// Running an already running simulation is a no-op.
pub async fn run<S: FactoryStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let factory_id = FactoryId::new(id);
    let active = state
        .active(&factory_id)
        .await
        .ok_or_else(|| ObserverError::not_prepared(&factory_id))?;

    active.simulation.start();
    info!(factory = %factory_id, "Simulation running");

    Ok(Json(ControlResponse {
        ok: true,
        message: "Simulation running".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/simulations/:id/stop
// ---------------------------------------------------------------------------

/// Stop the robot workers of a prepared simulation.
///
/// Clears the running flag, wakes every sleeping worker, and waits for
/// the worker tasks to finish before responding. The simulation stays
/// registered and can be run again.
pub async fn stop<S: FactoryStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let factory_id = FactoryId::new(id);
    let active = state
        .active(&factory_id)
        .await
        .ok_or_else(|| ObserverError::not_prepared(&factory_id))?;

    active.simulation.stop();
    active.simulation.wait_until_stopped().await;
    info!(factory = %factory_id, "Simulation stopped");

    Ok(Json(ControlResponse {
        ok: true,
        message: "Simulation stopped".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// DELETE /api/simulations/:id
// ---------------------------------------------------------------------------

/// Stop a simulation if needed and remove it from the registry.
///
/// Dropping the registry entry releases the factory and closes its
/// snapshot channel, so `WebSocket` sessions and the replication
/// forwarder observe a clean end of stream.
pub async fn reset<S: FactoryStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let factory_id = FactoryId::new(id);
    let removed = state.simulations.write().await.remove(&factory_id);
    let Some(active) = removed else {
        return Err(ObserverError::not_prepared(&factory_id));
    };

    active.simulation.stop();
    active.simulation.wait_until_stopped().await;
    info!(factory = %factory_id, "Simulation reset");

    Ok(Json(ControlResponse {
        ok: true,
        message: "Simulation reset".to_owned(),
    }))
}
