//! Shared application state for the observer API server.
//!
//! [`AppState`] couples the persistent factory store with the registry of
//! prepared simulations. Each prepared factory carries its own broadcast
//! channel so `WebSocket` sessions and the replication forwarder see the
//! snapshots of exactly one factory.

use std::collections::BTreeMap;
use std::sync::Arc;

use robosim_core::Simulation;
use robosim_core::config::SimulationConfig;
use robosim_model::BroadcastNotifier;
use robosim_store::FactoryStore;
use robosim_types::FactoryId;
use tokio::sync::RwLock;

/// Capacity of each per-factory snapshot broadcast channel.
///
/// A subscriber that falls behind by more than this many snapshots
/// receives a lag error and resumes from the newest one, which is safe
/// because every snapshot carries the full factory state.
pub const SNAPSHOT_CHANNEL_CAPACITY: usize = 256;

/// Hook invoked once when a factory is prepared, before the initial
/// snapshot broadcast. The engine uses it to attach the replication
/// forwarder to the new simulation's channel.
pub type PrepareHook = Box<dyn Fn(&FactoryId, &ActiveSimulation) + Send + Sync>;

/// A prepared factory simulation and its snapshot fan-out.
#[derive(Debug, Clone)]
pub struct ActiveSimulation {
    /// The simulation driving the factory.
    pub simulation: Arc<Simulation>,
    /// Broadcast channel the factory publishes snapshots to.
    pub notifier: BroadcastNotifier,
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. The
/// store is the persistence backend; `simulations` tracks every prepared
/// factory by id until it is reset.
pub struct AppState<S> {
    /// Persistent factory store.
    pub store: S,
    /// Scheduling parameters applied when a simulation is prepared.
    pub config: SimulationConfig,
    /// Prepared simulations keyed by factory id.
    pub simulations: RwLock<BTreeMap<FactoryId, ActiveSimulation>>,
    /// Optional hook run when a simulation is prepared.
    pub on_prepare: Option<PrepareHook>,
}

impl<S: FactoryStore> AppState<S> {
    /// Create application state around a store.
    pub fn new(store: S, config: SimulationConfig) -> Self {
        Self {
            store,
            config,
            simulations: RwLock::new(BTreeMap::new()),
            on_prepare: None,
        }
    }

    /// Create application state with a prepare hook attached.
    pub fn with_prepare_hook(store: S, config: SimulationConfig, hook: PrepareHook) -> Self {
        Self {
            store,
            config,
            simulations: RwLock::new(BTreeMap::new()),
            on_prepare: Some(hook),
        }
    }

    /// Look up the prepared simulation for `id`.
    pub async fn active(&self, id: &FactoryId) -> Option<ActiveSimulation> {
        self.simulations.read().await.get(id).cloned()
    }
}
