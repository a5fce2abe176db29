//! Simulation service binary for Robosim.
//!
//! This is the entry point that wires together the factory store, the
//! observer API, and NATS snapshot replication. Factories are uploaded
//! and simulated through the HTTP control surface; every prepared
//! simulation broadcasts full snapshots that the observer streams over
//! WebSocket and, when enabled, this binary forwards to NATS.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `robosim-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Open the factory store and seed the demo factory
//! 4. Connect to NATS when replication is enabled
//! 5. Assemble the observer state with the replication hook
//! 6. Serve the observer API

use std::path::Path;
use std::sync::Arc;

use robosim_core::config::{RobosimConfig, StorageConfig};
use robosim_engine::error::EngineError;
use robosim_engine::replication::SnapshotReplicator;
use robosim_model::create_demo_factory;
use robosim_observer::{AppState, PrepareHook};
use robosim_store::{FactoryStore, FileFactoryStore};
use robosim_types::FactoryId;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application entry point for the simulation service.
///
/// Initializes all subsystems and serves the observer API until the
/// process is terminated. Returns an error code on failure.
///
/// # Errors
///
/// Returns an error if any initialization step or the server itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. This runs before logging is initialized
    //    because the log level itself comes from the config file.
    let (config, config_source) = load_config()?;

    // 2. Initialize structured logging. RUST_LOG overrides the config level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with_target(true)
        .init();

    info!("robosim-engine starting");
    info!(
        source = config_source,
        host = config.server.host,
        port = config.server.port,
        tick_interval_ms = config.simulation.tick_interval_ms,
        grid_resolution = config.simulation.grid_resolution,
        replication_enabled = config.replication.enabled,
        "Configuration loaded"
    );

    // 3. Open the factory store and seed the demo factory.
    let store = open_store(&config.storage).await?;

    // 4 + 5. Assemble the observer state, attaching the replication hook
    //        when NATS is reachable. A broker outage downgrades the
    //        service to local-only observation instead of failing startup.
    let sim_config = config.simulation.clone();
    let state = if config.replication.enabled {
        match SnapshotReplicator::connect(&config.replication.nats_url).await {
            Ok(replicator) => {
                let hook: PrepareHook = Box::new(move |factory_id, active| {
                    replicator.forward(factory_id, &active.notifier);
                });
                Arc::new(AppState::with_prepare_hook(store, sim_config, hook))
            }
            Err(e) => {
                warn!(error = %e, "NATS unavailable, snapshot replication disabled");
                Arc::new(AppState::new(store, sim_config))
            }
        }
    } else {
        info!("Snapshot replication disabled by configuration");
        Arc::new(AppState::new(store, sim_config))
    };

    // 6. Serve the observer API until the process is terminated.
    robosim_observer::start_server(&config.server, state)
        .await
        .map_err(|e| EngineError::Server {
            message: format!("{e}"),
        })?;

    Ok(())
}

/// Load the service configuration from `robosim-config.yaml`.
///
/// Looks for the config file relative to the current working directory
/// and falls back to defaults when it is missing. Returns the
/// configuration plus a label describing where it came from, so the
/// caller can log it once logging is up.
fn load_config() -> Result<(RobosimConfig, &'static str), EngineError> {
    let config_path = Path::new("robosim-config.yaml");
    if config_path.exists() {
        let config = RobosimConfig::from_file(config_path)?;
        Ok((config, "robosim-config.yaml"))
    } else {
        Ok((RobosimConfig::default(), "defaults"))
    }
}

/// Open the file-backed factory store, seeding the demo factory when the
/// store holds nothing at all.
///
/// Seeding only on an empty store means a deliberately deleted demo
/// factory stays deleted across restarts.
async fn open_store(config: &StorageConfig) -> Result<FileFactoryStore, EngineError> {
    let store = FileFactoryStore::new(&config.data_dir);
    let stored = store.list().await?;
    info!(
        data_dir = config.data_dir,
        stored = stored.len(),
        "Factory store opened"
    );

    if stored.is_empty() {
        let demo_id = FactoryId::new("demo-factory");
        let (factory, _) = create_demo_factory(demo_id.clone())?;
        store.persist(&factory.snapshot()).await?;
        info!(factory_id = %demo_id, "Demo factory seeded");
    }

    Ok(store)
}
