//! Observer API server for the Robosim factory simulation.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/simulations/:id`) streaming full
//!   [`robosim_types::FactorySnapshot`] frames, one per observable change
//! - **Store endpoints** for uploading, listing, and reading persisted
//!   factories
//! - **Lifecycle endpoints** for preparing, running, stopping, and
//!   resetting simulations
//! - **Minimal HTML status page** (`GET /`)
//!
//! # Architecture
//!
//! The observer is generic over the [`robosim_store::FactoryStore`]
//! backend, so the same router serves the file-backed production store
//! and the in-memory store used in tests. Each prepared factory owns a
//! broadcast channel; `WebSocket` sessions and the replication forwarder
//! subscribe to it and observe a clean end of stream when the simulation
//! is reset.

pub mod control;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod view;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::{ActiveSimulation, AppState, PrepareHook, SNAPSHOT_CHANNEL_CAPACITY};
pub use view::RemoteFactoryView;
