//! Shared type definitions for the Robosim factory simulation.
//!
//! This crate is the single source of truth for the types that cross crate
//! boundaries: identifiers, floor geometry, and the snapshot schema used for
//! persistence and replication. Types defined here flow downstream to
//! `TypeScript` via `ts-rs` for the observer dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Identifier types for factories and components
//! - [`geometry`] -- Positions, rectangles, shapes, and overlap tests
//! - [`snapshot`] -- The full-factory snapshot wire schema

pub mod geometry;
pub mod ids;
pub mod snapshot;

// Re-export all public types at crate root for convenience.
pub use geometry::{Position, Rect, Shape, WallSide};
pub use ids::{ComponentId, FactoryId};
pub use snapshot::{
    ComponentKindSnapshot, ComponentSnapshot, DoorSnapshot, FactorySnapshot, RobotSnapshot,
    RobotStatus,
};
