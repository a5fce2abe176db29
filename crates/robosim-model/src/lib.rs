//! Factory floor model, movement arbitration, and pathfinding for Robosim.
//!
//! This crate owns the shared state of a simulated factory: the component
//! arena, the movement monitor that keeps mobile components from overlapping,
//! the change-notification fan-out, and the grid pathfinder robots plan with.
//! Robot decision making lives upstream in `robosim-core`; everything it
//! reads or writes about the floor goes through [`Factory`].
//!
//! # Modules
//!
//! - [`component`] -- Component arena entries and collision semantics
//! - [`demo`] -- The demonstration puck factory layout
//! - [`error`] -- Error types for floor operations
//! - [`factory`] -- [`Factory`], the floor monitor and snapshot source
//! - [`motion`] -- Move requests and arbitration verdicts
//! - [`notify`] -- Change notification fan-out to observers
//! - [`pathfinder`] -- The [`PathFinder`] seam and the grid Dijkstra planner

pub mod component;
pub mod demo;
pub mod error;
pub mod factory;
pub mod motion;
pub mod notify;
pub mod pathfinder;

// Re-export primary types at crate root.
pub use component::{Component, ComponentKind, Door, RobotUnit, WALL_THICKNESS};
pub use demo::{DemoComponentIds, create_demo_factory};
pub use error::ModelError;
pub use factory::{Factory, RobotView};
pub use motion::{Motion, MoveOutcome};
pub use notify::{BroadcastNotifier, ChangeNotifier, NoopNotifier};
pub use pathfinder::{GridPathFinder, PathFinder};
