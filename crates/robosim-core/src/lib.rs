//! Robot behavior engine and simulation scheduling for Robosim.
//!
//! This crate animates a `robosim-model` factory: every robot gets a
//! [`RobotDriver`] that runs its behavior state machine one tick at a
//! time, and a [`Simulation`] schedules one async worker per robot with a
//! shared stop signal. Configuration for tick timing, pathfinding, and the
//! surrounding services loads from `robosim-config.yaml`.
//!
//! # Modules
//!
//! - [`behavior`] -- The per-robot state machine: target cycling, waypoint
//!   following, stand-off resolution
//! - [`config`] -- Configuration loading from `robosim-config.yaml` into
//!   strongly-typed structs
//! - [`simulation`] -- Worker scheduling, start/stop, prompt cancellation

pub mod behavior;
pub mod config;
pub mod simulation;

// Re-export primary types at crate root.
pub use behavior::{MotionStats, PATIENCE_THRESHOLD, RobotDriver, STEP_ASIDE_COOLDOWN};
pub use config::{ConfigError, RobosimConfig};
pub use simulation::Simulation;
