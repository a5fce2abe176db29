//! Error types for the `robosim-model` crate.
//!
//! All fallible operations in this crate return [`ModelError`] through the
//! standard [`Result`] type alias.

use robosim_types::ComponentId;

/// Errors that can occur during factory-floor operations.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A component was not found on the factory floor.
    #[error("component not found: {0}")]
    ComponentNotFound(ComponentId),

    /// An operation expected a robot but found another component kind.
    #[error("component {0} is not a robot")]
    NotARobot(ComponentId),

    /// A door was added whose parent room is not on the floor.
    #[error("door references unknown room: {0}")]
    RoomNotFound(ComponentId),

    /// A robot was added with a target that is not on the floor.
    #[error("robot target not found: {0}")]
    TargetNotFound(ComponentId),
}
