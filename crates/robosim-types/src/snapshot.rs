//! Wire-format snapshots of a factory and everything on its floor.
//!
//! A [`FactorySnapshot`] is the unit of replication: the server publishes one
//! full snapshot per observed change, and consumers replace their view
//! wholesale rather than applying deltas. The same schema is written to the
//! persistent store, so a snapshot is also the serialized form of a factory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geometry::{Position, Shape, WallSide};
use crate::ids::{ComponentId, FactoryId};

/// Full state of a factory at a single observation point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FactorySnapshot {
    /// Identifier of the factory, also the replication and persistence key.
    pub id: FactoryId,
    /// Human-readable factory name.
    pub name: String,
    /// Horizontal extent of the factory floor.
    pub width: i32,
    /// Vertical extent of the factory floor.
    pub height: i32,
    /// Whether the simulation was running when the snapshot was taken.
    pub running: bool,
    /// Wall-clock time the snapshot was taken.
    pub captured_at: DateTime<Utc>,
    /// Every component on the floor, in insertion order.
    pub components: Vec<ComponentSnapshot>,
}

impl FactorySnapshot {
    /// Iterate over the robot components of the snapshot.
    pub fn robots(&self) -> impl Iterator<Item = (&ComponentSnapshot, &RobotSnapshot)> {
        self.components.iter().filter_map(|component| {
            if let ComponentKindSnapshot::Robot(robot) = &component.kind {
                Some((component, robot))
            } else {
                None
            }
        })
    }
}

/// One component on the factory floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ComponentSnapshot {
    /// Stable identifier of the component.
    pub id: ComponentId,
    /// Component name, unique within a factory for robot targets.
    pub name: String,
    /// Top-left corner of the component's bounding rectangle.
    pub position: Position,
    /// Outline of the component.
    pub shape: Shape,
    /// Kind tag plus kind-specific state.
    pub kind: ComponentKindSnapshot,
}

/// Kind-specific payload of a [`ComponentSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ComponentKindSnapshot {
    /// A walled room. Walls block movement except at door openings.
    Room,
    /// An opening cut into a room wall.
    Door(DoorSnapshot),
    /// A marked region of the floor with no collision behavior.
    Area,
    /// A production machine, a typical robot target.
    Machine,
    /// A conveyor, a typical robot target.
    Conveyor,
    /// A charging station robots can dock onto.
    ChargingStation,
    /// A mobile robot and its behavioral state.
    Robot(RobotSnapshot),
}

/// Door placement and state within its parent room's wall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DoorSnapshot {
    /// Identifier of the room this door belongs to.
    pub room_id: ComponentId,
    /// Which wall of the room the door is cut into.
    pub side: WallSide,
    /// Distance of the opening from the wall's starting corner.
    pub offset: i32,
    /// Length of the opening along the wall.
    pub size: i32,
    /// Whether the opening is passable.
    pub open: bool,
}

/// Behavioral state of a robot, as visible to observers.
///
/// Targets are referenced by component name rather than identifier so that
/// uploaded factory definitions can express them without knowing the
/// generated identifiers of their targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RobotSnapshot {
    /// Battery capacity in charge units.
    pub battery_capacity: u32,
    /// Maximum distance covered per simulation tick.
    pub speed: i32,
    /// Whether the robot failed to progress on its most recent tick.
    pub blocked: bool,
    /// Number of committed moves since the robot was created.
    pub successful_moves: u64,
    /// Names of the target components the robot cycles through.
    pub target_names: Vec<String>,
    /// Name of the target the robot is currently travelling towards.
    pub current_target_name: Option<String>,
    /// Rejected destination the robot will retry before planning further.
    pub memorized_position: Option<Position>,
}

/// Per-robot diagnostic row served by the observer API.
///
/// Unlike [`RobotSnapshot`] this includes the lively-lock verdict, which is
/// computed against the rest of the floor at request time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RobotStatus {
    /// Stable identifier of the robot.
    pub id: ComponentId,
    /// Robot name.
    pub name: String,
    /// Current position on the floor.
    pub position: Position,
    /// Whether the robot failed to progress on its most recent tick.
    pub blocked: bool,
    /// Whether the robot is in a mutual stand-off with another robot.
    pub lively_locked: bool,
    /// Battery capacity in charge units.
    pub battery_capacity: u32,
    /// Maximum distance covered per simulation tick.
    pub speed: i32,
    /// Number of committed moves since the robot was created.
    pub successful_moves: u64,
    /// Rejected destination the robot will retry before planning further.
    pub memorized_position: Option<Position>,
    /// Name of the target the robot is currently travelling towards.
    pub current_target_name: Option<String>,
}
