//! Components that populate a factory floor.
//!
//! A [`Component`] pairs identity and placement with a [`ComponentKind`]
//! payload. Robots are the only mobile kind; everything else stays where the
//! floor layout put it. Collision semantics live here as well: which kinds
//! tolerate being overlaid, and how room walls with door openings block
//! probes.

use robosim_types::{ComponentId, Position, Rect, Shape, WallSide};

/// Thickness of a room's wall band, in factory units.
///
/// Matches the default pathfinding grid resolution so a wall occupies
/// exactly one grid cell in depth.
pub const WALL_THICKNESS: i32 = 5;

/// One entity on the factory floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Stable identifier of the component.
    pub id: ComponentId,
    /// Component name. Robot targets are resolved by name on hydration, so
    /// names should be unique within a factory.
    pub name: String,
    /// Top-left corner of the component's bounding rectangle.
    pub position: Position,
    /// Outline of the component.
    pub shape: Shape,
    /// Kind tag plus kind-specific state.
    pub kind: ComponentKind,
}

impl Component {
    /// Create a component with a fresh identifier.
    pub fn new(
        name: impl Into<String>,
        position: Position,
        shape: Shape,
        kind: ComponentKind,
    ) -> Self {
        Self {
            id: ComponentId::new(),
            name: name.into(),
            position,
            shape,
            kind,
        }
    }

    /// The component's current bounding rectangle.
    pub fn footprint(&self) -> Rect {
        self.shape.bounding_rect(self.position)
    }

    /// Whether the component moves during simulation.
    pub const fn is_mobile(&self) -> bool {
        matches!(self.kind, ComponentKind::Robot(_))
    }

    /// The robot payload, if this component is a robot.
    pub const fn as_robot(&self) -> Option<&RobotUnit> {
        match &self.kind {
            ComponentKind::Robot(robot) => Some(robot),
            _ => None,
        }
    }

    /// Mutable access to the robot payload, if this component is a robot.
    pub const fn as_robot_mut(&mut self) -> Option<&mut RobotUnit> {
        match &mut self.kind {
            ComponentKind::Robot(robot) => Some(robot),
            _ => None,
        }
    }
}

/// Kind-specific payload of a [`Component`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentKind {
    /// A walled room. Walls block movement except at open door openings.
    Room,
    /// An opening cut into a room wall.
    Door(Door),
    /// A marked region of the floor with no collision behavior.
    Area,
    /// A production machine, a typical robot target.
    Machine,
    /// A conveyor, a typical robot target.
    Conveyor,
    /// A charging station robots can dock onto.
    ChargingStation,
    /// A mobile robot and its shared behavioral state.
    Robot(RobotUnit),
}

/// Door placement within its parent room's wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Door {
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

impl Door {
    /// The rectangle the opening occupies within the given room bounds.
    ///
    /// Horizontal walls measure the offset from the room's left corner,
    /// vertical walls from the top corner. The opening is exactly as deep
    /// as the wall band.
    pub const fn opening_rect(&self, room: Rect) -> Rect {
        match self.side {
            WallSide::Top => Rect::new(
                room.x.saturating_add(self.offset),
                room.y,
                self.size,
                WALL_THICKNESS,
            ),
            WallSide::Bottom => Rect::new(
                room.x.saturating_add(self.offset),
                room.bottom().saturating_sub(WALL_THICKNESS),
                self.size,
                WALL_THICKNESS,
            ),
            WallSide::Left => Rect::new(
                room.x,
                room.y.saturating_add(self.offset),
                WALL_THICKNESS,
                self.size,
            ),
            WallSide::Right => Rect::new(
                room.right().saturating_sub(WALL_THICKNESS),
                room.y.saturating_add(self.offset),
                WALL_THICKNESS,
                self.size,
            ),
        }
    }
}

/// The four wall bands of a room's bounding rectangle.
pub(crate) const fn wall_bands(room: Rect) -> [Rect; 4] {
    [
        Rect::new(room.x, room.y, room.width, WALL_THICKNESS),
        Rect::new(
            room.x,
            room.bottom().saturating_sub(WALL_THICKNESS),
            room.width,
            WALL_THICKNESS,
        ),
        Rect::new(room.x, room.y, WALL_THICKNESS, room.height),
        Rect::new(
            room.right().saturating_sub(WALL_THICKNESS),
            room.y,
            WALL_THICKNESS,
            room.height,
        ),
    ]
}

/// Shared behavioral state of a robot.
///
/// Fields here are visible to other robots through the factory monitor
/// (lively-lock detection reads the memorized position) and to observers
/// through snapshots. Worker-private planning state, like the current path,
/// lives with the driver that ticks the robot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotUnit {
    /// Battery capacity in charge units.
    pub battery_capacity: u32,
    /// Maximum distance covered per simulation tick.
    pub speed: i32,
    /// Whether the robot failed to progress on its most recent tick.
    pub blocked: bool,
    /// Number of committed moves since the robot was created.
    pub successful_moves: u64,
    /// Targets the robot visits in round-robin order.
    pub target_ids: Vec<ComponentId>,
    /// Target the robot is currently travelling towards.
    pub current_target: Option<ComponentId>,
    /// Rejected destination the robot will retry before planning further.
    pub memorized_position: Option<Position>,
}

impl RobotUnit {
    /// Default travel speed in factory units per tick.
    pub const DEFAULT_SPEED: i32 = 5;

    /// Create a robot unit with the default speed and no progress yet.
    pub const fn new(battery_capacity: u32, target_ids: Vec<ComponentId>) -> Self {
        Self {
            battery_capacity,
            speed: Self::DEFAULT_SPEED,
            blocked: false,
            successful_moves: 0,
            target_ids,
            current_target: None,
            memorized_position: None,
        }
    }
}
