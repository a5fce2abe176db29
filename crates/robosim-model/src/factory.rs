//! The factory floor and its movement monitor.
//!
//! A [`Factory`] owns every component on the floor inside a single mutex.
//! All movement goes through [`Factory::move_component`], the one critical
//! section in the system: it validates the destination against every other
//! mobile component and commits or rejects the move atomically. Probe
//! methods take the same lock briefly, so robot workers always observe a
//! consistent floor.
//!
//! Obstacle semantics: only room walls block. Machines, conveyors, areas,
//! charging stations, and open door openings all tolerate being overlaid,
//! which is what lets a robot dock onto its target. Robots block each other
//! through the mobile-component check, not the obstacle check.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use robosim_types::{
    ComponentId, ComponentKindSnapshot, ComponentSnapshot, DoorSnapshot, FactoryId,
    FactorySnapshot, Position, Rect, RobotSnapshot, RobotStatus,
};
use tracing::{debug, trace, warn};

use crate::component::{Component, ComponentKind, Door, RobotUnit, wall_bands};
use crate::error::ModelError;
use crate::motion::{Motion, MoveOutcome};
use crate::notify::{ChangeNotifier, NoopNotifier};

/// Side of the square probe used to identify a mobile component at a point.
const POINT_PROBE_SIZE: i32 = 2;

/// Everything that lives on the factory floor, guarded by the factory mutex.
#[derive(Debug)]
pub(crate) struct Floor {
    /// All components in insertion order. Insertion order is visible in
    /// snapshots and drives the deterministic scan order of probes.
    components: Vec<Component>,
}

impl Floor {
    pub(crate) fn find(&self, id: ComponentId) -> Option<&Component> {
        self.components.iter().find(|component| component.id == id)
    }

    fn find_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        self.components
            .iter_mut()
            .find(|component| component.id == id)
    }

    fn find_by_name(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|component| component.name == name)
    }

    pub(crate) fn components(&self) -> &[Component] {
        &self.components
    }

    /// Whether any immobile component refuses to be overlaid by `probe`.
    pub(crate) fn rect_blocked(&self, probe: Rect) -> bool {
        self.components
            .iter()
            .any(|component| self.component_blocks(component, probe))
    }

    /// Walls are the only thing that blocks: a probe overlapping a room's
    /// wall band is blocked unless it fits entirely inside an open door.
    fn component_blocks(&self, component: &Component, probe: Rect) -> bool {
        if !matches!(component.kind, ComponentKind::Room) {
            return false;
        }
        let room = component.footprint();
        if !wall_bands(room).iter().any(|band| band.overlaps(probe)) {
            return false;
        }
        !self
            .doors_of(component.id)
            .any(|door| door.open && door.opening_rect(room).contains_rect(probe))
    }

    fn doors_of(&self, room_id: ComponentId) -> impl Iterator<Item = &Door> {
        self.components.iter().filter_map(move |component| {
            match &component.kind {
                ComponentKind::Door(door) if door.room_id == room_id => Some(door),
                _ => None,
            }
        })
    }

    /// First mobile component other than `ignore` whose footprint overlaps
    /// `probe`.
    pub(crate) fn mobile_overlap(
        &self,
        probe: Rect,
        ignore: Option<ComponentId>,
    ) -> Option<&Component> {
        self.components.iter().find(|component| {
            Some(component.id) != ignore
                && component.is_mobile()
                && component.footprint().overlaps(probe)
        })
    }

    fn mobile_at_point(
        &self,
        position: Position,
        ignore: Option<ComponentId>,
    ) -> Option<&Component> {
        let probe = Rect::new(position.x, position.y, POINT_PROBE_SIZE, POINT_PROBE_SIZE);
        self.mobile_overlap(probe, ignore)
    }

    /// A robot is lively-locked when the position it keeps retrying is
    /// held by another robot that is in turn retrying the first robot's
    /// position. Both sides observe the same stand-off, so the check is symmetric.
    fn lively_locked(&self, component: &Component) -> bool {
        let Some(robot) = component.as_robot() else {
            return false;
        };
        let Some(memorized) = robot.memorized_position else {
            return false;
        };
        let Some(other) = self.mobile_at_point(memorized, Some(component.id)) else {
            return false;
        };
        other
            .as_robot()
            .is_some_and(|other_robot| other_robot.memorized_position == Some(component.position))
    }

    fn resolve_name(&self, id: ComponentId) -> Option<String> {
        self.find(id).map(|component| component.name.clone())
    }

    fn component_snapshot(&self, component: &Component) -> ComponentSnapshot {
        let kind = match &component.kind {
            ComponentKind::Room => ComponentKindSnapshot::Room,
            ComponentKind::Area => ComponentKindSnapshot::Area,
            ComponentKind::Machine => ComponentKindSnapshot::Machine,
            ComponentKind::Conveyor => ComponentKindSnapshot::Conveyor,
            ComponentKind::ChargingStation => ComponentKindSnapshot::ChargingStation,
            ComponentKind::Door(door) => ComponentKindSnapshot::Door(DoorSnapshot {
                room_id: door.room_id,
                side: door.side,
                offset: door.offset,
                size: door.size,
                open: door.open,
            }),
            ComponentKind::Robot(robot) => {
                let target_names = robot
                    .target_ids
                    .iter()
                    .filter_map(|target_id| {
                        let name = self.resolve_name(*target_id);
                        if name.is_none() {
                            warn!(
                                robot = %component.name,
                                target = %target_id,
                                "robot target vanished, dropping from snapshot"
                            );
                        }
                        name
                    })
                    .collect();
                ComponentKindSnapshot::Robot(RobotSnapshot {
                    battery_capacity: robot.battery_capacity,
                    speed: robot.speed,
                    blocked: robot.blocked,
                    successful_moves: robot.successful_moves,
                    target_names,
                    current_target_name: robot
                        .current_target
                        .and_then(|target_id| self.resolve_name(target_id)),
                    memorized_position: robot.memorized_position,
                })
            }
        };
        ComponentSnapshot {
            id: component.id,
            name: component.name.clone(),
            position: component.position,
            shape: component.shape.clone(),
            kind,
        }
    }
}

/// Read-only view of a robot's shared state, captured under one lock.
///
/// A robot's position and behavioral fields are only ever written by its
/// own worker, so a view taken at the start of a tick stays accurate for
/// the whole tick.
#[derive(Debug, Clone)]
pub struct RobotView {
    /// Current position of the robot.
    pub position: Position,
    /// Current bounding rectangle of the robot.
    pub footprint: Rect,
    /// Maximum distance covered per tick.
    pub speed: i32,
    /// Rejected destination the robot is retrying, if any.
    pub memorized_position: Option<Position>,
    /// Target the robot is currently travelling towards.
    pub current_target: Option<ComponentId>,
    /// Targets the robot visits in round-robin order.
    pub target_ids: Vec<ComponentId>,
}

/// A factory floor with its movement monitor and change notifier.
pub struct Factory {
    id: FactoryId,
    name: String,
    width: i32,
    height: i32,
    running: AtomicBool,
    floor: Mutex<Floor>,
    notifier: Box<dyn ChangeNotifier>,
}

impl Factory {
    /// Create an empty factory floor.
    pub fn new(id: FactoryId, name: impl Into<String>, width: i32, height: i32) -> Self {
        Self {
            id,
            name: name.into(),
            width,
            height,
            running: AtomicBool::new(false),
            floor: Mutex::new(Floor { components: vec![] }),
            notifier: Box::new(NoopNotifier),
        }
    }

    /// Replace the change notifier. Call before sharing the factory with
    /// simulation workers.
    pub fn set_notifier(&mut self, notifier: Box<dyn ChangeNotifier>) {
        self.notifier = notifier;
    }

    /// Identifier of the factory.
    pub const fn id(&self) -> &FactoryId {
        &self.id
    }

    /// Human-readable factory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Horizontal extent of the floor.
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Vertical extent of the floor.
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// The floor as a rectangle anchored at the origin.
    pub const fn floor_rect(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    // -------------------------------------------------------------------
    // Floor access
    // -------------------------------------------------------------------

    /// Lock the floor. A poisoned lock still yields a usable guard; the
    /// workspace panic lints keep panics out of critical sections.
    fn floor(&self) -> MutexGuard<'_, Floor> {
        self.floor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a closure against the locked floor. Keep the closure short: the
    /// floor lock is the movement monitor.
    pub(crate) fn with_floor<R>(&self, f: impl FnOnce(&Floor) -> R) -> R {
        f(&self.floor())
    }

    // -------------------------------------------------------------------
    // Component management
    // -------------------------------------------------------------------

    /// Add a component to the floor and notify observers.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::RoomNotFound`] if a door references a room
    /// that is not on the floor, or [`ModelError::TargetNotFound`] if a
    /// robot references a target that is not on the floor.
    pub fn add_component(&self, component: Component) -> Result<ComponentId, ModelError> {
        let id = component.id;
        {
            let mut floor = self.floor();
            match &component.kind {
                ComponentKind::Door(door) => {
                    let is_room = floor
                        .find(door.room_id)
                        .is_some_and(|room| matches!(room.kind, ComponentKind::Room));
                    if !is_room {
                        return Err(ModelError::RoomNotFound(door.room_id));
                    }
                }
                ComponentKind::Robot(robot) => {
                    for target_id in &robot.target_ids {
                        if floor.find(*target_id).is_none() {
                            return Err(ModelError::TargetNotFound(*target_id));
                        }
                    }
                }
                _ => {}
            }
            debug!(component = %component.name, factory = %self.id, "component added");
            floor.components.push(component);
        }
        self.notify_observers();
        Ok(id)
    }

    /// Remove a component from the floor and notify observers.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ComponentNotFound`] if the component is not on
    /// the floor.
    pub fn remove_component(&self, id: ComponentId) -> Result<(), ModelError> {
        {
            let mut floor = self.floor();
            let index = floor
                .components
                .iter()
                .position(|component| component.id == id)
                .ok_or(ModelError::ComponentNotFound(id))?;
            let removed = floor.components.remove(index);
            debug!(component = %removed.name, factory = %self.id, "component removed");
        }
        self.notify_observers();
        Ok(())
    }

    /// Number of components on the floor.
    pub fn component_count(&self) -> usize {
        self.floor().components.len()
    }

    // -------------------------------------------------------------------
    // Movement arbitration
    // -------------------------------------------------------------------

    /// Arbitrate and apply a move. This is the single critical section of
    /// the simulation: the destination check and the position write happen
    /// under one lock acquisition.
    ///
    /// Only other mobile components can reject a move. Walls do not: route
    /// planning is expected to avoid them, and arbitration stays cheap.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ComponentNotFound`] if the mover is not on
    /// the floor.
    pub fn move_component(
        &self,
        motion: Motion,
        mover: ComponentId,
    ) -> Result<MoveOutcome, ModelError> {
        let mut floor = self.floor();
        let footprint = floor
            .find(mover)
            .map(Component::footprint)
            .ok_or(ModelError::ComponentNotFound(mover))?;
        let destination = Rect::new(motion.to.x, motion.to.y, footprint.width, footprint.height);
        if let Some(occupant) = floor.mobile_overlap(destination, Some(mover)) {
            trace!(mover = %mover, occupant = %occupant.name, to = %motion.to, "move rejected");
            return Ok(MoveOutcome::Rejected);
        }
        if let Some(component) = floor.find_mut(mover) {
            component.position = motion.to;
        }
        trace!(mover = %mover, to = %motion.to, "move committed");
        Ok(MoveOutcome::Committed {
            displacement: motion.displacement(),
        })
    }

    // -------------------------------------------------------------------
    // Probes
    // -------------------------------------------------------------------

    /// Whether an immobile component blocks the probe rectangle.
    pub fn has_obstacle_at(&self, probe: Rect) -> bool {
        self.floor().rect_blocked(probe)
    }

    /// Whether a mobile component other than `ignore` overlaps the probe
    /// rectangle.
    pub fn has_mobile_component_at(&self, probe: Rect, ignore: ComponentId) -> bool {
        self.floor().mobile_overlap(probe, Some(ignore)).is_some()
    }

    /// The mobile component other than `ignore` standing at `position`,
    /// identified by a small square probe anchored there.
    pub fn mobile_component_at(
        &self,
        position: Position,
        ignore: ComponentId,
    ) -> Option<(ComponentId, String)> {
        self.floor()
            .mobile_at_point(position, Some(ignore))
            .map(|component| (component.id, component.name.clone()))
    }

    /// Current position of a component.
    pub fn position_of(&self, id: ComponentId) -> Option<Position> {
        self.floor().find(id).map(|component| component.position)
    }

    /// Current bounding rectangle of a component.
    pub fn footprint_of(&self, id: ComponentId) -> Option<Rect> {
        self.floor().find(id).map(Component::footprint)
    }

    /// Name of a component.
    pub fn name_of(&self, id: ComponentId) -> Option<String> {
        self.floor().resolve_name(id)
    }

    /// Identifier of the component with the given name.
    pub fn component_id_by_name(&self, name: &str) -> Option<ComponentId> {
        self.floor().find_by_name(name).map(|component| component.id)
    }

    // -------------------------------------------------------------------
    // Robot state
    // -------------------------------------------------------------------

    /// Capture a robot's shared state under one lock acquisition.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ComponentNotFound`] if the robot is not on the
    /// floor, or [`ModelError::NotARobot`] for non-robot components.
    pub fn robot_view(&self, id: ComponentId) -> Result<RobotView, ModelError> {
        let floor = self.floor();
        let component = floor.find(id).ok_or(ModelError::ComponentNotFound(id))?;
        let robot = component.as_robot().ok_or(ModelError::NotARobot(id))?;
        Ok(RobotView {
            position: component.position,
            footprint: component.footprint(),
            speed: robot.speed,
            memorized_position: robot.memorized_position,
            current_target: robot.current_target,
            target_ids: robot.target_ids.clone(),
        })
    }

    /// Set a robot's blocked flag.
    pub fn set_robot_blocked(&self, id: ComponentId, blocked: bool) -> Result<(), ModelError> {
        self.update_robot(id, |robot| robot.blocked = blocked)
    }

    /// Set or clear a robot's memorized destination.
    pub fn set_robot_memorized(
        &self,
        id: ComponentId,
        memorized: Option<Position>,
    ) -> Result<(), ModelError> {
        self.update_robot(id, |robot| robot.memorized_position = memorized)
    }

    /// Set or clear the target a robot is travelling towards.
    pub fn set_robot_current_target(
        &self,
        id: ComponentId,
        target: Option<ComponentId>,
    ) -> Result<(), ModelError> {
        self.update_robot(id, |robot| robot.current_target = target)
    }

    /// Count one committed move for a robot.
    pub fn record_successful_move(&self, id: ComponentId) -> Result<(), ModelError> {
        self.update_robot(id, |robot| {
            robot.successful_moves = robot.successful_moves.saturating_add(1);
        })
    }

    fn update_robot(
        &self,
        id: ComponentId,
        f: impl FnOnce(&mut RobotUnit),
    ) -> Result<(), ModelError> {
        let mut floor = self.floor();
        let component = floor.find_mut(id).ok_or(ModelError::ComponentNotFound(id))?;
        let robot = component.as_robot_mut().ok_or(ModelError::NotARobot(id))?;
        f(robot);
        Ok(())
    }

    /// Whether a robot's footprint overlaps the given target component.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ComponentNotFound`] if either component is
    /// missing from the floor.
    pub fn robot_reached_target(
        &self,
        robot_id: ComponentId,
        target_id: ComponentId,
    ) -> Result<bool, ModelError> {
        let floor = self.floor();
        let robot = floor
            .find(robot_id)
            .ok_or(ModelError::ComponentNotFound(robot_id))?;
        let target = floor
            .find(target_id)
            .ok_or(ModelError::ComponentNotFound(target_id))?;
        Ok(robot.footprint().overlaps(target.footprint()))
    }

    /// Whether the robot is in a mutual stand-off: it keeps retrying a
    /// position held by another robot that is retrying this robot's
    /// position.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ComponentNotFound`] if the robot is not on the
    /// floor, or [`ModelError::NotARobot`] for non-robot components.
    pub fn is_lively_locked(&self, id: ComponentId) -> Result<bool, ModelError> {
        let floor = self.floor();
        let component = floor.find(id).ok_or(ModelError::ComponentNotFound(id))?;
        if component.as_robot().is_none() {
            return Err(ModelError::NotARobot(id));
        }
        Ok(floor.lively_locked(component))
    }

    /// Diagnostic rows for every robot on the floor, captured under one
    /// lock acquisition.
    pub fn robot_statuses(&self) -> Vec<RobotStatus> {
        let floor = self.floor();
        floor
            .components
            .iter()
            .filter_map(|component| {
                let robot = component.as_robot()?;
                Some(RobotStatus {
                    id: component.id,
                    name: component.name.clone(),
                    position: component.position,
                    blocked: robot.blocked,
                    lively_locked: floor.lively_locked(component),
                    battery_capacity: robot.battery_capacity,
                    speed: robot.speed,
                    successful_moves: robot.successful_moves,
                    memorized_position: robot.memorized_position,
                    current_target_name: robot
                        .current_target
                        .and_then(|target_id| floor.resolve_name(target_id)),
                })
            })
            .collect()
    }

    // -------------------------------------------------------------------
    // Simulation flag
    // -------------------------------------------------------------------

    /// Whether the simulation is currently marked running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Flip the running flag. Observers are notified exactly once per
    /// transition; setting the current value again is a no-op.
    pub fn set_running(&self, running: bool) {
        let previous = self.running.swap(running, Ordering::SeqCst);
        if previous != running {
            debug!(factory = %self.id, running, "simulation flag changed");
            self.notify_observers();
        }
    }

    // -------------------------------------------------------------------
    // Snapshots
    // -------------------------------------------------------------------

    /// Capture the full state of the factory.
    pub fn snapshot(&self) -> FactorySnapshot {
        let floor = self.floor();
        let components = floor
            .components
            .iter()
            .map(|component| floor.component_snapshot(component))
            .collect();
        FactorySnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            width: self.width,
            height: self.height,
            running: self.is_running(),
            captured_at: Utc::now(),
            components,
        }
    }

    /// Capture a snapshot and hand it to the change notifier.
    ///
    /// Robot workers call this after each committed move, so observers see
    /// every successful step without polling.
    pub fn notify_observers(&self) {
        let snapshot = self.snapshot();
        self.notifier.factory_changed(&snapshot);
    }

    /// Rebuild a factory from a snapshot.
    ///
    /// Component identifiers are taken from the snapshot, so consumers that
    /// key on identifiers stay consistent across hydrations. Robot targets
    /// travel as names and are re-resolved here; names that no longer match
    /// a component are dropped with a warning. The rebuilt factory always
    /// starts stopped regardless of the running flag in the snapshot.
    pub fn from_snapshot(snapshot: &FactorySnapshot) -> Self {
        let mut components: Vec<Component> = Vec::with_capacity(snapshot.components.len());
        for entry in &snapshot.components {
            let kind = match &entry.kind {
                ComponentKindSnapshot::Room => ComponentKind::Room,
                ComponentKindSnapshot::Area => ComponentKind::Area,
                ComponentKindSnapshot::Machine => ComponentKind::Machine,
                ComponentKindSnapshot::Conveyor => ComponentKind::Conveyor,
                ComponentKindSnapshot::ChargingStation => ComponentKind::ChargingStation,
                ComponentKindSnapshot::Door(door) => ComponentKind::Door(Door {
                    room_id: door.room_id,
                    side: door.side,
                    offset: door.offset,
                    size: door.size,
                    open: door.open,
                }),
                ComponentKindSnapshot::Robot(robot) => {
                    let resolve = |name: &str| {
                        let id = snapshot
                            .components
                            .iter()
                            .find(|candidate| candidate.name == name)
                            .map(|candidate| candidate.id);
                        if id.is_none() {
                            warn!(
                                factory = %snapshot.id,
                                target = name,
                                "target name not found during hydration, dropping"
                            );
                        }
                        id
                    };
                    let target_ids = robot
                        .target_names
                        .iter()
                        .filter_map(|name| resolve(name))
                        .collect();
                    ComponentKind::Robot(RobotUnit {
                        battery_capacity: robot.battery_capacity,
                        speed: robot.speed,
                        blocked: robot.blocked,
                        successful_moves: robot.successful_moves,
                        target_ids,
                        current_target: robot
                            .current_target_name
                            .as_deref()
                            .and_then(resolve),
                        memorized_position: robot.memorized_position,
                    })
                }
            };
            components.push(Component {
                id: entry.id,
                name: entry.name.clone(),
                position: entry.position,
                shape: entry.shape.clone(),
                kind,
            });
        }
        Self {
            id: snapshot.id.clone(),
            name: snapshot.name.clone(),
            width: snapshot.width,
            height: snapshot.height,
            running: AtomicBool::new(false),
            floor: Mutex::new(Floor { components }),
            notifier: Box::new(NoopNotifier),
        }
    }
}

impl core::fmt::Debug for Factory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Factory")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
