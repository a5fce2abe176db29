//! Per-robot behavior: target cycling, waypoint following, and stand-off
//! resolution.
//!
//! A [`RobotDriver`] owns everything one robot needs to act that no other
//! robot may touch: the round-robin target cursor, the planned route, the
//! blocked-move counter, and the step-aside cooldown. State other robots or
//! observers read (position, blocked flag, memorized destination) lives in
//! the factory arena and is written through the factory's robot setters.
//!
//! One call to [`RobotDriver::tick`] is one behavior step. Rejected moves
//! and empty routes are ordinary outcomes handled inside the tick; an error
//! return means the robot itself is gone from the floor.

use std::collections::VecDeque;
use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;
use robosim_model::{Factory, ModelError, Motion, PathFinder, RobotView};
use robosim_types::{ComponentId, Position, Rect};
use tracing::{debug, trace, warn};

/// Consecutive rejected moves a robot tolerates before it tries to resolve
/// the stand-off with whoever is in the way.
pub const PATIENCE_THRESHOLD: u32 = 5;

/// Ticks a robot rests after stepping aside, giving the other robot room to
/// pass before a fresh route is planned.
pub const STEP_ASIDE_COOLDOWN: u32 = 10;

/// Axis offset probed when looking for a free neighbouring position.
const STEP_ASIDE_OFFSET: i32 = 5;

/// Movement statistics accumulated over a driver's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionStats {
    /// Moves submitted to the factory monitor.
    pub attempts: u64,
    /// Submitted moves the monitor committed.
    pub committed: u64,
    /// Submitted moves the monitor rejected.
    pub rejected: u64,
}

/// Drives one robot, one behavior tick at a time.
pub struct RobotDriver {
    robot_id: ComponentId,
    name: String,
    path_finder: Arc<dyn PathFinder>,
    target_cursor: usize,
    path: Option<VecDeque<Position>>,
    waypoint: Option<Position>,
    blocked_count: u32,
    cooldown: u32,
    idle_logged: bool,
    stats: MotionStats,
}

impl RobotDriver {
    /// Create a driver for the given robot.
    pub fn new(
        robot_id: ComponentId,
        name: impl Into<String>,
        path_finder: Arc<dyn PathFinder>,
    ) -> Self {
        Self {
            robot_id,
            name: name.into(),
            path_finder,
            target_cursor: 0,
            path: None,
            waypoint: None,
            blocked_count: 0,
            cooldown: 0,
            idle_logged: false,
            stats: MotionStats::default(),
        }
    }

    /// The name of the driven robot.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Movement statistics since the driver was created.
    pub const fn stats(&self) -> MotionStats {
        self.stats
    }

    /// Run one behavior tick. Returns `true` when the robot moved.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ComponentNotFound`] when the robot or its
    /// current target has been removed from the floor mid-run.
    pub fn tick(&mut self, factory: &Factory, rng: &mut impl Rng) -> Result<bool, ModelError> {
        let mut view = factory.robot_view(self.robot_id)?;

        if view.target_ids.is_empty() {
            if !self.idle_logged {
                debug!(robot = %self.name, "no targets assigned, idling");
                self.idle_logged = true;
            }
            return Ok(false);
        }

        if self.cooldown > 0 {
            trace!(robot = %self.name, ticks_left = self.cooldown, "resting after step-aside");
            self.cooldown = self.cooldown.saturating_sub(1);
            factory.set_robot_blocked(self.robot_id, true)?;
            return Ok(false);
        }

        // Target selection: advance the round-robin cursor when there is no
        // current target or the robot's footprint overlaps it.
        let arrived = view.current_target.map_or(Ok(false), |target_id| {
            factory.robot_reached_target(self.robot_id, target_id)
        })?;
        if view.current_target.is_none() || arrived {
            if let Some(reached) = view.current_target {
                debug!(robot = %self.name, target = %reached, "reached target");
            }
            let Some(next) = self.advance_target(&view.target_ids) else {
                factory.set_robot_current_target(self.robot_id, None)?;
                return Ok(false);
            };
            factory.set_robot_current_target(self.robot_id, Some(next))?;
            factory.set_robot_memorized(self.robot_id, None)?;
            self.path = None;
            self.waypoint = None;
            self.blocked_count = 0;
            view.current_target = Some(next);
            view.memorized_position = None;
            debug!(robot = %self.name, target = %next, "new target");
        }
        let Some(target_id) = view.current_target else {
            return Ok(false);
        };

        // Route acquisition: a missing route is planned now; an empty plan
        // marks the robot blocked and leaves the retry to the next tick so
        // contested cells get a chance to clear.
        if self.path.is_none() {
            let mut route: VecDeque<Position> =
                self.path_finder.find_path(factory, self.robot_id, target_id).into();
            if route.front() == Some(&view.position) {
                route.pop_front();
            }
            self.waypoint = None;
            if route.is_empty() {
                debug!(robot = %self.name, target = %target_id, "no route to target");
                factory.set_robot_blocked(self.robot_id, true)?;
                return Ok(false);
            }
            trace!(robot = %self.name, target = %target_id, steps = route.len(), "route planned");
            self.path = Some(route);
        }

        // Waypoint advance: exhausting the route before the target overlap
        // fires means the plan went stale, so it is dropped for replanning.
        if self.waypoint.is_none() || self.waypoint == Some(view.position) {
            if self.waypoint.is_some() {
                factory.set_robot_memorized(self.robot_id, None)?;
                view.memorized_position = None;
            }
            let Some(next) = self.path.as_mut().and_then(VecDeque::pop_front) else {
                trace!(robot = %self.name, "route exhausted before target, replanning");
                self.path = None;
                return Ok(false);
            };
            self.waypoint = Some(next);
        }
        let Some(waypoint) = self.waypoint else {
            return Ok(false);
        };

        self.move_towards(factory, &view, waypoint, rng)
    }

    /// The next target in round-robin order, wrapping at the end of the
    /// list. Returns `None` only for an empty list.
    fn advance_target(&mut self, targets: &[ComponentId]) -> Option<ComponentId> {
        let index = self.target_cursor.checked_rem(targets.len())?;
        self.target_cursor = index.saturating_add(1);
        targets.get(index).copied()
    }

    /// Submit one step towards the waypoint (or towards a previously
    /// rejected destination, retried verbatim) to the factory monitor.
    fn move_towards(
        &mut self,
        factory: &Factory,
        view: &RobotView,
        waypoint: Position,
        rng: &mut impl Rng,
    ) -> Result<bool, ModelError> {
        self.stats.attempts = self.stats.attempts.saturating_add(1);
        let goal = view.memorized_position.unwrap_or(waypoint);
        let next = next_step(view.position, goal, view.speed);

        let outcome = factory.move_component(Motion::new(view.position, next), self.robot_id)?;
        if outcome.is_committed() {
            self.stats.committed = self.stats.committed.saturating_add(1);
            self.blocked_count = 0;
            factory.record_successful_move(self.robot_id)?;
            factory.set_robot_memorized(self.robot_id, None)?;
            factory.set_robot_blocked(self.robot_id, false)?;
            factory.notify_observers();
            return Ok(true);
        }

        self.stats.rejected = self.stats.rejected.saturating_add(1);
        self.blocked_count = self.blocked_count.saturating_add(1);
        factory.set_robot_memorized(self.robot_id, Some(next))?;
        factory.set_robot_blocked(self.robot_id, true)?;
        trace!(robot = %self.name, at = %next, patience = self.blocked_count, "move rejected");

        let blocker = factory.mobile_component_at(next, self.robot_id);
        if self.blocked_count > PATIENCE_THRESHOLD {
            return self.resolve_standoff(factory, view, blocker, rng);
        }
        Ok(false)
    }

    /// Break a sustained stand-off. The robot with the lexicographically
    /// greater name vacates; the lesser name holds the contested cell.
    fn resolve_standoff(
        &mut self,
        factory: &Factory,
        view: &RobotView,
        blocker: Option<(ComponentId, String)>,
        rng: &mut impl Rng,
    ) -> Result<bool, ModelError> {
        warn!(robot = %self.name, patience = self.blocked_count, "stuck, resolving stand-off");
        match blocker {
            Some((_, other_name)) if self.name.as_str() > other_name.as_str() => {
                debug!(robot = %self.name, other = %other_name, "lost tie-break, stepping aside");
                if let Some(candidate) = self.step_aside_position(factory, view, rng) {
                    let motion = Motion::new(view.position, candidate);
                    if factory.move_component(motion, self.robot_id)?.is_committed() {
                        debug!(robot = %self.name, to = %candidate, "stepped aside");
                        self.cooldown = STEP_ASIDE_COOLDOWN;
                        self.path = None;
                        self.waypoint = None;
                        self.blocked_count = 0;
                        factory.set_robot_memorized(self.robot_id, None)?;
                        factory.set_robot_blocked(self.robot_id, false)?;
                        factory.notify_observers();
                        return Ok(true);
                    }
                }
            }
            Some((_, other_name)) => {
                debug!(robot = %self.name, other = %other_name, "won tie-break, holding position");
                self.blocked_count = 0;
            }
            None => {
                debug!(robot = %self.name, "blocked by static obstruction, replanning");
                self.path = None;
                self.waypoint = None;
                self.blocked_count = 0;
                factory.set_robot_memorized(self.robot_id, None)?;
            }
        }
        Ok(false)
    }

    /// A free position one axis step away, probed in random order with the
    /// robot's own footprint. `None` when all four neighbours are taken.
    fn step_aside_position(
        &self,
        factory: &Factory,
        view: &RobotView,
        rng: &mut impl Rng,
    ) -> Option<Position> {
        let mut offsets = [
            (STEP_ASIDE_OFFSET, 0),
            (-STEP_ASIDE_OFFSET, 0),
            (0, STEP_ASIDE_OFFSET),
            (0, -STEP_ASIDE_OFFSET),
        ];
        offsets.shuffle(rng);
        offsets.into_iter().find_map(|(dx, dy)| {
            let candidate = Position::new(
                view.position.x.saturating_add(dx),
                view.position.y.saturating_add(dy),
            );
            let probe = Rect::new(
                view.footprint.x.saturating_add(dx),
                view.footprint.y.saturating_add(dy),
                view.footprint.width,
                view.footprint.height,
            );
            (!factory.has_obstacle_at(probe)
                && !factory.has_mobile_component_at(probe, self.robot_id))
            .then_some(candidate)
        })
    }
}

impl std::fmt::Debug for RobotDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotDriver")
            .field("robot_id", &self.robot_id)
            .field("name", &self.name)
            .field("waypoint", &self.waypoint)
            .field("blocked_count", &self.blocked_count)
            .field("cooldown", &self.cooldown)
            .finish_non_exhaustive()
    }
}

/// The position one tick of travel reaches on the way to `goal`.
///
/// Within `speed` of the goal the step lands exactly on it. Farther out,
/// only the axis with the larger absolute delta moves, clipped to `speed`;
/// ties go to the y axis.
fn next_step(position: Position, goal: Position, speed: i32) -> Position {
    let dx = goal.x.saturating_sub(position.x);
    let dy = goal.y.saturating_sub(position.y);
    if f64::from(dx).hypot(f64::from(dy)) <= f64::from(speed) {
        return goal;
    }
    let next = if dx.saturating_abs() > dy.saturating_abs() {
        let step = dx.signum().saturating_mul(dx.saturating_abs().min(speed));
        Position::new(position.x.saturating_add(step), position.y)
    } else {
        let step = dy.signum().saturating_mul(dy.saturating_abs().min(speed));
        Position::new(position.x, position.y.saturating_add(step))
    };
    // A degenerate step (zero speed) falls back to the full jump rather
    // than stalling in place.
    if next == position { goal } else { next }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use robosim_model::{Component, ComponentKind, GridPathFinder, RobotUnit};
    use robosim_types::{FactoryId, Shape};

    use super::*;

    fn make_factory() -> Factory {
        Factory::new(FactoryId::from("behavior-floor"), "Behavior Floor", 200, 200)
    }

    fn make_machine(factory: &Factory, name: &str, x: i32, y: i32) -> ComponentId {
        factory
            .add_component(Component::new(
                name,
                Position::new(x, y),
                Shape::Rectangle {
                    width: 15,
                    height: 15,
                },
                ComponentKind::Machine,
            ))
            .unwrap()
    }

    fn make_robot(
        factory: &Factory,
        name: &str,
        x: i32,
        y: i32,
        targets: Vec<ComponentId>,
    ) -> ComponentId {
        factory
            .add_component(Component::new(
                name,
                Position::new(x, y),
                Shape::Circle { radius: 2 },
                ComponentKind::Robot(RobotUnit::new(10, targets)),
            ))
            .unwrap()
    }

    fn make_driver(factory: &Factory, robot_id: ComponentId) -> RobotDriver {
        let name = factory.name_of(robot_id).unwrap();
        RobotDriver::new(robot_id, name, Arc::new(GridPathFinder::new(5)))
    }

    #[test]
    fn straight_route_is_walked_in_five_unit_steps() {
        let factory = make_factory();
        let machine = make_machine(&factory, "Machine 1", 25, 5);
        let robot = make_robot(&factory, "Robot 1", 5, 5, vec![machine]);
        let mut driver = make_driver(&factory, robot);
        let mut rng = SmallRng::seed_from_u64(7);

        for expected_x in [10, 15, 20, 25] {
            let moved = driver.tick(&factory, &mut rng).unwrap();
            assert!(moved);
            assert_eq!(
                factory.position_of(robot),
                Some(Position::new(expected_x, 5))
            );
        }
    }

    #[test]
    fn targets_cycle_in_round_robin_order() {
        let factory = make_factory();
        let first = make_machine(&factory, "Machine 1", 25, 5);
        let second = make_machine(&factory, "Machine 2", 65, 5);
        let robot = make_robot(&factory, "Robot 1", 5, 5, vec![first, second]);
        let mut driver = make_driver(&factory, robot);
        let mut rng = SmallRng::seed_from_u64(7);

        let mut visited = Vec::new();
        for _ in 0..200 {
            driver.tick(&factory, &mut rng).unwrap();
            let target = factory.robot_view(robot).unwrap().current_target.unwrap();
            if visited.last() != Some(&target) {
                visited.push(target);
            }
            if visited.len() == 4 {
                break;
            }
        }
        assert_eq!(visited, vec![first, second, first, second]);
    }

    #[test]
    fn unreachable_target_blocks_without_moving() {
        let factory = make_factory();
        // A sealed room: walls but no door.
        factory
            .add_component(Component::new(
                "Sealed Room",
                Position::new(100, 100),
                Shape::Rectangle {
                    width: 50,
                    height: 50,
                },
                ComponentKind::Room,
            ))
            .unwrap();
        let machine = make_machine(&factory, "Machine 1", 120, 120);
        let robot = make_robot(&factory, "Robot 1", 5, 5, vec![machine]);
        let mut driver = make_driver(&factory, robot);
        let mut rng = SmallRng::seed_from_u64(7);

        for _ in 0..3 {
            let moved = driver.tick(&factory, &mut rng).unwrap();
            assert!(!moved);
            assert_eq!(factory.position_of(robot), Some(Position::new(5, 5)));
        }
        let status = factory
            .robot_statuses()
            .into_iter()
            .find(|status| status.id == robot)
            .unwrap();
        assert!(status.blocked);
    }

    #[test]
    fn rejected_step_is_memorized_and_retried() {
        let factory = make_factory();
        let machine = make_machine(&factory, "Machine 1", 45, 5);
        let robot = make_robot(&factory, "Robot 1", 5, 5, vec![machine]);
        let parked = make_robot(&factory, "Robot 2", 10, 5, Vec::new());
        let mut driver = make_driver(&factory, robot);
        let mut rng = SmallRng::seed_from_u64(7);

        let moved = driver.tick(&factory, &mut rng).unwrap();
        assert!(!moved);
        let view = factory.robot_view(robot).unwrap();
        assert_eq!(view.position, Position::new(5, 5));
        assert_eq!(view.memorized_position, Some(Position::new(10, 5)));

        // Once the way is clear the memorized step is retried verbatim.
        factory.remove_component(parked).unwrap();
        let moved = driver.tick(&factory, &mut rng).unwrap();
        assert!(moved);
        let view = factory.robot_view(robot).unwrap();
        assert_eq!(view.position, Position::new(10, 5));
        assert_eq!(view.memorized_position, None);
    }

    #[test]
    fn greater_name_steps_aside_and_rests() {
        let factory = make_factory();
        let machine = make_machine(&factory, "Machine 1", 45, 5);
        let mover = make_robot(&factory, "Robot B", 5, 5, vec![machine]);
        make_robot(&factory, "Robot A", 11, 5, Vec::new());
        let mut driver = make_driver(&factory, mover);
        let mut rng = SmallRng::seed_from_u64(7);

        // Five rejections exhaust the patience threshold.
        for _ in 0..PATIENCE_THRESHOLD {
            assert!(!driver.tick(&factory, &mut rng).unwrap());
            assert_eq!(factory.position_of(mover), Some(Position::new(5, 5)));
        }

        // The sixth rejection triggers the step-aside. The eastern
        // neighbour is occupied, so one of the other three is taken.
        assert!(driver.tick(&factory, &mut rng).unwrap());
        let aside = factory.position_of(mover).unwrap();
        assert!(
            [
                Position::new(0, 5),
                Position::new(5, 10),
                Position::new(5, 0)
            ]
            .contains(&aside)
        );

        // The cooldown holds the robot in place for ten ticks.
        for _ in 0..STEP_ASIDE_COOLDOWN {
            assert!(!driver.tick(&factory, &mut rng).unwrap());
            assert_eq!(factory.position_of(mover), Some(aside));
        }

        // Fresh plan afterwards; the first step of the new route commits.
        assert!(driver.tick(&factory, &mut rng).unwrap());
    }

    #[test]
    fn lesser_name_holds_position_in_standoff() {
        let factory = make_factory();
        let machine = make_machine(&factory, "Machine 1", 45, 5);
        let mover = make_robot(&factory, "Robot A", 5, 5, vec![machine]);
        make_robot(&factory, "Robot B", 11, 5, Vec::new());
        let mut driver = make_driver(&factory, mover);
        let mut rng = SmallRng::seed_from_u64(7);

        for _ in 0..15 {
            assert!(!driver.tick(&factory, &mut rng).unwrap());
            assert_eq!(factory.position_of(mover), Some(Position::new(5, 5)));
        }
        let status = factory
            .robot_statuses()
            .into_iter()
            .find(|status| status.id == mover)
            .unwrap();
        assert!(status.blocked);
    }

    #[test]
    fn driver_feeds_the_lively_lock_predicate() {
        let factory = make_factory();
        let machine = make_machine(&factory, "Machine 1", 45, 5);
        let mover = make_robot(&factory, "Robot 1", 5, 5, vec![machine]);
        let parked = make_robot(&factory, "Robot 2", 10, 5, Vec::new());
        let mut driver = make_driver(&factory, mover);
        let mut rng = SmallRng::seed_from_u64(7);

        assert!(!driver.tick(&factory, &mut rng).unwrap());

        // The parked robot wanting the mover's cell completes the mutual
        // stand-off.
        factory
            .set_robot_memorized(parked, Some(Position::new(5, 5)))
            .unwrap();
        assert!(factory.is_lively_locked(mover).unwrap());
        assert!(factory.is_lively_locked(parked).unwrap());
    }

    #[test]
    fn slow_robot_steps_one_axis_at_a_time() {
        let factory = make_factory();
        let machine = make_machine(&factory, "Machine 1", 25, 5);
        let mut unit = RobotUnit::new(10, vec![machine]);
        unit.speed = 2;
        let robot = factory
            .add_component(Component::new(
                "Robot 1",
                Position::new(5, 5),
                Shape::Circle { radius: 2 },
                ComponentKind::Robot(unit),
            ))
            .unwrap();
        let mut driver = make_driver(&factory, robot);
        let mut rng = SmallRng::seed_from_u64(7);

        for expected in [
            Position::new(7, 5),
            Position::new(9, 5),
            Position::new(10, 5),
        ] {
            assert!(driver.tick(&factory, &mut rng).unwrap());
            assert_eq!(factory.position_of(robot), Some(expected));
        }
    }

    #[test]
    fn empty_target_list_is_a_quiet_no_op() {
        let factory = make_factory();
        let robot = make_robot(&factory, "Robot 1", 5, 5, Vec::new());
        let mut driver = make_driver(&factory, robot);
        let mut rng = SmallRng::seed_from_u64(7);

        for _ in 0..3 {
            assert!(!driver.tick(&factory, &mut rng).unwrap());
        }
        assert_eq!(factory.position_of(robot), Some(Position::new(5, 5)));
        let status = factory
            .robot_statuses()
            .into_iter()
            .find(|status| status.id == robot)
            .unwrap();
        assert!(!status.blocked);
    }

    #[test]
    fn tick_errors_when_the_robot_vanishes() {
        let factory = make_factory();
        let machine = make_machine(&factory, "Machine 1", 25, 5);
        let robot = make_robot(&factory, "Robot 1", 5, 5, vec![machine]);
        let mut driver = make_driver(&factory, robot);
        let mut rng = SmallRng::seed_from_u64(7);

        factory.remove_component(robot).unwrap();
        let result = driver.tick(&factory, &mut rng);
        assert!(matches!(result, Err(ModelError::ComponentNotFound(_))));
    }

    #[test]
    fn next_step_jumps_straight_within_speed() {
        let step = next_step(Position::new(0, 0), Position::new(3, 4), 5);
        assert_eq!(step, Position::new(3, 4));
    }

    #[test]
    fn next_step_moves_the_larger_axis_only() {
        let step = next_step(Position::new(0, 0), Position::new(20, 3), 5);
        assert_eq!(step, Position::new(5, 0));
    }

    #[test]
    fn next_step_ties_go_to_the_y_axis() {
        let step = next_step(Position::new(0, 0), Position::new(10, 10), 5);
        assert_eq!(step, Position::new(0, 5));
    }
}
