//! Grid pathfinding across the factory floor.
//!
//! The floor is covered by a uniform grid of square cells. A cell is blocked
//! when an immobile component refuses to be overlaid by it, which in practice
//! means room wall bands outside door openings. Mobile components are not
//! obstacles: robots resolve encounters with each other at move time through
//! the factory monitor, not at planning time.
//!
//! Planning runs Dijkstra over the 4-connected free cells. With uniform step
//! cost the result is a shortest path in cell steps, and the ordered frontier
//! makes the chosen path deterministic for a given floor.

use std::collections::{BTreeMap, BTreeSet};

use robosim_types::{ComponentId, Position, Rect};
use tracing::{debug, trace};

use crate::factory::Factory;

/// A route planner for robots.
///
/// Implementations are shared across all robot workers of a simulation, so
/// they must be safe to call concurrently.
pub trait PathFinder: Send + Sync {
    /// Plan waypoints from the robot's current position to the target
    /// component.
    ///
    /// The robot's own cell is not part of the result: the first waypoint is
    /// the first cell to travel to. Returns an empty path when no route
    /// exists.
    fn find_path(
        &self,
        factory: &Factory,
        robot_id: ComponentId,
        target_id: ComponentId,
    ) -> Vec<Position>;
}

/// Dijkstra planner over a uniform grid laid across the floor.
///
/// The obstacle grid is rebuilt from the live floor on every query, so paths
/// always reflect the current layout.
#[derive(Debug, Clone, Copy)]
pub struct GridPathFinder {
    resolution: i32,
}

/// Grid cell addressed by column and row.
type Cell = (i32, i32);

struct PlanInput {
    cols: i32,
    rows: i32,
    start: Cell,
    goals: BTreeSet<Cell>,
    blocked: BTreeSet<Cell>,
}

impl GridPathFinder {
    /// Default cell size in factory units.
    pub const DEFAULT_RESOLUTION: i32 = 5;

    /// Create a planner with the given cell size. Sizes below one are
    /// clamped to one.
    pub const fn new(resolution: i32) -> Self {
        Self {
            resolution: if resolution < 1 { 1 } else { resolution },
        }
    }

    /// The cell size in factory units.
    pub const fn resolution(&self) -> i32 {
        self.resolution
    }

    fn cell_rect(&self, cell: Cell) -> Rect {
        Rect::new(
            cell.0.saturating_mul(self.resolution),
            cell.1.saturating_mul(self.resolution),
            self.resolution,
            self.resolution,
        )
    }

    fn cell_of(&self, position: Position, cols: i32, rows: i32) -> Cell {
        let cx = position
            .x
            .checked_div(self.resolution)
            .unwrap_or(0)
            .clamp(0, cols.saturating_sub(1).max(0));
        let cy = position
            .y
            .checked_div(self.resolution)
            .unwrap_or(0)
            .clamp(0, rows.saturating_sub(1).max(0));
        (cx, cy)
    }

    fn survey(
        &self,
        factory: &Factory,
        robot_id: ComponentId,
        target_id: ComponentId,
    ) -> Option<PlanInput> {
        let cols = factory.width().checked_div(self.resolution).unwrap_or(0);
        let rows = factory.height().checked_div(self.resolution).unwrap_or(0);
        if cols < 1 || rows < 1 {
            return None;
        }
        factory.with_floor(|floor| {
            let robot = floor.find(robot_id)?;
            let target_rect = floor.find(target_id)?.footprint();
            let start = self.cell_of(robot.position, cols, rows);
            let mut blocked = BTreeSet::new();
            let mut goals = BTreeSet::new();
            for cy in 0..rows {
                for cx in 0..cols {
                    let rect = self.cell_rect((cx, cy));
                    if floor.rect_blocked(rect) {
                        blocked.insert((cx, cy));
                    }
                    if rect.overlaps(target_rect) {
                        goals.insert((cx, cy));
                    }
                }
            }
            if goals.is_empty() {
                return None;
            }
            Some(PlanInput {
                cols,
                rows,
                start,
                goals,
                blocked,
            })
        })
    }

    fn shortest_route(input: &PlanInput) -> Vec<Cell> {
        let mut dist: BTreeMap<Cell, u32> = BTreeMap::new();
        let mut prev: BTreeMap<Cell, Cell> = BTreeMap::new();
        let mut frontier: BTreeSet<(u32, i32, i32)> = BTreeSet::new();
        dist.insert(input.start, 0);
        frontier.insert((0, input.start.0, input.start.1));

        let mut reached = None;
        while let Some((d, cx, cy)) = frontier.pop_first() {
            if input.goals.contains(&(cx, cy)) {
                reached = Some((cx, cy));
                break;
            }
            let neighbours = [
                (cx.saturating_sub(1), cy),
                (cx.saturating_add(1), cy),
                (cx, cy.saturating_sub(1)),
                (cx, cy.saturating_add(1)),
            ];
            for next in neighbours {
                if next.0 < 0 || next.0 >= input.cols || next.1 < 0 || next.1 >= input.rows {
                    continue;
                }
                if input.blocked.contains(&next) {
                    continue;
                }
                let next_d = d.saturating_add(1);
                if dist.get(&next).is_some_and(|&best| best <= next_d) {
                    continue;
                }
                if let Some(&old) = dist.get(&next) {
                    frontier.remove(&(old, next.0, next.1));
                }
                dist.insert(next, next_d);
                prev.insert(next, (cx, cy));
                frontier.insert((next_d, next.0, next.1));
            }
        }

        let Some(goal) = reached else {
            return vec![];
        };
        let mut chain = vec![goal];
        let mut cursor = goal;
        while let Some(&before) = prev.get(&cursor) {
            chain.push(before);
            cursor = before;
        }
        chain.reverse();
        chain
    }
}

impl Default for GridPathFinder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RESOLUTION)
    }
}

impl PathFinder for GridPathFinder {
    fn find_path(
        &self,
        factory: &Factory,
        robot_id: ComponentId,
        target_id: ComponentId,
    ) -> Vec<Position> {
        let Some(input) = self.survey(factory, robot_id, target_id) else {
            debug!(robot = %robot_id, target = %target_id, "path query against missing components or degenerate floor");
            return vec![];
        };
        let chain = Self::shortest_route(&input);
        if chain.is_empty() {
            debug!(robot = %robot_id, target = %target_id, "no route found");
            return vec![];
        }
        // The robot already stands on the first cell of the chain.
        let waypoints: Vec<Position> = chain
            .into_iter()
            .skip(1)
            .map(|cell| self.cell_rect(cell).position())
            .collect();
        trace!(robot = %robot_id, target = %target_id, waypoints = waypoints.len(), "path planned");
        waypoints
    }
}
