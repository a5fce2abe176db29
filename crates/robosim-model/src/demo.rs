//! Default demonstration factory layout.
//!
//! Builds the puck factory floor used by the engine on first start: two
//! production rooms with a machine each, a charging room, a conveyor near
//! the bottom edge, and four robots lined up along the top. Robot 1 cycles
//! across every station kind; the others shuttle between the two machines.

use robosim_types::{ComponentId, FactoryId, Position, Rect, Shape, WallSide};

use crate::component::{Component, ComponentKind, Door, RobotUnit};
use crate::error::ModelError;
use crate::factory::Factory;

/// Helper to build a rectangular component.
fn rectangular(
    name: &str,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    kind: ComponentKind,
) -> Component {
    Component::new(name, Position::new(x, y), Shape::Rectangle { width, height }, kind)
}

/// Helper to build a door component placed inside its room's wall.
fn door(
    name: &str,
    room_id: ComponentId,
    room: Rect,
    side: WallSide,
    offset: i32,
    size: i32,
) -> Component {
    let placement = Door {
        room_id,
        side,
        offset,
        size,
        open: true,
    };
    let opening = placement.opening_rect(room);
    Component::new(
        name,
        opening.position(),
        Shape::Rectangle {
            width: opening.width,
            height: opening.height,
        },
        ComponentKind::Door(placement),
    )
}

/// Helper to build a robot component.
fn robot(name: &str, x: i32, y: i32, targets: Vec<ComponentId>) -> Component {
    Component::new(
        name,
        Position::new(x, y),
        Shape::Circle { radius: 2 },
        ComponentKind::Robot(RobotUnit::new(10, targets)),
    )
}

/// Identifiers for all demo components, returned alongside the factory so
/// that callers can reference specific components for simulations and tests.
#[derive(Debug, Clone)]
pub struct DemoComponentIds {
    /// Production Room 1, top-left quadrant.
    pub room1: ComponentId,
    /// Door in Production Room 1's bottom wall.
    pub entrance: ComponentId,
    /// Work area inside Production Room 1.
    pub area1: ComponentId,
    /// Machine 1, inside Production Room 1.
    pub machine1: ComponentId,
    /// Production Room 2, top-right quadrant.
    pub room2: ComponentId,
    /// Door in Production Room 2's left wall.
    pub room2_door: ComponentId,
    /// Work area inside Production Room 2.
    pub area2: ComponentId,
    /// Machine 2, inside Production Room 2.
    pub machine2: ComponentId,
    /// Conveyor near the bottom edge.
    pub conveyor: ComponentId,
    /// Charging room, lower middle.
    pub charging_room: ComponentId,
    /// Door in the charging room's right wall.
    pub charging_door: ComponentId,
    /// Charging station inside the charging room.
    pub charging_station: ComponentId,
    /// Robot visiting both machines, the conveyor, and the charging station.
    pub robot1: ComponentId,
    /// Robot shuttling between the two machines.
    pub robot2: ComponentId,
    /// Robot shuttling between the two machines.
    pub robot3: ComponentId,
    /// Robot shuttling between the two machines.
    pub robot4: ComponentId,
}

/// Create the demonstration puck factory.
///
/// Returns the populated [`Factory`] and the [`DemoComponentIds`] for
/// referencing specific components.
///
/// # Errors
///
/// Returns [`ModelError`] if the floor construction fails (should not
/// happen with valid hard-coded data).
#[allow(clippy::too_many_lines)]
pub fn create_demo_factory(id: FactoryId) -> Result<(Factory, DemoComponentIds), ModelError> {
    let factory = Factory::new(id, "Simple Test Puck Factory", 200, 200);

    // Production room 1 with its entrance in the bottom wall.
    let room1_rect = Rect::new(20, 20, 75, 75);
    let room1 = factory.add_component(rectangular(
        "Production Room 1",
        room1_rect.x,
        room1_rect.y,
        room1_rect.width,
        room1_rect.height,
        ComponentKind::Room,
    ))?;
    let entrance = factory.add_component(door(
        "Entrance",
        room1,
        room1_rect,
        WallSide::Bottom,
        10,
        20,
    ))?;
    let area1 = factory.add_component(rectangular(
        "Production Area 1",
        35,
        35,
        50,
        50,
        ComponentKind::Area,
    ))?;
    let machine1 = factory.add_component(rectangular(
        "Machine 1",
        50,
        50,
        15,
        15,
        ComponentKind::Machine,
    ))?;

    // Production room 2, entered from the left.
    let room2_rect = Rect::new(120, 22, 75, 75);
    let room2 = factory.add_component(rectangular(
        "Production Room 2",
        room2_rect.x,
        room2_rect.y,
        room2_rect.width,
        room2_rect.height,
        ComponentKind::Room,
    ))?;
    let room2_door = factory.add_component(door(
        "Room 2 Door",
        room2,
        room2_rect,
        WallSide::Left,
        10,
        20,
    ))?;
    let area2 = factory.add_component(rectangular(
        "Production Area 2",
        135,
        35,
        50,
        50,
        ComponentKind::Area,
    ))?;
    let machine2 = factory.add_component(rectangular(
        "Machine 2",
        150,
        50,
        15,
        15,
        ComponentKind::Machine,
    ))?;

    // Conveyor outline near the bottom edge, anchored at its bounding box.
    let conveyor = factory.add_component(Component::new(
        "Conveyor 1",
        Position::new(7, 165),
        Shape::Polygon {
            vertices: vec![
                Position::new(3, 0),
                Position::new(13, 0),
                Position::new(13, 27),
                Position::new(16, 27),
                Position::new(16, 30),
                Position::new(0, 30),
                Position::new(0, 27),
                Position::new(3, 27),
            ],
        },
        ComponentKind::Conveyor,
    ))?;

    // Charging room with the station inside, entered from the right.
    let charging_rect = Rect::new(125, 125, 50, 50);
    let charging_room = factory.add_component(rectangular(
        "Charging Room",
        charging_rect.x,
        charging_rect.y,
        charging_rect.width,
        charging_rect.height,
        ComponentKind::Room,
    ))?;
    let charging_door = factory.add_component(door(
        "Charging Room Door",
        charging_room,
        charging_rect,
        WallSide::Right,
        10,
        20,
    ))?;
    let charging_station = factory.add_component(rectangular(
        "Charging Station",
        150,
        145,
        15,
        15,
        ComponentKind::ChargingStation,
    ))?;

    // Robots along the top edge. Robot 1 visits every station kind.
    let robot1 = factory.add_component(robot(
        "Robot 1",
        5,
        5,
        vec![machine1, machine2, conveyor, charging_station],
    ))?;
    let robot2 = factory.add_component(robot("Robot 2", 15, 5, vec![machine1, machine2]))?;
    let robot3 = factory.add_component(robot("Robot 3", 25, 5, vec![machine1, machine2]))?;
    let robot4 = factory.add_component(robot("Robot 4", 35, 5, vec![machine1, machine2]))?;

    let ids = DemoComponentIds {
        room1,
        entrance,
        area1,
        machine1,
        room2,
        room2_door,
        area2,
        machine2,
        conveyor,
        charging_room,
        charging_door,
        charging_station,
        robot1,
        robot2,
        robot3,
        robot4,
    };
    Ok((factory, ids))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::pathfinder::{GridPathFinder, PathFinder};

    fn make_demo() -> (Factory, DemoComponentIds) {
        create_demo_factory(FactoryId::new("demo")).unwrap()
    }

    #[test]
    fn demo_floor_has_the_full_component_roster() {
        let (factory, _ids) = make_demo();
        assert_eq!(factory.component_count(), 16);
    }

    #[test]
    fn component_names_are_unique() {
        let (factory, _ids) = make_demo();
        let snapshot = factory.snapshot();
        let names: BTreeSet<&str> = snapshot
            .components
            .iter()
            .map(|component| component.name.as_str())
            .collect();
        assert_eq!(names.len(), snapshot.components.len());
    }

    #[test]
    fn robot1_cycles_across_every_station_kind() {
        let (factory, ids) = make_demo();
        let view = factory.robot_view(ids.robot1).unwrap();
        assert_eq!(
            view.target_ids,
            vec![ids.machine1, ids.machine2, ids.conveyor, ids.charging_station]
        );
        let view2 = factory.robot_view(ids.robot2).unwrap();
        assert_eq!(view2.target_ids, vec![ids.machine1, ids.machine2]);
    }

    #[test]
    fn every_robot_target_is_reachable() {
        let (factory, ids) = make_demo();
        let finder = GridPathFinder::default();
        for robot in [ids.robot1, ids.robot2, ids.robot3, ids.robot4] {
            let view = factory.robot_view(robot).unwrap();
            for target in view.target_ids {
                let path = finder.find_path(&factory, robot, target);
                assert!(
                    !path.is_empty(),
                    "no route from {robot} to {target}"
                );
            }
        }
    }

    #[test]
    fn walls_block_and_door_openings_pass() {
        let (factory, _ids) = make_demo();
        // Bottom wall of Production Room 1, away from the entrance.
        assert!(factory.has_obstacle_at(Rect::new(60, 90, 5, 5)));
        // The entrance opening itself.
        assert!(!factory.has_obstacle_at(Rect::new(35, 90, 5, 5)));
        // Machines never block.
        assert!(!factory.has_obstacle_at(Rect::new(50, 50, 5, 5)));
    }

    #[test]
    fn robots_start_idle_and_unblocked() {
        let (factory, _ids) = make_demo();
        for status in factory.robot_statuses() {
            assert!(!status.blocked);
            assert!(!status.lively_locked);
            assert_eq!(status.successful_moves, 0);
            assert_eq!(status.current_target_name, None);
        }
        assert!(!factory.is_running());
    }
}
