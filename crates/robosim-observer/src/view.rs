//! Client-side mirror of a remote factory.
//!
//! A [`RemoteFactoryView`] consumes the snapshot stream (from the
//! `WebSocket` endpoint or the replication subject) and keeps the latest
//! full state. Applying a snapshot is a wholesale replace: duplicates
//! are ignored, snapshots older than the current state are discarded by
//! capture time, and gaps need no repair because every frame carries the
//! complete factory.

use robosim_types::{FactorySnapshot, Position};

/// The latest known state of a factory observed over the snapshot stream.
#[derive(Debug, Clone, Default)]
pub struct RemoteFactoryView {
    current: Option<FactorySnapshot>,
}

impl RemoteFactoryView {
    /// Create an empty view that has not seen a snapshot yet.
    pub const fn new() -> Self {
        Self { current: None }
    }

    /// Apply a received snapshot, returning whether the view changed.
    ///
    /// A snapshot captured earlier than the current one is discarded, so
    /// reordered deliveries cannot roll the view backwards. Re-applying
    /// the current snapshot is a no-op.
    pub fn apply(&mut self, snapshot: FactorySnapshot) -> bool {
        match &self.current {
            Some(current) if snapshot.captured_at < current.captured_at => false,
            Some(current) if *current == snapshot => false,
            _ => {
                self.current = Some(snapshot);
                true
            }
        }
    }

    /// The most recent snapshot, if any has been applied.
    pub const fn snapshot(&self) -> Option<&FactorySnapshot> {
        self.current.as_ref()
    }

    /// Whether the remote simulation was running at the last snapshot.
    pub fn is_running(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|snapshot| snapshot.running)
    }

    /// Name and position of every robot in the current snapshot.
    pub fn robot_positions(&self) -> Vec<(&str, Position)> {
        self.current.as_ref().map_or_else(Vec::new, |snapshot| {
            snapshot
                .robots()
                .map(|(component, _)| (component.name.as_str(), component.position))
                .collect()
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use robosim_types::{
        ComponentId, ComponentKindSnapshot, ComponentSnapshot, FactoryId, RobotSnapshot, Shape,
    };

    use super::*;

    fn at(seconds: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, seconds).unwrap()
    }

    fn make_snapshot(seconds: u32, robot_x: i32) -> FactorySnapshot {
        FactorySnapshot {
            id: FactoryId::new("factory-1"),
            name: "Puck Factory".to_owned(),
            width: 200,
            height: 200,
            running: true,
            captured_at: at(seconds),
            components: vec![ComponentSnapshot {
                id: ComponentId::new(),
                name: "Robot 1".to_owned(),
                position: Position::new(robot_x, 5),
                shape: Shape::Circle { radius: 2 },
                kind: ComponentKindSnapshot::Robot(RobotSnapshot {
                    battery_capacity: 10,
                    speed: 5,
                    blocked: false,
                    successful_moves: 0,
                    target_names: vec![],
                    current_target_name: None,
                    memorized_position: None,
                }),
            }],
        }
    }

    #[test]
    fn empty_view_has_no_state() {
        let view = RemoteFactoryView::new();
        assert!(view.snapshot().is_none());
        assert!(!view.is_running());
        assert!(view.robot_positions().is_empty());
    }

    #[test]
    fn apply_replaces_the_whole_state() {
        let mut view = RemoteFactoryView::new();

        assert!(view.apply(make_snapshot(1, 5)));
        assert_eq!(view.robot_positions(), vec![("Robot 1", Position::new(5, 5))]);

        assert!(view.apply(make_snapshot(2, 10)));
        assert_eq!(
            view.robot_positions(),
            vec![("Robot 1", Position::new(10, 5))]
        );
        assert!(view.is_running());
    }

    #[test]
    fn duplicate_snapshot_is_a_no_op() {
        let mut view = RemoteFactoryView::new();
        let snapshot = make_snapshot(1, 5);

        assert!(view.apply(snapshot.clone()));
        assert!(!view.apply(snapshot));
    }

    #[test]
    fn reordered_older_snapshot_is_discarded() {
        let mut view = RemoteFactoryView::new();

        assert!(view.apply(make_snapshot(5, 20)));
        assert!(!view.apply(make_snapshot(2, 10)));

        assert_eq!(
            view.robot_positions(),
            vec![("Robot 1", Position::new(20, 5))]
        );
    }

    #[test]
    fn gaps_in_the_stream_need_no_repair() {
        let mut view = RemoteFactoryView::new();

        assert!(view.apply(make_snapshot(1, 5)));
        // Frames 2..9 lost in transit.
        assert!(view.apply(make_snapshot(10, 45)));

        assert_eq!(
            view.robot_positions(),
            vec![("Robot 1", Position::new(45, 5))]
        );
    }
}
