//! Worker scheduling for a running simulation.
//!
//! A [`Simulation`] owns one async worker per robot on the factory floor.
//! Each worker loops independently: while the factory's running flag is
//! set, run one behavior tick, then sleep for the tick interval. There is
//! no global tick barrier; workers only meet inside the factory monitor.
//!
//! Stopping clears the running flag and wakes every sleeping worker
//! through a shared [`Notify`], so workers exit within one tick interval
//! rather than waiting out their current sleep.

use std::pin::pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use robosim_model::{Factory, PathFinder};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::behavior::RobotDriver;

/// A factory simulation and the robot workers that animate it.
pub struct Simulation {
    factory: Arc<Factory>,
    path_finder: Arc<dyn PathFinder>,
    tick_interval: Duration,
    stop: Arc<Notify>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Simulation {
    /// Prepare a simulation for the given factory. No workers run until
    /// [`start`](Self::start) is called.
    pub fn new(
        factory: Arc<Factory>,
        path_finder: Arc<dyn PathFinder>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            factory,
            path_finder,
            tick_interval,
            stop: Arc::new(Notify::new()),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// The simulated factory.
    pub const fn factory(&self) -> &Arc<Factory> {
        &self.factory
    }

    /// Whether the simulation is currently running.
    pub fn is_running(&self) -> bool {
        self.factory.is_running()
    }

    /// Number of robot workers spawned by the last start.
    pub fn worker_count(&self) -> usize {
        self.workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Flip the running flag and spawn one worker per robot. Calling this
    /// on an already running simulation does nothing.
    pub fn start(&self) {
        let mut workers = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.factory.is_running() {
            debug!(factory = %self.factory.id(), "simulation already running");
            return;
        }
        self.factory.set_running(true);

        let robots = self.factory.robot_statuses();
        info!(
            factory = %self.factory.id(),
            robots = robots.len(),
            tick_interval = ?self.tick_interval,
            "simulation starting"
        );
        for status in robots {
            let driver = RobotDriver::new(status.id, status.name, Arc::clone(&self.path_finder));
            workers.push(tokio::spawn(run_worker(
                Arc::clone(&self.factory),
                driver,
                self.tick_interval,
                Arc::clone(&self.stop),
            )));
        }
    }

    /// Clear the running flag and wake every sleeping worker so the loops
    /// wind down promptly.
    pub fn stop(&self) {
        self.factory.set_running(false);
        self.stop.notify_waiters();
    }

    /// Wait for every spawned worker to finish its loop.
    pub async fn wait_until_stopped(&self) {
        let handles = std::mem::take(
            &mut *self
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            if let Err(error) = handle.await {
                error!(%error, "robot worker did not shut down cleanly");
            }
        }
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("factory", &self.factory.id())
            .field("tick_interval", &self.tick_interval)
            .finish_non_exhaustive()
    }
}

/// One robot's loop: tick, sleep, repeat while the factory runs.
///
/// A tick error means the robot vanished from the floor; the worker logs
/// it and winds down without touching its siblings.
async fn run_worker(
    factory: Arc<Factory>,
    mut driver: RobotDriver,
    tick_interval: Duration,
    stop: Arc<Notify>,
) {
    info!(robot = %driver.name(), "robot worker started");
    loop {
        // Register for the stop signal before checking the flag, so a stop
        // arriving between the check and the sleep is never missed.
        let mut stopped = pin!(stop.notified());
        stopped.as_mut().enable();
        if !factory.is_running() {
            break;
        }
        let result = {
            let mut rng = rand::rng();
            driver.tick(&factory, &mut rng)
        };
        if let Err(error) = result {
            error!(robot = %driver.name(), %error, "behavior tick failed, stopping worker");
            break;
        }
        tokio::select! {
            () = tokio::time::sleep(tick_interval) => {}
            () = stopped => {}
        }
    }
    let stats = driver.stats();
    info!(
        robot = %driver.name(),
        attempts = stats.attempts,
        committed = stats.committed,
        rejected = stats.rejected,
        "robot worker stopped"
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use robosim_model::{BroadcastNotifier, Component, ComponentKind, GridPathFinder, RobotUnit};
    use robosim_types::{ComponentId, FactoryId, FactorySnapshot, Position, Rect, Shape};
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;

    fn make_factory() -> Arc<Factory> {
        Arc::new(Factory::new(
            FactoryId::from("simulation-floor"),
            "Simulation Floor",
            200,
            200,
        ))
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

    fn make_robot(factory: &Factory, name: &str, x: i32, y: i32, targets: Vec<ComponentId>) {
        factory
            .add_component(Component::new(
                name,
                Position::new(x, y),
                Shape::Circle { radius: 2 },
                ComponentKind::Robot(RobotUnit::new(10, targets)),
            ))
            .unwrap();
    }

    fn make_simulation(factory: &Arc<Factory>, tick_interval: Duration) -> Simulation {
        Simulation::new(
            Arc::clone(factory),
            Arc::new(GridPathFinder::new(5)),
            tick_interval,
        )
    }

    fn assert_disjoint_robots(snapshot: &FactorySnapshot) {
        let footprints: Vec<(&str, Rect)> = snapshot
            .robots()
            .map(|(component, _)| {
                (
                    component.name.as_str(),
                    component.shape.bounding_rect(component.position),
                )
            })
            .collect();
        for (index, (name, footprint)) in footprints.iter().enumerate() {
            for (other_name, other_footprint) in footprints.iter().skip(index.saturating_add(1)) {
                assert!(
                    !footprint.overlaps(*other_footprint),
                    "{name} overlaps {other_name}"
                );
            }
        }
    }

    #[tokio::test]
    async fn workers_drive_robots_until_stopped() {
        let factory = make_factory();
        let machine = make_machine(&factory, "Machine 1", 145, 5);
        make_robot(&factory, "Robot 1", 5, 5, vec![machine]);
        let simulation = make_simulation(&factory, Duration::from_millis(5));

        assert!(!simulation.is_running());
        simulation.start();
        assert!(simulation.is_running());

        tokio::time::sleep(Duration::from_millis(60)).await;
        simulation.stop();
        simulation.wait_until_stopped().await;

        assert!(!simulation.is_running());
        let moved = factory
            .snapshot()
            .robots()
            .next()
            .map(|(component, _)| component.position)
            .unwrap();
        assert_ne!(moved, Position::new(5, 5));
    }

    #[tokio::test]
    async fn stop_wakes_sleeping_workers_promptly() {
        let factory = make_factory();
        let machine = make_machine(&factory, "Machine 1", 45, 5);
        make_robot(&factory, "Robot 1", 5, 5, vec![machine]);
        // An interval far longer than the test: exiting in time proves the
        // sleep was interrupted rather than waited out.
        let simulation = make_simulation(&factory, Duration::from_secs(60));

        simulation.start();
        tokio::time::sleep(Duration::from_millis(20)).await;
        simulation.stop();

        let shutdown =
            tokio::time::timeout(Duration::from_secs(1), simulation.wait_until_stopped()).await;
        assert!(shutdown.is_ok());
    }

    #[tokio::test]
    async fn starting_twice_spawns_workers_once() {
        let factory = make_factory();
        let machine = make_machine(&factory, "Machine 1", 45, 5);
        make_robot(&factory, "Robot 1", 5, 5, vec![machine]);
        let simulation = make_simulation(&factory, Duration::from_millis(5));

        simulation.start();
        simulation.start();
        assert_eq!(simulation.worker_count(), 1);

        simulation.stop();
        simulation.wait_until_stopped().await;
    }

    #[tokio::test]
    async fn worker_survives_sibling_removal() {
        let factory = make_factory();
        let machine = make_machine(&factory, "Machine 1", 145, 5);
        make_robot(&factory, "Robot 1", 5, 5, vec![machine]);
        make_robot(&factory, "Robot 2", 5, 45, vec![machine]);
        let simulation = make_simulation(&factory, Duration::from_millis(5));

        simulation.start();
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Removing one robot kills only its own worker.
        let doomed = factory.component_id_by_name("Robot 2").unwrap();
        factory.remove_component(doomed).unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        let survivor = factory.component_id_by_name("Robot 1").unwrap();
        assert!(factory.position_of(survivor) != Some(Position::new(5, 5)));

        simulation.stop();
        simulation.wait_until_stopped().await;
    }

    #[tokio::test]
    async fn broadcast_snapshots_never_show_overlapping_robots() {
        let mut factory = Factory::new(
            FactoryId::from("simulation-floor"),
            "Simulation Floor",
            200,
            200,
        );
        let notifier = BroadcastNotifier::new(1024);
        let mut snapshots = notifier.subscribe();
        factory.set_notifier(Box::new(notifier));
        let factory = Arc::new(factory);

        // Three robots converge on the same machine from different corners,
        // so the final approach is contested.
        let machine = make_machine(&factory, "Machine 1", 95, 95);
        make_robot(&factory, "Robot 1", 5, 5, vec![machine]);
        make_robot(&factory, "Robot 2", 190, 5, vec![machine]);
        make_robot(&factory, "Robot 3", 5, 190, vec![machine]);
        let simulation = make_simulation(&factory, Duration::from_millis(5));

        simulation.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        simulation.stop();
        simulation.wait_until_stopped().await;

        let mut observed = 0_u32;
        loop {
            match snapshots.try_recv() {
                Ok(snapshot) => {
                    observed = observed.saturating_add(1);
                    assert_disjoint_robots(&snapshot);
                }
                Err(TryRecvError::Lagged(_)) => {}
                Err(_) => break,
            }
        }
        assert!(observed > 0, "no snapshots were broadcast");
        assert_disjoint_robots(&factory.snapshot());
    }
}
