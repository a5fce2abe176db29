//! Change notification fan-out for factory observers.
//!
//! The factory calls [`ChangeNotifier::factory_changed`] with a fresh
//! snapshot after every observable mutation. The broadcast implementation
//! fans snapshots out to websocket sessions and the replication forwarder;
//! the no-op implementation serves factories nobody watches, such as
//! short-lived test fixtures.

use robosim_types::FactorySnapshot;
use tokio::sync::broadcast;
use tracing::trace;

/// Receiver of factory change notifications.
///
/// Implementations must not block: notifications are delivered from
/// simulation worker threads between moves.
pub trait ChangeNotifier: Send + Sync {
    /// Called after an observable change with the post-change snapshot.
    fn factory_changed(&self, snapshot: &FactorySnapshot);
}

/// Notifier that drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn factory_changed(&self, _snapshot: &FactorySnapshot) {}
}

/// Notifier that fans snapshots out over a tokio broadcast channel.
///
/// Sending never blocks. Slow receivers lag and skip snapshots rather than
/// back-pressuring the simulation, which is acceptable because every
/// snapshot carries the full factory state.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<FactorySnapshot>,
}

impl BroadcastNotifier {
    /// Create a notifier whose channel buffers up to `capacity` snapshots.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to future snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<FactorySnapshot> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn factory_changed(&self, snapshot: &FactorySnapshot) {
        // Send fails only when nobody is subscribed, which is not an error.
        if self.sender.send(snapshot.clone()).is_err() {
            trace!(factory_id = %snapshot.id, "snapshot dropped, no subscribers");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use robosim_types::FactoryId;

    use super::*;

    fn make_snapshot() -> FactorySnapshot {
        FactorySnapshot {
            id: FactoryId::new("factory-1"),
            name: "Test Factory".to_owned(),
            width: 100,
            height: 100,
            running: false,
            captured_at: Utc::now(),
            components: vec![],
        }
    }

    #[test]
    fn broadcast_reaches_subscriber() {
        let notifier = BroadcastNotifier::new(8);
        let mut receiver = notifier.subscribe();
        notifier.factory_changed(&make_snapshot());
        let received = receiver.try_recv().unwrap();
        assert_eq!(received.id, FactoryId::new("factory-1"));
    }

    #[test]
    fn send_without_subscribers_is_not_an_error() {
        let notifier = BroadcastNotifier::new(8);
        notifier.factory_changed(&make_snapshot());
        assert_eq!(notifier.receiver_count(), 0);
    }
}
