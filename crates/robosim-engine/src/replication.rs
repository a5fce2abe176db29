//! NATS snapshot replication for remote factory viewers.
//!
//! The simulation service publishes every snapshot a prepared factory
//! broadcasts on the subject `factory.simulation.{factory_id}`. A remote
//! process subscribes to that subject and applies each payload as a
//! full-state replace, so duplicated, reordered, or dropped messages never
//! corrupt the mirrored view.
//!
//! Publishing is fire-and-forget: broker failures are logged and the
//! simulation keeps running. A forwarder task ends on its own when the
//! factory it serves is reset, which closes the snapshot channel.

use std::sync::Arc;

use futures::StreamExt;
use robosim_model::BroadcastNotifier;
use robosim_observer::RemoteFactoryView;
use robosim_types::{FactoryId, FactorySnapshot};
use tokio::sync::{Notify, RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::error::EngineError;

/// NATS client wrapper for snapshot replication.
///
/// Manages a single NATS connection. The publishing side attaches one
/// forwarder task per prepared factory with [`Self::forward`]; the
/// consuming side mirrors a factory into a [`RemoteFactoryView`] with
/// [`Self::watch`].
#[derive(Clone)]
pub struct SnapshotReplicator {
    client: async_nats::Client,
}

impl SnapshotReplicator {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Nats`] if the connection cannot be
    /// established.
    pub async fn connect(url: &str) -> Result<Self, EngineError> {
        info!(url = url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| EngineError::Nats {
                message: format!("failed to connect to {url}: {e}"),
            })?;
        info!("NATS connection established");
        Ok(Self { client })
    }

    /// Spawn a forwarder that drains `notifier` onto the factory's subject.
    ///
    /// Serialization and publish failures are logged but never propagate --
    /// replication must not stall the simulation. The task exits when the
    /// factory and its broadcast channel are dropped.
    pub fn forward(&self, factory_id: &FactoryId, notifier: &BroadcastNotifier) {
        let subject = snapshot_subject(factory_id);
        let receiver = notifier.subscribe();
        info!(subject = subject, "snapshot forwarder started");
        tokio::spawn(forward_snapshots(self.client.clone(), subject, receiver));
    }

    /// Mirror a factory's snapshot stream into a shared view.
    ///
    /// Subscribes to the factory's subject and spawns a task that applies
    /// every received snapshot to a fresh [`RemoteFactoryView`]. The view
    /// stays empty until the first snapshot arrives.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Nats`] if the subscription fails.
    pub async fn watch(&self, factory_id: &FactoryId) -> Result<RemoteFactoryMonitor, EngineError> {
        let subject = snapshot_subject(factory_id);
        let subscriber =
            self.client
                .subscribe(subject.clone())
                .await
                .map_err(|e| EngineError::Nats {
                    message: format!("failed to subscribe to {subject}: {e}"),
                })?;
        info!(subject = subject, "remote factory view subscribed");

        let view = Arc::new(RwLock::new(RemoteFactoryView::new()));
        let stop = Arc::new(Notify::new());
        tokio::spawn(apply_snapshots(
            subscriber,
            Arc::clone(&view),
            Arc::clone(&stop),
        ));
        Ok(RemoteFactoryMonitor { view, stop })
    }
}

impl std::fmt::Debug for SnapshotReplicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotReplicator")
            .field("connected", &true)
            .finish()
    }
}

/// Handle over a factory mirrored from the snapshot stream.
///
/// The subscriber task keeps updating the shared view until [`Self::stop`]
/// is called or the subscription ends.
#[derive(Debug, Clone)]
pub struct RemoteFactoryMonitor {
    view: Arc<RwLock<RemoteFactoryView>>,
    stop: Arc<Notify>,
}

impl RemoteFactoryMonitor {
    /// The mirrored view, shared with the subscriber task.
    pub fn view(&self) -> Arc<RwLock<RemoteFactoryView>> {
        Arc::clone(&self.view)
    }

    /// End the subscriber task, even while it is waiting for a message.
    pub fn stop(&self) {
        self.stop.notify_one();
    }
}

/// NATS subject carrying snapshots for one factory.
///
/// Subject format: `factory.simulation.{factory_id}`.
fn snapshot_subject(factory_id: &FactoryId) -> String {
    format!("factory.simulation.{factory_id}")
}

async fn forward_snapshots(
    client: async_nats::Client,
    subject: String,
    mut receiver: broadcast::Receiver<FactorySnapshot>,
) {
    loop {
        match receiver.recv().await {
            Ok(snapshot) => match serde_json::to_vec(&snapshot) {
                Ok(payload) => {
                    if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                        warn!(subject = subject, error = %e, "failed to publish snapshot");
                    }
                }
                Err(e) => {
                    warn!(subject = subject, error = %e, "failed to serialize snapshot");
                }
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(
                    subject = subject,
                    skipped = skipped,
                    "forwarder lagged, resuming from latest snapshot"
                );
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(subject = subject, "snapshot channel closed, forwarder exiting");
                return;
            }
        }
    }
}

async fn apply_snapshots(
    mut subscriber: async_nats::Subscriber,
    view: Arc<RwLock<RemoteFactoryView>>,
    stop: Arc<Notify>,
) {
    loop {
        tokio::select! {
            () = stop.notified() => {
                debug!("remote factory view stopped");
                return;
            }
            message = subscriber.next() => {
                let Some(message) = message else {
                    debug!("snapshot subscription ended");
                    return;
                };
                match serde_json::from_slice::<FactorySnapshot>(&message.payload) {
                    Ok(snapshot) => {
                        view.write().await.apply(snapshot);
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to deserialize snapshot payload");
                    }
                }
            }
        }
    }
}
