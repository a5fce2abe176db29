//! `WebSocket` handler for live factory snapshot streaming.
//!
//! Clients connect to `GET /ws/simulations/:id` and receive a
//! JSON-encoded [`FactorySnapshot`] frame for every observable change in
//! that factory: membership changes, running-flag flips, and each
//! committed robot move. The first frame is the current snapshot, so a
//! late subscriber starts from full state.
//!
//! Every frame is a full-state replace. If a client falls behind, lagged
//! frames are silently skipped and the client resumes from the most
//! recent snapshot, which loses no information.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use robosim_store::FactoryStore;
use robosim_types::{FactoryId, FactorySnapshot};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::ObserverError;
use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming snapshots of one prepared factory.
///
/// # Route
///
/// `GET /ws/simulations/:id`
pub async fn ws_simulation<S: FactoryStore>(
    ws: WebSocketUpgrade,
    Path(id): Path<String>,
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ObserverError> {
    let factory_id = FactoryId::new(id);
    let active = state
        .active(&factory_id)
        .await
        .ok_or_else(|| ObserverError::not_prepared(&factory_id))?;

    let receiver = active.notifier.subscribe();
    let initial = active.simulation.factory().snapshot();

    Ok(ws.on_upgrade(move |socket| stream_snapshots(socket, initial, receiver)))
}

/// Handle the `WebSocket` lifecycle: send the current snapshot, then
/// forward each broadcast snapshot as a text frame until either side
/// disconnects or the simulation is reset.
async fn stream_snapshots(
    mut socket: WebSocket,
    initial: FactorySnapshot,
    mut receiver: broadcast::Receiver<FactorySnapshot>,
) {
    debug!(factory = %initial.id, "WebSocket client connected");

    if send_snapshot(&mut socket, &initial).await.is_err() {
        debug!("WebSocket client disconnected before the first frame");
        return;
    }

    loop {
        tokio::select! {
            // Receive a snapshot from the factory's broadcast channel.
            result = receiver.recv() => {
                match result {
                    Ok(snapshot) => {
                        if send_snapshot(&mut socket, &snapshot).await.is_err() {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "WebSocket client lagged, resuming from newest snapshot");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Snapshot channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            // Check if the client sent a close frame or disconnected.
            message = socket.recv() => {
                match message {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(error)) => {
                        debug!(%error, "WebSocket error");
                        return;
                    }
                    _ => {
                        // Ignore client text and binary frames.
                    }
                }
            }
        }
    }
}

/// Serialize a snapshot and send it as one text frame.
///
/// Serialization failures are logged and swallowed so one bad snapshot
/// does not tear down the session; send failures propagate because they
/// mean the client is gone.
async fn send_snapshot(
    socket: &mut WebSocket,
    snapshot: &FactorySnapshot,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(snapshot) {
        Ok(json) => json,
        Err(error) => {
            warn!(%error, "Failed to serialize factory snapshot");
            return Ok(());
        }
    };
    socket.send(Message::Text(json.into())).await
}
