//! Background task that fans queue changes out to WebSocket clients.
//!
//! Two inputs feed the task: the store's watch channels (entries and
//! metadata snapshots) and the ephemeral event bus (announcements and
//! admission notifications). Store changes are coalesced into a full
//! snapshot frame; bus events are forwarded individually.

use std::sync::Arc;

use axum::extract::ws::Message;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokenq_core::{QueueMetadata, QueueSnapshot};
use tokenq_events::{EventBus, QueueEvent};
use tokenq_store::QueueStore;

use crate::ws::WsManager;

/// Outbound WebSocket frame.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsFrame {
    /// Full queue state. Sent on connect and after every store change.
    Snapshot { data: QueueSnapshot },
    /// A single ephemeral event from the bus.
    Event { data: QueueEvent },
}

/// Spawn the publisher task.
///
/// Runs until the cancellation token fires. Lagged bus subscribers skip
/// ahead rather than terminating the feed; clients still converge via
/// the next snapshot frame.
pub fn start_publisher(
    store: Arc<dyn QueueStore>,
    bus: Arc<EventBus>,
    manager: Arc<WsManager>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut entries_rx = store.subscribe_entries();
        let mut metadata_rx = store.subscribe_metadata();
        let mut events_rx = bus.subscribe();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Publisher task stopping");
                    break;
                }
                changed = entries_rx.changed() => {
                    if changed.is_err() {
                        tracing::warn!("Entries channel closed, publisher stopping");
                        break;
                    }
                    let snapshot = QueueSnapshot {
                        entries: entries_rx.borrow_and_update().clone(),
                        metadata: current_metadata(&mut metadata_rx),
                    };
                    send_frame(&manager, WsFrame::Snapshot { data: snapshot }).await;
                }
                changed = metadata_rx.changed() => {
                    if changed.is_err() {
                        tracing::warn!("Metadata channel closed, publisher stopping");
                        break;
                    }
                    let snapshot = QueueSnapshot {
                        entries: entries_rx.borrow_and_update().clone(),
                        metadata: current_metadata(&mut metadata_rx),
                    };
                    send_frame(&manager, WsFrame::Snapshot { data: snapshot }).await;
                }
                event = events_rx.recv() => {
                    match event {
                        Ok(event) => {
                            send_frame(&manager, WsFrame::Event { data: event }).await;
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Publisher lagged behind event bus");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            tracing::warn!("Event bus closed, publisher stopping");
                            break;
                        }
                    }
                }
            }
        }
    })
}

fn current_metadata(rx: &mut tokio::sync::watch::Receiver<QueueMetadata>) -> QueueMetadata {
    *rx.borrow_and_update()
}

async fn send_frame(manager: &WsManager, frame: WsFrame) {
    match serde_json::to_string(&frame) {
        Ok(json) => manager.broadcast(Message::Text(json.into())).await,
        Err(err) => tracing::error!(error = %err, "Failed to serialize WebSocket frame"),
    }
}
