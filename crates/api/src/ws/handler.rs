//! WebSocket upgrade handler and per-connection socket loops.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use uuid::Uuid;

use crate::state::AppState;
use crate::ws::publisher::WsFrame;

/// GET /ws -- upgrade to a WebSocket connection.
///
/// Connections are anonymous: every client receives the same feed, so
/// no session is required to subscribe.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let mut rx = state.ws_manager.add(conn_id.clone()).await;
    let (mut sink, mut stream) = socket.split();

    // Seed the client with the current queue state before any deltas.
    let snapshot = state.engine.snapshot();
    match serde_json::to_string(&WsFrame::Snapshot { data: snapshot }) {
        Ok(json) => {
            if sink.send(Message::Text(json.into())).await.is_err() {
                state.ws_manager.remove(&conn_id).await;
                return;
            }
        }
        Err(err) => {
            tracing::error!(conn_id = %conn_id, error = %err, "Failed to serialize snapshot");
        }
    }

    // Forward queued outbound messages to the socket.
    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let is_close = matches!(message, Message::Close(_));
            if sink.send(message).await.is_err() || is_close {
                break;
            }
        }
    });

    // The feed is one-way; inbound traffic only keeps the connection
    // alive (Pong) or ends it (Close).
    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
            other => {
                tracing::debug!(conn_id = %conn_id, ?other, "Ignoring inbound frame");
            }
        }
    }

    state.ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
