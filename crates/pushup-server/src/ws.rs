//! WebSocket observers of the count resource
//!
//! Clients connect to /count/observe, get the current count straight away
//! and then every count the player publishes, as plain text frames.

use crate::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;

/// WebSocket upgrade handler
pub async fn observe_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_observer(socket, state))
}

/// Handle an individual observer connection
async fn handle_observer(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Subscribe before reading the count so no change falls in between
    let mut rx = state.count_tx.subscribe();

    match state.control.status().await {
        Ok(status) => {
            let count = status.session.repetition_count.to_string();
            if ws_sender.send(Message::Text(count.into())).await.is_err() {
                return;
            }
        }
        Err(e) => {
            tracing::error!("Failed to read initial count: {}", e);
            return;
        }
    }

    tracing::debug!("Count observer registered");

    // Forward notifications to this client
    let mut send_task = tokio::spawn(async move {
        loop {
            let count = match rx.recv().await {
                Ok(count) => count,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Count observer lagging");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            if ws_sender
                .send(Message::Text(count.to_string().into()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Drain incoming messages (pings, close)
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    tracing::debug!("Count observer disconnected");
}
