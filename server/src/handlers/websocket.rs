//! WebSocket handler for the sync event stream.
//!
//! Every connection gets its own broadcast receiver. A connection that falls
//! behind is told how many events it missed and keeps streaming.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use migrator_engine::SyncEvent;
use tokio::sync::{broadcast, mpsc};

use crate::websocket::{ClientMessage, ServerMessage};

/// Forward sync events to an established WebSocket until either side closes.
pub async fn handle_events_connection(socket: WebSocket, mut events: broadcast::Receiver<SyncEvent>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Replies to client messages share the socket with the event stream.
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    tracing::info!("Event stream client connected");

    let send_task = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => ServerMessage::Event { event },
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Event stream client lagged");
                        ServerMessage::Lagged { missed }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                reply = rx.recv() => match reply {
                    Some(reply) => reply,
                    None => break,
                },
            };

            match serde_json::to_string(&message) {
                Ok(text) => {
                    if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                        tracing::warn!("Failed to send WebSocket message: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize WebSocket message: {}", e);
                }
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let reply = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Ping) => ServerMessage::Pong,
                    Err(e) => ServerMessage::error(format!("Invalid message format: {}", e)),
                };
                if tx.send(reply).is_err() {
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!("Binary messages not supported");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                tracing::debug!("WebSocket close frame received");
                break;
            }
            Err(e) => {
                tracing::warn!("WebSocket error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    tracing::info!("Event stream client disconnected");
}
