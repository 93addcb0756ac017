//! services/api/src/web/ws_handler.rs
//!
//! The WebSocket endpoint. Each connection subscribes to any number of
//! timetables and receives their slot and review events as they happen.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::StreamExt, SinkExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");

    let (mut sender, mut receiver) = socket.split();
    let mut events = app_state.events.subscribe();
    let mut subscriptions: HashSet<Uuid> = HashSet::new();

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let reply = match incoming {
                    Some(Ok(Message::Text(text))) => handle_text_message(&text, &mut subscriptions),
                    Some(Ok(Message::Close(_))) => {
                        info!("Client sent close message.");
                        break;
                    }
                    Some(Ok(_)) => None,
                    Some(Err(e)) => {
                        warn!("WebSocket receive failed: {}", e);
                        break;
                    }
                    None => {
                        info!("Client disconnected.");
                        break;
                    }
                };
                if let Some(reply) = reply {
                    if send(&mut sender, &reply).await.is_err() {
                        break;
                    }
                }
            }
            outgoing = events.recv() => {
                match outgoing {
                    Ok(message) => {
                        let wanted = message
                            .timetable_id()
                            .is_some_and(|id| subscriptions.contains(&id));
                        if wanted && send(&mut sender, &message).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("WebSocket client lagged behind by {} event(s).", skipped);
                        let notice = ServerMessage::Error {
                            message: format!("{} event(s) were dropped; reload the timetable.", skipped),
                        };
                        if send(&mut sender, &notice).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    info!("WebSocket connection closed.");
}

/// Applies a client message to the connection's subscriptions and returns the reply.
fn handle_text_message(text: &str, subscriptions: &mut HashSet<Uuid>) -> Option<ServerMessage> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Subscribe { timetable_id }) => {
            subscriptions.insert(timetable_id);
            Some(ServerMessage::Subscribed { timetable_id })
        }
        Ok(ClientMessage::Unsubscribe { timetable_id }) => {
            subscriptions.remove(&timetable_id);
            Some(ServerMessage::Unsubscribed { timetable_id })
        }
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            Some(ServerMessage::Error {
                message: format!("Invalid message: {}", e),
            })
        }
    }
}

async fn send<S>(sender: &mut S, message: &ServerMessage) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
{
    let json = serde_json::to_string(message).map_err(|e| {
        error!("Failed to serialize server message: {}", e);
    })?;
    sender.send(Message::Text(json.into())).await.map_err(|_| {
        error!("Failed to send message to WebSocket client.");
    })
}
