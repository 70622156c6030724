pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::registry::RoomRegistry;
use crate::session::snapshot;
use crate::types::{Actor, RoomNumber};
use handlers::Connection;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub room: RoomNumber,
    pub player_id: Option<String>,
    pub nickname: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(registry): State<RoomRegistry>,
) -> impl IntoResponse {
    tracing::info!(
        "WebSocket connection request: room={}, player_id={:?}",
        params.room,
        params.player_id
    );

    ws.on_upgrade(move |socket| handle_socket(socket, params, registry))
}

type Sender = SplitSink<WebSocket, Message>;

/// Serialize and send; false once the socket is gone
async fn send_message(sender: &mut Sender, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            true
        }
    }
}

/// Version carried by a state-bearing message
fn version_of(msg: &ServerMessage) -> Option<u64> {
    match msg {
        ServerMessage::State { snapshot } | ServerMessage::GuessResult { snapshot, .. } => {
            Some(snapshot.version)
        }
        _ => None,
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, registry: RoomRegistry) {
    let (mut sender, mut receiver) = socket.split();

    let player_id = params
        .player_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| ulid::Ulid::new().to_string());
    let nickname = params.nickname.unwrap_or_default();
    let conn = Connection {
        room: params.room,
        actor: Actor::new(player_id, nickname),
    };

    let mut room_rx = match registry.subscribe(conn.room).await {
        Ok(rx) => rx,
        Err(e) => {
            let _ = send_message(&mut sender, &ServerMessage::from(e)).await;
            return;
        }
    };

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        room_number: conn.room,
        player_id: conn.actor.id.clone(),
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if !send_message(&mut sender, &welcome).await {
        tracing::error!("Failed to send welcome message");
        return;
    }

    let initial = match registry.game_state(conn.room, Some(&conn.actor.id)).await {
        Ok(snapshot) => ServerMessage::state(snapshot),
        Err(e) => ServerMessage::from(e),
    };
    // Highest state version already delivered on this socket
    let mut last_version = version_of(&initial).unwrap_or(0);
    if !send_message(&mut sender, &initial).await {
        return;
    }

    loop {
        tokio::select! {
            update = room_rx.recv() => {
                let state = match update {
                    Ok(state) => state,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(room = conn.room, "Connection lagged by {} states", skipped);
                        match registry.state(conn.room).await {
                            Ok(state) => state,
                            Err(_) => continue,
                        }
                    }
                    Err(RecvError::Closed) => {
                        let closed = ServerMessage::RoomClosed { room_number: conn.room };
                        let _ = send_message(&mut sender, &closed).await;
                        break;
                    }
                };
                // Broadcasts run outside the room lock and can arrive late
                if state.version <= last_version {
                    continue;
                }
                last_version = state.version;
                let msg = ServerMessage::state(snapshot::project(&state, Some(&conn.actor.id)));
                if !send_message(&mut sender, &msg).await {
                    break;
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handlers::handle_message(client_msg, &conn, &registry).await
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                }
                            }
                        };

                        if let Some(version) = version_of(&reply) {
                            last_version = last_version.max(version);
                        }
                        if !send_message(&mut sender, &reply).await {
                            tracing::error!("Failed to send response");
                            break;
                        }
                        if matches!(reply, ServerMessage::Left { .. }) {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!(
        room = conn.room,
        "WebSocket connection closed for {}",
        conn.actor.id
    );
}
