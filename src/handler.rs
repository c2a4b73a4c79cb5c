//! HTTP and WebSocket surface of the relay.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderValue,
    response::IntoResponse,
    routing::get,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use tokio::time;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{debug, info, warn};

use crate::config::{CorsOrigins, SignalConfig};
use crate::connection::{Connection, ConnectionId};
use crate::protocol::{RoomIdResponse, RoomListResponse, SignalMessage};
use crate::registry::RoomRegistry;
use crate::room::RoomId;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
    pub config: Arc<SignalConfig>,
}

impl AppState {
    pub fn new(config: SignalConfig) -> Self {
        Self {
            registry: Arc::new(RoomRegistry::new(config.room_id_len)),
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/create_room", get(create_room))
        .route("/join_random_room", get(join_random_room))
        .route("/rooms", get(list_rooms))
        .route("/health", get(health))
        .route("/ws/{room_id}", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origins {
        CorsOrigins::Any => layer.allow_origin(Any),
        CorsOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("ignoring invalid CORS origin {origin:?}");
                        None
                    }
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(values))
        }
    }
}

pub async fn create_room(State(state): State<AppState>) -> Json<RoomIdResponse> {
    Json(RoomIdResponse {
        room_id: state.registry.create_room(),
    })
}

pub async fn join_random_room(State(state): State<AppState>) -> Json<RoomIdResponse> {
    Json(RoomIdResponse {
        room_id: state.registry.find_available_room(),
    })
}

pub async fn list_rooms(State(state): State<AppState>) -> Json<RoomListResponse> {
    Json(state.registry.list_rooms().into())
}

async fn health() -> &'static str {
    "OK"
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let room_id = RoomId::from(room_id);
    ws.on_upgrade(move |socket| handle_socket(socket, room_id, state))
}

/// Leaves the room when the session ends, however it ends: normal return,
/// early return, panic or the task being dropped.
struct SessionGuard {
    registry: Arc<RoomRegistry>,
    room_id: RoomId,
    conn: ConnectionId,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.disconnect_from_room(&self.room_id, self.conn);
    }
}

async fn handle_socket(socket: WebSocket, room_id: RoomId, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn = Connection::new(tx);
    let conn_id = conn.id();

    let room = match state.registry.connect_to_room(&room_id, conn) {
        Ok(room) => room,
        Err(e) => {
            warn!(room = %room_id, conn = %conn_id, "join rejected: {e}");
            let frame = CloseFrame {
                code: e.close_code(),
                reason: e.to_string().into(),
            };
            let _ = sender.send(Message::Close(Some(frame))).await;
            return;
        }
    };
    let _guard = SessionGuard {
        registry: Arc::clone(&state.registry),
        room_id: room_id.clone(),
        conn: conn_id,
    };
    info!(room = %room_id, conn = %conn_id, "session started");

    // Writer: drains the connection's queue into the socket and keeps it alive.
    let ping_every = state.config.ping_interval;
    let mut send_task = tokio::spawn(async move {
        let mut ping_interval = time::interval_at(time::Instant::now() + ping_every, ping_every);
        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else { break };
                    if sender.send(msg).await.is_err() { break; }
                }
                _ = ping_interval.tick() => {
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() { break; }
                }
            }
        }
    });

    // Reader: every valid signal goes to the other side of the room.
    loop {
        tokio::select! {
            _ = &mut send_task => break,
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<SignalMessage>(&text) {
                    Ok(signal) => state.registry.relay(&room, &signal, conn_id),
                    Err(e) => warn!(room = %room_id, conn = %conn_id, "dropping malformed signal: {e}"),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(room = %room_id, conn = %conn_id, "socket error: {e}");
                    break;
                }
            }
        }
    }

    send_task.abort();
    info!(room = %room_id, conn = %conn_id, "session ended");
}
