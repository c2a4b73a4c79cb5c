use std::net::SocketAddr;
use std::time::Duration;

use duo_signal::{AppState, RoomId, SignalConfig, SignalMessage, router};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Timeout for a single expected frame (ms).
pub const FRAME_TIMEOUT_MS: u64 = 2000;

/// Timeout for server-side state to settle (ms).
pub const SETTLE_TIMEOUT_MS: u64 = 2000;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Serves the relay on an ephemeral local port.
pub async fn spawn_server() -> (SocketAddr, AppState) {
    let state = AppState::new(SignalConfig::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local address");

    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });

    (addr, state)
}

pub async fn connect(addr: SocketAddr, room_id: &RoomId) -> WsClient {
    let url = format!("ws://{addr}/ws/{room_id}");
    let (client, _) = connect_async(url).await.expect("Failed to connect");
    client
}

pub async fn send_signal(client: &mut WsClient, msg: &SignalMessage) {
    let json = serde_json::to_string(msg).expect("Failed to encode signal");
    client
        .send(Message::text(json))
        .await
        .expect("Failed to send signal");
}

/// Next non-ping frame, or `None` if nothing arrives in time.
pub async fn next_frame(client: &mut WsClient, timeout_ms: u64) -> Option<Message> {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        let frame = tokio::time::timeout_at(deadline, client.next()).await.ok()??;
        match frame {
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(msg) => return Some(msg),
            Err(_) => return None,
        }
    }
}

pub async fn next_signal(client: &mut WsClient) -> Option<SignalMessage> {
    match next_frame(client, FRAME_TIMEOUT_MS).await? {
        Message::Text(text) => serde_json::from_str(text.as_str()).ok(),
        _ => None,
    }
}

/// Close code of the next frame, if it is a close frame.
pub async fn close_code(client: &mut WsClient) -> Option<u16> {
    match next_frame(client, FRAME_TIMEOUT_MS).await? {
        Message::Close(Some(frame)) => Some(u16::from(frame.code)),
        _ => None,
    }
}

/// Polls `check` until it holds or the settle timeout passes.
pub async fn wait_until<F>(mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    while start.elapsed() < Duration::from_millis(SETTLE_TIMEOUT_MS) {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
