//! Mock telemetry backend for integration tests.
//!
//! A WebSocket server that can:
//! - Accept connections on any path
//! - Push text frames and Close frames to every open connection
//! - Record frames received from clients

use futures_util::{SinkExt, StreamExt};
use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Command pushed to every open connection.
#[derive(Debug, Clone)]
enum ServerCommand {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Debug, Default)]
struct ServerState {
    connections: Mutex<u32>,
    received: Mutex<Vec<String>>,
    close_frames: Mutex<u32>,
}

/// A mock WebSocket server for testing.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    commands: broadcast::Sender<ServerCommand>,
    state: Arc<ServerState>,
}

impl MockWsServer {
    /// Start a new mock server on an available port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(ServerState::default());
        let (commands, _) = broadcast::channel::<ServerCommand>(256);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let state_clone = state.clone();
        let commands_clone = commands.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        // Subscribe before the handshake so nothing pushed
                        // after the client sees OPEN is missed.
                        let rx = commands_clone.subscribe();
                        tokio::spawn(handle_connection(stream, rx, state_clone.clone()));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            commands,
            state,
        }
    }

    /// HTTP base URL, as the REST API would be configured.
    pub fn api_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Push a text frame to every open connection.
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.commands.send(ServerCommand::Text(text.into()));
    }

    /// Push a telemetry envelope.
    pub fn send_envelope(&self, kind: &str, data: serde_json::Value) {
        self.send_text(serde_json::json!({"type": kind, "data": data}).to_string());
    }

    /// Close every open connection with `code`.
    pub fn close_all(&self, code: u16, reason: &str) {
        let _ = self.commands.send(ServerCommand::Close {
            code,
            reason: reason.to_string(),
        });
    }

    /// Number of completed handshakes.
    pub async fn connection_count(&self) -> u32 {
        *self.state.connections.lock().await
    }

    /// Close frames received from clients.
    pub async fn close_frames(&self) -> u32 {
        *self.state.close_frames.lock().await
    }

    /// Text frames received from clients.
    pub async fn received_messages(&self) -> Vec<String> {
        self.state.received.lock().await.clone()
    }

    /// Stop accepting connections.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    mut commands: broadcast::Receiver<ServerCommand>,
    state: Arc<ServerState>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    *state.connections.lock().await += 1;

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Ok(ServerCommand::Text(text)) => {
                    if write.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Ok(ServerCommand::Close { code, reason }) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: Cow::Owned(reason),
                    };
                    let _ = write.send(Message::Close(Some(frame))).await;
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    state.received.lock().await.push(text);
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) => {
                    *state.close_frames.lock().await += 1;
                    break;
                }
                Some(Err(_)) | None => break,
                _ => {}
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockWsServer::start().await;
        assert!(server.api_url().starts_with("http://127.0.0.1:"));
        server.shutdown().await;
    }
}
