//! Connect timeout and heartbeat failure against misbehaving servers.

use autonoma_ws::{CloseReason, ConnectionConfig, ConnectionManager, ConnectionState, WsEvent};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

fn config(url: String) -> ConnectionConfig {
    ConnectionConfig {
        url,
        reconnect_enabled: false,
        ..Default::default()
    }
}

/// Server completes the handshake, then never reads, so pings go unanswered.
async fn silent_server() -> (String, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let _ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let _ = stop_rx.await;
    });

    (format!("ws://{addr}/ws/telemetry"), stop_tx)
}

/// Listener accepts TCP connections but never answers the upgrade request.
async fn stalled_server() -> (String, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        let _ = stop_rx.await;
    });

    (format!("ws://{addr}/ws/telemetry"), stop_tx)
}

#[tokio::test]
async fn test_missing_pong_fails_connection() {
    let (url, _stop) = silent_server().await;
    let config = ConnectionConfig {
        heartbeat_interval_ms: 100,
        heartbeat_timeout_ms: 200,
        ..config(url)
    };
    let (tx, mut rx) = mpsc::channel(16);
    let manager = ConnectionManager::new(config, tx);

    let result = timeout(Duration::from_secs(5), manager.connect()).await;
    assert!(result.unwrap().is_ok());
    assert_eq!(manager.state(), ConnectionState::Closed);

    assert!(matches!(rx.recv().await, Some(WsEvent::Opened)));
    match rx.recv().await {
        Some(WsEvent::Closed(reason)) => assert_eq!(reason, CloseReason::HeartbeatTimeout),
        other => panic!("Expected heartbeat timeout, got {other:?}"),
    }
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_stalled_handshake_times_out() {
    let (url, _stop) = stalled_server().await;
    let config = ConnectionConfig {
        connect_timeout_ms: 200,
        ..config(url)
    };
    let (tx, mut rx) = mpsc::channel(16);
    let manager = ConnectionManager::new(config, tx);

    let result = timeout(Duration::from_secs(5), manager.connect()).await;
    assert!(result.unwrap().is_ok());
    assert_eq!(manager.state(), ConnectionState::Closed);

    match rx.recv().await {
        Some(WsEvent::Closed(reason)) => assert_eq!(reason, CloseReason::ConnectTimeout),
        other => panic!("Expected connect timeout, got {other:?}"),
    }
    assert!(rx.try_recv().is_err());
}
