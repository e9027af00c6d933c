//! Telemetry stream lifecycle integration tests.
//!
//! Tests the stream end to end against a mock backend:
//! - Connection establishment and status
//! - Envelope routing into history, alert and chat state
//! - Malformed and unknown envelopes
//! - Server close, reconnection and teardown

mod integration;
use integration::common::mock_ws::MockWsServer;

use autonoma_feed::{StreamConfig, StreamHandle, StreamSubscriber, StreamView, TelemetryStream};
use autonoma_ws::CloseReason;
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn config(server: &MockWsServer) -> StreamConfig {
    StreamConfig {
        reconnect_base_delay_ms: 50,
        reconnect_max_delay_ms: 200,
        ..StreamConfig::with_api_url(server.api_url())
    }
}

async fn wait_for(
    sub: &mut StreamSubscriber,
    predicate: impl FnMut(&StreamView) -> bool,
) -> StreamView {
    timeout(WAIT, sub.wait_for(predicate))
        .await
        .expect("condition not reached in time")
        .expect("stream store dropped")
}

async fn connected(config: StreamConfig) -> (StreamHandle, StreamSubscriber) {
    let handle = TelemetryStream::connect(config).unwrap();
    let mut sub = handle.subscribe();
    wait_for(&mut sub, |v| v.connected).await;
    (handle, sub)
}

async fn wait_for_connections(server: &MockWsServer, count: u32) {
    let reached = timeout(WAIT, async {
        while server.connection_count().await < count {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "Expected {count} connections");
}

fn temps(view: &StreamView) -> Vec<f64> {
    view.telemetry_history
        .iter()
        .map(|s| s.reading("temp").unwrap())
        .collect()
}

#[tokio::test]
async fn test_stream_connects_to_server() {
    let server = MockWsServer::start().await;
    let (handle, sub) = connected(config(&server)).await;

    assert!(sub.is_connected());
    assert!(handle.is_connected());
    wait_for_connections(&server, 1).await;
    assert!(handle.url().ends_with("/ws/telemetry"));

    handle.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_first_telemetry_event() {
    let server = MockWsServer::start().await;
    let (handle, mut sub) = connected(config(&server)).await;

    server.send_envelope("telemetry", json!({"temp": 61.2}));

    let view = wait_for(&mut sub, |v| v.latest_telemetry.is_some()).await;
    assert_eq!(view.latest_telemetry.unwrap().reading("temp"), Some(61.2));
    assert_eq!(view.telemetry_history.len(), 1);

    handle.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_history_keeps_last_fifty() {
    let server = MockWsServer::start().await;
    let (handle, mut sub) = connected(config(&server)).await;

    for t in 1..=51 {
        server.send_envelope("telemetry", json!({"temp": t as f64}));
    }

    let view = wait_for(&mut sub, |v| {
        v.latest_telemetry
            .as_ref()
            .and_then(|s| s.reading("temp"))
            == Some(51.0)
    })
    .await;

    assert_eq!(view.telemetry_history.len(), 50);
    assert_eq!(temps(&view), (2..=51).map(|t| t as f64).collect::<Vec<_>>());

    handle.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_malformed_and_unknown_messages_are_dropped() {
    let server = MockWsServer::start().await;
    let (handle, mut sub) = connected(config(&server)).await;

    server.send_text("this is not json");
    server.send_envelope("firmware", json!({"version": 2}));
    server.send_envelope("alert", json!("not an object"));
    server.send_envelope("telemetry", json!({"temp": 1.0}));

    let view = wait_for(&mut sub, |v| v.latest_telemetry.is_some()).await;
    assert!(view.connected);
    assert!(view.latest_alert.is_none());
    assert_eq!(view.telemetry_history.len(), 1);

    let stats = handle.parse_stats();
    assert_eq!(stats.malformed, 2);
    assert_eq!(stats.unknown, 1);
    assert_eq!(stats.telemetry, 1);

    handle.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_alert_and_chat_routing() {
    let server = MockWsServer::start().await;
    let (handle, mut sub) = connected(config(&server)).await;

    server.send_envelope(
        "alert",
        json!({"reason": "Battery temperature rising", "severity": "High", "rul": 120}),
    );
    server.send_envelope("chat", json!({"sender": "bot", "content": "Shall I book a slot?"}));
    server.send_envelope("chat", json!({"sender": "bot", "content": "Shall I book a slot?"}));

    let view = wait_for(&mut sub, |v| v.latest_alert.is_some() && v.chat_log.len() == 2).await;
    let alert = view.latest_alert.unwrap();
    assert_eq!(alert.description, "Battery temperature rising");
    assert_eq!(alert.severity, "High");
    assert_eq!(alert.field("rul"), Some(&json!(120)));
    assert!(view.latest_telemetry.is_none());

    handle.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_server_close_without_reconnect() {
    let server = MockWsServer::start().await;
    let config = StreamConfig {
        reconnect_enabled: false,
        ..config(&server)
    };
    let (handle, mut sub) = connected(config).await;

    server.send_envelope("telemetry", json!({"temp": 5.0}));
    wait_for(&mut sub, |v| v.latest_telemetry.is_some()).await;

    server.close_all(1000, "maintenance");
    let view = wait_for(&mut sub, |v| !v.connected).await;
    assert_eq!(
        view.last_close,
        Some(CloseReason::Server {
            code: 1000,
            reason: "maintenance".to_string()
        })
    );
    // State gathered before the close is kept.
    assert_eq!(view.telemetry_history.len(), 1);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!sub.is_connected());
    assert_eq!(server.connection_count().await, 1);

    handle.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let server = MockWsServer::start().await;
    let (handle, mut sub) = connected(config(&server)).await;

    server.close_all(1011, "restart");
    wait_for(&mut sub, |v| !v.connected).await;
    wait_for(&mut sub, |v| v.connected).await;
    wait_for_connections(&server, 2).await;

    server.send_envelope("telemetry", json!({"temp": 7.5}));
    let view = wait_for(&mut sub, |v| v.latest_telemetry.is_some()).await;
    assert_eq!(view.latest_telemetry.unwrap().reading("temp"), Some(7.5));

    handle.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_sends_close_and_freezes_state() {
    let server = MockWsServer::start().await;
    let (handle, sub) = connected(config(&server)).await;

    handle.shutdown().await;

    let closed = timeout(WAIT, async {
        loop {
            if server.close_frames().await > 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(closed.is_ok(), "Server should receive a Close frame");
    assert_eq!(server.close_frames().await, 1);

    let view = sub.current();
    assert!(!view.connected);
    assert_eq!(view.last_close, Some(CloseReason::Shutdown));

    // Messages pushed after teardown do not reach the state.
    server.send_envelope("telemetry", json!({"temp": 99.0}));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(sub.current().latest_telemetry.is_none());
    assert!(server.received_messages().await.is_empty());

    server.shutdown().await;
}

#[tokio::test]
async fn test_drop_tears_down_connection() {
    let server = MockWsServer::start().await;
    let (handle, sub) = connected(config(&server)).await;

    drop(handle);

    let view = sub.current();
    assert!(!view.connected);
    assert_eq!(view.last_close, Some(CloseReason::Shutdown));

    let closed = timeout(WAIT, async {
        while server.close_frames().await == 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(closed.is_ok(), "Dropping the handle should close the socket");

    server.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_server_stays_disconnected() {
    let config = StreamConfig {
        reconnect_enabled: false,
        connect_timeout_ms: 1_000,
        ..StreamConfig::with_api_url("http://127.0.0.1:9")
    };
    let handle = TelemetryStream::connect(config).unwrap();
    let mut sub = handle.subscribe();

    let view = wait_for(&mut sub, |v| v.last_close.is_some()).await;
    assert!(!view.connected);
    assert!(matches!(
        view.last_close,
        Some(CloseReason::Network { .. }) | Some(CloseReason::ConnectTimeout)
    ));

    handle.shutdown().await;
}
