//! Reconnection policy tests against an unreachable endpoint.

use autonoma_ws::{CloseReason, ConnectionConfig, ConnectionManager, ConnectionState, WsEvent};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn unreachable() -> ConnectionConfig {
    ConnectionConfig {
        url: "ws://127.0.0.1:9".to_string(),
        connect_timeout_ms: 1_000,
        reconnect_base_delay_ms: 10,
        reconnect_max_delay_ms: 20,
        ..Default::default()
    }
}

/// Connection respects max reconnect attempts.
#[tokio::test]
async fn test_respects_max_reconnect_attempts() {
    let config = ConnectionConfig {
        max_reconnect_attempts: 2,
        ..unreachable()
    };
    let (tx, mut rx) = mpsc::channel(16);
    let manager = ConnectionManager::new(config, tx);

    let result = timeout(Duration::from_secs(10), manager.connect()).await;
    assert!(result.is_ok(), "Should stop after max reconnect attempts");
    assert!(result.unwrap().is_err());

    // Initial attempt plus two retries, each reported as a close.
    let mut closes = 0;
    while let Ok(event) = rx.try_recv() {
        assert!(matches!(event, WsEvent::Closed(_)));
        closes += 1;
    }
    assert_eq!(closes, 3);
}

/// With reconnection disabled the first failure is final.
#[tokio::test]
async fn test_reconnect_disabled_stays_closed() {
    let config = ConnectionConfig {
        reconnect_enabled: false,
        ..unreachable()
    };
    let (tx, mut rx) = mpsc::channel(16);
    let manager = ConnectionManager::new(config, tx);

    let result = timeout(Duration::from_secs(5), manager.connect()).await;
    assert!(result.unwrap().is_ok());
    assert_eq!(manager.state(), ConnectionState::Closed);

    match rx.recv().await {
        Some(WsEvent::Closed(reason)) => assert!(matches!(
            reason,
            CloseReason::Network { .. } | CloseReason::ConnectTimeout
        )),
        other => panic!("Expected a close event, got {other:?}"),
    }
    assert!(rx.try_recv().is_err());
}

/// Shutdown during backoff ends the loop without another attempt.
#[tokio::test]
async fn test_shutdown_during_backoff() {
    let config = ConnectionConfig {
        reconnect_base_delay_ms: 5_000,
        reconnect_max_delay_ms: 5_000,
        ..unreachable()
    };
    let (tx, mut rx) = mpsc::channel(16);
    let manager = std::sync::Arc::new(ConnectionManager::new(config, tx));

    let task = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.connect().await })
    };

    // First attempt fails quickly, then the loop waits in backoff.
    assert!(matches!(rx.recv().await, Some(WsEvent::Closed(_))));
    manager.shutdown();

    let result = timeout(Duration::from_secs(2), task).await;
    assert!(result.unwrap().unwrap().is_ok());
    assert_eq!(manager.state(), ConnectionState::Closed);
}
