//! WebSocket connection manager.
//!
//! Owns the single stream connection: handshake with timeout, message loop,
//! heartbeat, and (when enabled) reconnection with exponential backoff.
//! Every socket event is forwarded in arrival order as a [`WsEvent`].

use crate::error::{WsError, WsResult};
use crate::event::{CloseReason, WsEvent};
use crate::heartbeat::HeartbeatMonitor;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL.
    pub url: String,
    /// Handshake timeout.
    pub connect_timeout_ms: u64,
    /// Reconnect after the connection drops. When false, a dropped connection
    /// stays closed until a new manager is created.
    pub reconnect_enabled: bool,
    /// Maximum reconnection attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    pub reconnect_max_delay_ms: u64,
    /// Idle time before a ping is sent (0 disables heartbeats).
    pub heartbeat_interval_ms: u64,
    /// Pong must arrive within this.
    pub heartbeat_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            connect_timeout_ms: 10_000,
            reconnect_enabled: true,
            max_reconnect_attempts: 0, // Infinite
            reconnect_base_delay_ms: 1_000,
            reconnect_max_delay_ms: 30_000,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 10_000,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Reconnecting,
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        }
    }
}

/// WebSocket connection manager.
pub struct ConnectionManager {
    config: ConnectionConfig,
    state: RwLock<ConnectionState>,
    heartbeat: HeartbeatMonitor,
    event_tx: mpsc::Sender<WsEvent>,
    reconnect_count: RwLock<u32>,
    /// Cancellation token for graceful shutdown.
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    /// Create a new connection manager forwarding events to `event_tx`.
    pub fn new(config: ConnectionConfig, event_tx: mpsc::Sender<WsEvent>) -> Self {
        Self::with_shutdown_token(config, event_tx, CancellationToken::new())
    }

    /// Create a connection manager that stops when `shutdown_token` is cancelled.
    pub fn with_shutdown_token(
        config: ConnectionConfig,
        event_tx: mpsc::Sender<WsEvent>,
        shutdown_token: CancellationToken,
    ) -> Self {
        let heartbeat =
            HeartbeatMonitor::new(config.heartbeat_interval_ms, config.heartbeat_timeout_ms);
        Self {
            config,
            state: RwLock::new(ConnectionState::Closed),
            heartbeat,
            event_tx,
            reconnect_count: RwLock::new(0),
            shutdown_token,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Consecutive reconnect attempts since the last successful open.
    pub fn reconnect_count(&self) -> u32 {
        *self.reconnect_count.read()
    }

    /// Signal graceful shutdown.
    ///
    /// An open connection sends a single Close frame and the reconnect loop
    /// exits without another attempt.
    pub fn shutdown(&self) {
        if !self.shutdown_token.is_cancelled() {
            info!("ConnectionManager shutdown requested");
        }
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect and run the message loop until shutdown, or until the
    /// connection drops with reconnection disabled.
    ///
    /// Returns an error only when a finite `max_reconnect_attempts` is exhausted.
    pub async fn connect(&self) -> WsResult<()> {
        loop {
            if self.is_shutdown() {
                info!("Shutdown requested, exiting connect loop");
                self.set_state(ConnectionState::Closed);
                return Ok(());
            }

            self.set_state(ConnectionState::Connecting);

            let reason = match self.try_connect().await {
                Ok(reason) => reason,
                Err(e) => {
                    error!(error = %e, "WebSocket connection error");
                    CloseReason::from(&e)
                }
            };

            self.set_state(ConnectionState::Closed);
            info!(%reason, "WebSocket connection closed");
            self.emit(WsEvent::Closed(reason.clone())).await;

            if self.is_shutdown() || reason.is_shutdown() {
                info!("Shutdown requested after disconnect, not reconnecting");
                return Ok(());
            }

            if !self.config.reconnect_enabled {
                info!("Reconnect disabled, staying disconnected");
                return Ok(());
            }

            let attempt = {
                let mut count = self.reconnect_count.write();
                *count += 1;
                *count
            };

            if self.config.max_reconnect_attempts > 0
                && attempt > self.config.max_reconnect_attempts
            {
                error!(attempt, "Max reconnection attempts reached");
                return Err(WsError::ConnectionFailed(
                    "Max reconnection attempts reached".to_string(),
                ));
            }

            self.set_state(ConnectionState::Reconnecting);

            let delay = self.calculate_backoff_delay(attempt);
            warn!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during backoff, exiting");
                    self.set_state(ConnectionState::Closed);
                    return Ok(());
                }
            }
        }
    }

    /// Run one connection from handshake to close.
    ///
    /// `Ok` carries orderly endings (server close, stream end, shutdown);
    /// transport failures are returned as errors.
    async fn try_connect(&self) -> WsResult<CloseReason> {
        info!(url = %self.config.url, "Connecting to WebSocket");

        let timeout = Duration::from_millis(self.config.connect_timeout_ms);
        let handshake = connect_async_tls_with_config(&self.config.url, None, true, None);

        let (ws_stream, _response) = tokio::select! {
            () = self.shutdown_token.cancelled() => {
                info!("Shutdown requested while connecting");
                return Ok(CloseReason::Shutdown);
            }
            result = tokio::time::timeout(timeout, handshake) => match result {
                Ok(connected) => connected?,
                Err(_) => return Err(WsError::ConnectTimeout(self.config.connect_timeout_ms)),
            },
        };
        let (mut write, mut read) = ws_stream.split();

        self.set_state(ConnectionState::Open);
        *self.reconnect_count.write() = 0;
        self.heartbeat.reset();
        info!("WebSocket connected");
        self.emit(WsEvent::Opened).await;

        loop {
            tokio::select! {
                biased;

                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in message loop");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(error = %e, "Failed to send Close frame during shutdown");
                    }
                    return Ok(CloseReason::Shutdown);
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.heartbeat.record_activity();
                            self.emit(WsEvent::Text(text)).await;
                        }
                        Some(Ok(Message::Binary(data))) => {
                            self.heartbeat.record_activity();
                            debug!(len = data.len(), "Ignoring binary frame");
                        }
                        Some(Ok(Message::Ping(data))) => {
                            self.heartbeat.record_activity();
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            self.heartbeat.record_pong();
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1005, String::new()));
                            warn!(code, %reason, "WebSocket closed by server");
                            return Ok(CloseReason::Server { code, reason });
                        }
                        Some(Ok(Message::Frame(_))) => {}
                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("WebSocket stream ended");
                            return Ok(CloseReason::StreamEnded);
                        }
                    }
                }

                () = self.heartbeat.wait_for_check() => {
                    if self.heartbeat.is_timed_out() {
                        error!("Heartbeat timeout");
                        return Err(WsError::HeartbeatTimeout);
                    }

                    if self.heartbeat.should_send_ping() {
                        write.send(Message::Ping(Vec::new())).await?;
                        self.heartbeat.record_ping();
                        debug!("Sent heartbeat ping");
                    }
                }
            }
        }
    }

    /// Forward an event downstream. A dropped receiver means nobody consumes
    /// the stream any more, so the connection is shut down.
    async fn emit(&self, event: WsEvent) {
        if self.event_tx.send(event).await.is_err() {
            if self.is_shutdown() {
                debug!("Event receiver dropped during shutdown");
            } else {
                warn!("Event receiver dropped, shutting down connection");
                self.shutdown_token.cancel();
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }

    fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.reconnect_base_delay_ms;
        let max = self.config.reconnect_max_delay_ms;

        // base * 2^(attempt-1), capped
        let exponent = attempt.saturating_sub(1).min(10);
        let delay = base.saturating_mul(1u64 << exponent).min(max);

        Duration::from_millis(delay + jitter_ms())
    }
}

/// Random jitter in [0, 1000) ms.
fn jitter_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as u64
}
