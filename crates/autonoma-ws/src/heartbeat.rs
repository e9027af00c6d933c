//! Heartbeat monitoring for the stream connection.
//!
//! The backend pushes frames every couple of seconds, so a ping is only sent
//! after the socket has been idle for a full interval. A ping that gets no
//! pong within the timeout marks the connection as dead.

use parking_lot::RwLock;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug)]
struct HeartbeatInner {
    last_ping: Option<Instant>,
    last_activity: Instant,
    waiting_for_pong: bool,
}

/// Tracks ping/pong timing and socket activity.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    /// Idle time before a ping is sent (0 disables heartbeats).
    interval_ms: u64,
    /// How long to wait for the pong.
    timeout_ms: u64,
    inner: RwLock<HeartbeatInner>,
}

impl HeartbeatMonitor {
    pub fn new(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval_ms,
            timeout_ms,
            inner: RwLock::new(HeartbeatInner {
                last_ping: None,
                last_activity: Instant::now(),
                waiting_for_pong: false,
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.interval_ms > 0
    }

    /// Reset state on a fresh connection.
    pub fn reset(&self) {
        let mut inner = self.inner.write();
        inner.last_ping = None;
        inner.last_activity = Instant::now();
        inner.waiting_for_pong = false;
    }

    pub fn record_ping(&self) {
        let mut inner = self.inner.write();
        inner.last_ping = Some(Instant::now());
        inner.waiting_for_pong = true;
    }

    /// Record a pong. Any pong clears the pending ping.
    pub fn record_pong(&self) {
        let mut inner = self.inner.write();
        if let Some(ping_at) = inner.last_ping {
            debug!(rtt_ms = ping_at.elapsed().as_millis() as u64, "Received pong");
        }
        inner.waiting_for_pong = false;
        inner.last_activity = Instant::now();
    }

    /// Record any inbound frame.
    pub fn record_activity(&self) {
        self.inner.write().last_activity = Instant::now();
    }

    pub fn is_timed_out(&self) -> bool {
        let inner = self.inner.read();
        match (inner.waiting_for_pong, inner.last_ping) {
            (true, Some(ping_at)) => ping_at.elapsed() > Duration::from_millis(self.timeout_ms),
            _ => false,
        }
    }

    pub fn should_send_ping(&self) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let inner = self.inner.read();
        !inner.waiting_for_pong
            && inner.last_activity.elapsed() >= Duration::from_millis(self.interval_ms)
    }

    /// Wait until the next heartbeat check. Never resolves when disabled.
    pub async fn wait_for_check(&self) {
        if !self.is_enabled() {
            std::future::pending::<()>().await;
        }
        let period = (self.interval_ms / 2).min(self.timeout_ms.max(1)).max(1);
        tokio::time::sleep(Duration::from_millis(period)).await;
    }
}
