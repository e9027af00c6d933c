//! Periodic vehicle-status refresh.
//!
//! Polls once immediately, then every interval, and publishes the latest
//! successful result through a `watch` channel. Failed polls keep the
//! previous value.

use crate::client::ApiClient;
use crate::error::ApiResult;
use crate::types::VehicleStatus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Poll outcome counters.
#[derive(Debug, Default)]
pub struct PollStats {
    ok: AtomicU64,
    failed: AtomicU64,
}

impl PollStats {
    pub fn snapshot(&self) -> PollStatsSnapshot {
        PollStatsSnapshot {
            ok: self.ok.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStatsSnapshot {
    pub ok: u64,
    pub failed: u64,
}

/// Vehicle status poller.
pub struct StatusPoller {
    client: Arc<ApiClient>,
    interval: Duration,
    tx: watch::Sender<Option<VehicleStatus>>,
    stats: Arc<PollStats>,
}

impl StatusPoller {
    pub fn new(client: Arc<ApiClient>, interval: Duration) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            client,
            interval,
            tx,
            stats: Arc::new(PollStats::default()),
        }
    }

    /// Latest successfully polled status (`None` until the first success).
    pub fn subscribe(&self) -> watch::Receiver<Option<VehicleStatus>> {
        self.tx.subscribe()
    }

    pub fn stats(&self) -> Arc<PollStats> {
        self.stats.clone()
    }

    /// Poll once and publish the result on success.
    pub async fn poll_once(&self) -> ApiResult<VehicleStatus> {
        match self.client.vehicle_status().await {
            Ok(status) => {
                self.stats.ok.fetch_add(1, Ordering::Relaxed);
                self.tx.send_replace(Some(status.clone()));
                Ok(status)
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Poll until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(interval_ms = self.interval.as_millis() as u64, "Starting status poller");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(status) => debug!(
                            vin = status.vin().unwrap_or("-"),
                            anomaly = status.anomaly.is_some(),
                            "Vehicle status refreshed"
                        ),
                        Err(e) => warn!(error = %e, "Vehicle status poll failed"),
                    }
                }
            }
        }

        debug!("Status poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::error::ApiError;

    fn poller() -> StatusPoller {
        let client = ApiClient::new(&ApiConfig::with_base_url("http://127.0.0.1:9")).unwrap();
        StatusPoller::new(Arc::new(client), Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_previous_value() {
        let poller = poller();
        let rx = poller.subscribe();

        assert!(matches!(poller.poll_once().await, Err(ApiError::MissingToken)));
        assert!(rx.borrow().is_none());
        assert_eq!(poller.stats().snapshot(), PollStatsSnapshot { ok: 0, failed: 1 });
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let poller = poller();
        let stats = poller.stats();
        let token = CancellationToken::new();
        let task = tokio::spawn(poller.run(token.clone()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        task.await.unwrap();

        assert!(stats.snapshot().failed >= 1);
    }
}
