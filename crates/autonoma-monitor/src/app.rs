//! Main application orchestration.
//!
//! Coordinates:
//! - The live telemetry stream and its subscriber loop
//! - Optional vehicle status polling
//! - Periodic summaries and metrics export

use crate::config::AppConfig;
use crate::error::AppResult;
use autonoma_api::{ApiClient, PollStats, StatusPoller, VehicleStatus};
use autonoma_core::{Alert, ChatMessage};
use autonoma_feed::{EnvelopeKind, StreamHandle, StreamView, TelemetryStream};
use autonoma_observability::{serve_metrics, Metrics};
use autonoma_ws::CloseReason;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Something worth reporting that changed between two views.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Connected,
    Disconnected(CloseReason),
    Alert(Alert),
    AlertCleared,
    Chat(ChatMessage),
}

/// Diffs successive stream views into observations.
#[derive(Debug, Default)]
pub struct StreamObserver {
    connected: bool,
    alert: Option<Alert>,
    /// Id of the newest chat message already reported.
    last_chat: Option<Uuid>,
}

impl StreamObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observations for `view` relative to the previously observed one.
    pub fn observe(&mut self, view: &StreamView) -> Vec<Observation> {
        let mut out = Vec::new();

        if view.connected != self.connected {
            self.connected = view.connected;
            if view.connected {
                out.push(Observation::Connected);
            } else {
                let reason = view.last_close.clone().unwrap_or(CloseReason::StreamEnded);
                out.push(Observation::Disconnected(reason));
            }
        }

        if view.latest_alert != self.alert {
            self.alert = view.latest_alert.clone();
            out.push(match &view.latest_alert {
                Some(alert) => Observation::Alert(alert.clone()),
                None => Observation::AlertCleared,
            });
        }

        out.extend(self.unseen_chat(view).into_iter().map(Observation::Chat));

        out
    }

    /// Chat messages after the last reported one. If that one was evicted,
    /// the whole log is new.
    fn unseen_chat(&mut self, view: &StreamView) -> Vec<ChatMessage> {
        let log = &view.chat_log;
        let start = self
            .last_chat
            .and_then(|id| log.iter().rposition(|m| m.id == id))
            .map(|i| i + 1)
            .unwrap_or(0);
        if let Some(last) = log.latest() {
            self.last_chat = Some(last.id);
        }
        log.iter().skip(start).cloned().collect()
    }
}

/// Main application.
pub struct Application {
    config: AppConfig,
    shutdown: CancellationToken,
}

impl Application {
    /// Create a new application.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            shutdown: CancellationToken::new(),
        })
    }

    /// Token that stops `run` when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run until Ctrl-C or the shutdown token is cancelled.
    pub async fn run(self) -> AppResult<()> {
        let stream = TelemetryStream::connect(self.config.stream.clone())?;
        info!(url = stream.url(), "Telemetry stream started");

        let mut tasks: Vec<JoinHandle<()>> = Vec::new();

        if self.config.monitor.metrics_port != 0 {
            let port = self.config.monitor.metrics_port;
            let token = self.shutdown.child_token();
            tasks.push(tokio::spawn(async move {
                if let Err(e) = serve_metrics(port, token).await {
                    error!(error = %e, "Metrics server stopped");
                }
            }));
        }

        let poll_stats = self.start_status_poller(&mut tasks)?;

        let mut subscriber = stream.subscribe();
        let mut observer = StreamObserver::new();
        let reconnect_enabled = self.config.stream.reconnect_enabled;
        for observation in observer.observe(&subscriber.current()) {
            report(&observation, reconnect_enabled);
        }

        let mut summary =
            tokio::time::interval(Duration::from_millis(self.config.monitor.summary_interval_ms));

        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl-C, shutting down");
                    break;
                }

                changed = subscriber.changed() => {
                    if !changed {
                        warn!("Stream store closed");
                        break;
                    }
                    for observation in observer.observe(&subscriber.current()) {
                        report(&observation, reconnect_enabled);
                    }
                }

                _ = summary.tick() => {
                    record_summary(&stream, poll_stats.as_deref());
                }
            }
        }

        self.shutdown.cancel();
        stream.shutdown().await;
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task failed during shutdown");
            }
        }

        info!("Monitor stopped");
        Ok(())
    }

    fn start_status_poller(
        &self,
        tasks: &mut Vec<JoinHandle<()>>,
    ) -> AppResult<Option<Arc<PollStats>>> {
        if !self.config.monitor.poll_status {
            return Ok(None);
        }
        if self.config.api.token.is_none() {
            warn!("Status polling enabled but no access token configured, skipping");
            return Ok(None);
        }

        let client = Arc::new(ApiClient::new(&self.config.api)?);
        let poller = StatusPoller::new(
            client,
            Duration::from_millis(self.config.api.status_poll_interval_ms),
        );
        let stats = poller.stats();
        let rx = poller.subscribe();

        tasks.push(tokio::spawn(poller.run(self.shutdown.child_token())));
        tasks.push(tokio::spawn(watch_status(rx, self.shutdown.child_token())));

        Ok(Some(stats))
    }
}

/// Log vehicle status changes published by the poller.
async fn watch_status(
    mut rx: watch::Receiver<Option<VehicleStatus>>,
    shutdown: CancellationToken,
) {
    let mut last_alert: Option<String> = None;
    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let alert = rx
                    .borrow_and_update()
                    .as_ref()
                    .and_then(VehicleStatus::alert_message);
                if alert != last_alert {
                    match &alert {
                        Some(message) => warn!(%message, "Vehicle status alert"),
                        None => info!("Vehicle status clear"),
                    }
                    last_alert = alert;
                }
            }
        }
    }
}

/// Log an observation and update the gauges it affects.
///
/// Only drops that will be retried count as reconnects.
fn report(observation: &Observation, reconnect_enabled: bool) {
    match observation {
        Observation::Connected => {
            info!("Stream connected");
            Metrics::stream_state_set("open");
        }
        Observation::Disconnected(reason) => {
            warn!(%reason, "Stream disconnected");
            Metrics::stream_state_set("closed");
            if reconnect_enabled && !reason.is_shutdown() {
                Metrics::stream_reconnect(reason.label());
            }
        }
        Observation::Alert(alert) => {
            warn!(
                description = %alert.description,
                severity = %alert.severity,
                "Vehicle alert"
            );
        }
        Observation::AlertCleared => info!("Alert cleared"),
        Observation::Chat(message) => {
            info!(
                sender = message.sender().unwrap_or("system"),
                content = message.content().unwrap_or(""),
                "Chat message"
            );
        }
    }
}

fn record_summary(stream: &StreamHandle, poll_stats: Option<&PollStats>) {
    let view = stream.view();
    let state = stream.connection_state();
    let stats = stream.parse_stats();

    Metrics::stream_state_set(state.as_str());
    for kind in EnvelopeKind::ALL {
        Metrics::envelopes_observed(kind.as_str(), stats.count(kind));
    }
    Metrics::envelopes_dropped("malformed", stats.malformed);
    Metrics::envelopes_dropped("unknown", stats.unknown);
    Metrics::history_len(view.telemetry_history.len());
    Metrics::chat_log_len(view.chat_log.len());
    Metrics::alert_active(view.latest_alert.is_some());

    if let Some(poll) = poll_stats {
        let poll = poll.snapshot();
        Metrics::status_polls("ok", poll.ok);
        Metrics::status_polls("error", poll.failed);
    }

    info!(
        state = state.as_str(),
        history = view.telemetry_history.len(),
        chat = view.chat_log.len(),
        alert = view.latest_alert.is_some(),
        accepted = stats.accepted(),
        malformed = stats.malformed,
        unknown = stats.unknown,
        "Stream summary"
    );
    if let Some(latest) = &view.latest_telemetry {
        debug!(readings = ?latest.readings, at = %latest.timestamp, "Latest telemetry");
    }
}
