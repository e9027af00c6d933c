//! Telemetry stream lifecycle.
//!
//! `TelemetryStream::connect` spawns two tasks: the connection task (owns the
//! socket) and the dispatch task (the only writer of the `StreamStore`). They
//! share one ordered event channel, so open, message and close events are
//! applied in the order they happened.
//!
//! Dropping or shutting down the `StreamHandle` disposes the store first and
//! then cancels the connection, which sends a single Close frame.

use crate::config::StreamConfig;
use crate::error::FeedResult;
use crate::parser::{EnvelopeParser, ParseStats, ParseStatsSnapshot};
use crate::store::{StreamStore, StreamSubscriber, StreamView};
use autonoma_ws::{ConnectionManager, ConnectionState, WsEvent};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Entry point for the live telemetry stream.
pub struct TelemetryStream;

impl TelemetryStream {
    /// Open the stream described by `config`.
    ///
    /// Must be called from within a Tokio runtime. The returned handle owns
    /// the connection; keep it alive for as long as the stream is needed.
    pub fn connect(config: StreamConfig) -> FeedResult<StreamHandle> {
        config.validate()?;
        let connection_config = config.connection_config()?;

        let (event_tx, event_rx) = mpsc::channel(config.event_buffer);
        let shutdown_token = CancellationToken::new();
        let manager = Arc::new(ConnectionManager::with_shutdown_token(
            connection_config,
            event_tx,
            shutdown_token.clone(),
        ));
        let store = Arc::new(StreamStore::new(
            config.history_capacity,
            config.chat_log_capacity,
        ));
        let stats = Arc::new(ParseStats::default());

        info!(url = %manager.config().url, "Opening telemetry stream");

        let connection_task = {
            let manager = manager.clone();
            tokio::spawn(async move {
                if let Err(e) = manager.connect().await {
                    error!(error = %e, "Telemetry stream connection stopped");
                }
            })
        };

        let dispatcher = Dispatcher::new(store.clone(), EnvelopeParser::with_stats(stats.clone()));
        let dispatch_task = tokio::spawn(dispatcher.run(event_rx, shutdown_token));

        Ok(StreamHandle {
            store,
            manager,
            stats,
            tasks: vec![connection_task, dispatch_task],
        })
    }
}

/// Owning handle on a running stream.
pub struct StreamHandle {
    store: Arc<StreamStore>,
    manager: Arc<ConnectionManager>,
    stats: Arc<ParseStats>,
    tasks: Vec<JoinHandle<()>>,
}

impl StreamHandle {
    /// New read-only subscriber to the derived state.
    pub fn subscribe(&self) -> StreamSubscriber {
        self.store.subscribe()
    }

    /// Copy of the current derived state.
    pub fn view(&self) -> StreamView {
        self.store.view()
    }

    pub fn is_connected(&self) -> bool {
        self.store.view().connected
    }

    /// Transport-level state (includes `Reconnecting`).
    pub fn connection_state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn url(&self) -> &str {
        &self.manager.config().url
    }

    pub fn parse_stats(&self) -> ParseStatsSnapshot {
        self.stats.snapshot()
    }

    /// Tear the stream down and wait for its tasks to finish.
    pub async fn shutdown(mut self) {
        self.begin_teardown();
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                warn!(error = %e, "Telemetry stream task failed during shutdown");
            }
        }
        debug!("Telemetry stream shut down");
    }

    fn begin_teardown(&self) {
        if self.store.dispose() {
            info!("Tearing down telemetry stream");
        }
        self.manager.shutdown();
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.begin_teardown();
    }
}

/// Applies connection events to the store.
pub(crate) struct Dispatcher {
    store: Arc<StreamStore>,
    parser: EnvelopeParser,
}

impl Dispatcher {
    pub(crate) fn new(store: Arc<StreamStore>, parser: EnvelopeParser) -> Self {
        Self { store, parser }
    }

    async fn run(self, mut events: mpsc::Receiver<WsEvent>, shutdown: CancellationToken) {
        loop {
            let event = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            self.dispatch(event);
        }
        debug!("Telemetry dispatch loop stopped");
    }

    pub(crate) fn dispatch(&self, event: WsEvent) {
        match event {
            WsEvent::Opened => {
                info!("Connected to telemetry stream");
                self.store.set_open();
            }
            WsEvent::Text(text) => match self.parser.parse(&text, Utc::now()) {
                Ok(Some(event)) => {
                    let kind = event.kind();
                    if !self.store.apply(event) {
                        debug!(kind = kind.as_str(), "Stream disposed, dropping event");
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "Dropping malformed stream message");
                }
            },
            WsEvent::Closed(reason) => {
                info!(%reason, "Disconnected from telemetry stream");
                self.store.set_closed(reason);
            }
        }
    }
}
