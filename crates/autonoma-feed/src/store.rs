//! Derived stream state and fan-out.
//!
//! `StreamStore` is the single writer of the stream's derived state. Every
//! change publishes a new immutable `StreamView` through a `watch` channel;
//! subscribers read it without coordinating with each other or with the
//! connection.
//!
//! Once disposed, the store accepts no further updates. The disposed check
//! runs inside the channel's write section, so an update racing with
//! `dispose` is either published before it or discarded.

use crate::parser::StreamEvent;
use autonoma_core::{Alert, BoundedHistory, ChatMessage, TelemetrySnapshot};
use autonoma_ws::CloseReason;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// Immutable view of the stream state.
#[derive(Debug, Clone, Serialize)]
pub struct StreamView {
    pub latest_telemetry: Option<TelemetrySnapshot>,
    /// Rolling history, oldest first.
    pub telemetry_history: BoundedHistory<TelemetrySnapshot>,
    pub latest_alert: Option<Alert>,
    /// Chat side-channel, oldest first.
    pub chat_log: BoundedHistory<ChatMessage>,
    pub connected: bool,
    /// Reason of the most recent close, if any.
    pub last_close: Option<CloseReason>,
}

impl StreamView {
    fn new(history_capacity: usize, chat_log_capacity: usize) -> Self {
        Self {
            latest_telemetry: None,
            telemetry_history: BoundedHistory::new(history_capacity),
            latest_alert: None,
            chat_log: BoundedHistory::new(chat_log_capacity),
            connected: false,
            last_close: None,
        }
    }
}

/// Owner of the derived stream state.
#[derive(Debug)]
pub struct StreamStore {
    tx: watch::Sender<StreamView>,
    disposed: AtomicBool,
}

impl StreamStore {
    pub fn new(history_capacity: usize, chat_log_capacity: usize) -> Self {
        let (tx, _rx) = watch::channel(StreamView::new(history_capacity, chat_log_capacity));
        Self {
            tx,
            disposed: AtomicBool::new(false),
        }
    }

    /// New read-only subscriber.
    pub fn subscribe(&self) -> StreamSubscriber {
        StreamSubscriber {
            rx: self.tx.subscribe(),
        }
    }

    /// Copy of the current view.
    pub fn view(&self) -> StreamView {
        self.tx.borrow().clone()
    }

    /// Apply a validated stream event. Returns false once disposed.
    pub fn apply(&self, event: StreamEvent) -> bool {
        self.update(|view| {
            match event {
                StreamEvent::Telemetry(snapshot) => {
                    view.latest_telemetry = Some(snapshot.clone());
                    view.telemetry_history.push(snapshot);
                }
                StreamEvent::Alert(alert) => {
                    view.latest_alert = Some(alert);
                }
                StreamEvent::Chat(message) => {
                    view.chat_log.push(message);
                }
            }
            true
        })
    }

    /// Record that the connection opened.
    pub fn set_open(&self) -> bool {
        self.update(|view| {
            let changed = !view.connected;
            view.connected = true;
            changed
        })
    }

    /// Record that the connection closed.
    pub fn set_closed(&self, reason: CloseReason) -> bool {
        self.update(|view| {
            view.connected = false;
            view.last_close = Some(reason);
            true
        })
    }

    /// Publish the final disconnected state and stop accepting updates.
    ///
    /// Returns true only for the call that performed the dispose.
    pub fn dispose(&self) -> bool {
        let mut disposed_now = false;
        self.tx.send_if_modified(|view| {
            if self.disposed.swap(true, Ordering::AcqRel) {
                return false;
            }
            disposed_now = true;
            view.connected = false;
            view.last_close = Some(CloseReason::Shutdown);
            true
        });
        disposed_now
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn update(&self, f: impl FnOnce(&mut StreamView) -> bool) -> bool {
        self.tx.send_if_modified(|view| {
            if self.disposed.load(Ordering::Acquire) {
                return false;
            }
            f(view)
        })
    }
}

/// Read-only handle on the stream state.
#[derive(Debug, Clone)]
pub struct StreamSubscriber {
    rx: watch::Receiver<StreamView>,
}

impl StreamSubscriber {
    /// Wait for the next published change. Returns false once the store is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until the view satisfies `predicate`.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&StreamView) -> bool,
    ) -> Option<StreamView> {
        self.rx.wait_for(predicate).await.ok().map(|view| view.clone())
    }

    pub fn current(&self) -> StreamView {
        self.rx.borrow().clone()
    }

    pub fn latest_telemetry(&self) -> Option<TelemetrySnapshot> {
        self.rx.borrow().latest_telemetry.clone()
    }

    pub fn telemetry_history(&self) -> Vec<TelemetrySnapshot> {
        self.rx.borrow().telemetry_history.to_vec()
    }

    pub fn latest_alert(&self) -> Option<Alert> {
        self.rx.borrow().latest_alert.clone()
    }

    pub fn chat_log(&self) -> Vec<ChatMessage> {
        self.rx.borrow().chat_log.to_vec()
    }

    pub fn is_connected(&self) -> bool {
        self.rx.borrow().connected
    }
}
