//! Prometheus metrics for Autonoma.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error and only surfaces
//! during static initialization.

use crate::error::{ObservabilityError, ObservabilityResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_gauge, register_gauge_vec, register_int_counter_vec, register_int_gauge, Encoder,
    Gauge, GaugeVec, IntCounterVec, IntGauge, TextEncoder,
};

/// Stream connection state (1 = connected, 0 = disconnected).
pub static STREAM_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "autonoma_stream_connected",
        "Telemetry stream connection state (1=connected)"
    )
    .unwrap()
});

/// Transport state machine current state.
/// Labels: state (connecting/open/reconnecting/closed)
pub static STREAM_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "autonoma_stream_state",
        "Telemetry stream transport state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Envelopes applied to the stream state.
/// Labels: kind (telemetry/alert/chat)
pub static ENVELOPES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "autonoma_envelopes_total",
        "Stream envelopes applied",
        &["kind"]
    )
    .unwrap()
});

/// Envelopes discarded.
/// Labels: reason (malformed/unknown)
pub static ENVELOPES_DROPPED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "autonoma_envelopes_dropped_total",
        "Stream envelopes discarded",
        &["reason"]
    )
    .unwrap()
});

/// Connection drops followed by a reconnect attempt.
pub static RECONNECT_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "autonoma_reconnect_total",
        "Telemetry stream reconnections",
        &["reason"]
    )
    .unwrap()
});

pub static HISTORY_LEN: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "autonoma_history_len",
        "Snapshots held in the rolling telemetry history"
    )
    .unwrap()
});

pub static CHAT_LOG_LEN: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("autonoma_chat_log_len", "Messages held in the chat log").unwrap()
});

/// 1 while an alert is present.
pub static ALERT_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("autonoma_alert_active", "Latest alert present (1=yes)").unwrap()
});

/// Vehicle status polls.
/// Labels: result (ok/error)
pub static STATUS_POLL_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "autonoma_status_poll_total",
        "Vehicle status polls",
        &["result"]
    )
    .unwrap()
});

const STREAM_STATES: [&str; 4] = ["connecting", "open", "reconnecting", "closed"];

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    /// Record the transport state; "open" also sets the connected gauge.
    pub fn stream_state_set(state: &str) {
        for s in STREAM_STATES {
            STREAM_STATE
                .with_label_values(&[s])
                .set(if s == state { 1.0 } else { 0.0 });
        }
        STREAM_CONNECTED.set(if state == "open" { 1.0 } else { 0.0 });
    }

    /// Raise the applied-envelope counter for `kind` to a cumulative `total`.
    pub fn envelopes_observed(kind: &str, total: u64) {
        raise_to(&ENVELOPES_TOTAL, kind, total);
    }

    /// Raise the dropped-envelope counter for `reason` to a cumulative `total`.
    pub fn envelopes_dropped(reason: &str, total: u64) {
        raise_to(&ENVELOPES_DROPPED_TOTAL, reason, total);
    }

    pub fn stream_reconnect(reason: &str) {
        RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn history_len(len: usize) {
        HISTORY_LEN.set(len as i64);
    }

    pub fn chat_log_len(len: usize) {
        CHAT_LOG_LEN.set(len as i64);
    }

    pub fn alert_active(active: bool) {
        ALERT_ACTIVE.set(i64::from(active));
    }

    /// Raise the poll counter for `result` to a cumulative `total`.
    pub fn status_polls(result: &str, total: u64) {
        raise_to(&STATUS_POLL_TOTAL, result, total);
    }

    /// Render the default registry in the Prometheus text format.
    pub fn render() -> ObservabilityResult<String> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder
            .encode(&prometheus::gather(), &mut buf)
            .map_err(|e| ObservabilityError::Metrics(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| ObservabilityError::Metrics(e.to_string()))
    }
}

/// Counters only move forward; a lower total (e.g. after a restart of the
/// source) is ignored.
fn raise_to(counter: &IntCounterVec, label: &str, total: u64) {
    let counter = counter.with_label_values(&[label]);
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}
