//! Envelope parsing for the live stream.
//!
//! Frames are `{"type": "...", "data": ...}`. Parsing is two-stage: decode the
//! frame into a loose [`RawEnvelope`], then coerce `data` into the typed
//! payload for its kind. Anything that fails either stage is malformed and
//! dropped by the caller; an unrecognized `type` is not an error.

use crate::error::{FeedError, FeedResult};
use autonoma_core::{Alert, ChatMessage, TelemetrySnapshot};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Loosely-typed envelope as received on the wire.
#[derive(Debug, Deserialize)]
pub struct RawEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// Recognized envelope kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    Telemetry,
    Alert,
    Chat,
}

impl EnvelopeKind {
    pub const ALL: [EnvelopeKind; 3] = [Self::Telemetry, Self::Alert, Self::Chat];

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "telemetry" => Some(Self::Telemetry),
            "alert" => Some(Self::Alert),
            "chat" => Some(Self::Chat),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Telemetry => "telemetry",
            Self::Alert => "alert",
            Self::Chat => "chat",
        }
    }
}

/// Validated stream event.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Telemetry(TelemetrySnapshot),
    Alert(Alert),
    Chat(ChatMessage),
}

impl StreamEvent {
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Self::Telemetry(_) => EnvelopeKind::Telemetry,
            Self::Alert(_) => EnvelopeKind::Alert,
            Self::Chat(_) => EnvelopeKind::Chat,
        }
    }
}

/// Parse counters.
#[derive(Debug, Default)]
pub struct ParseStats {
    telemetry: AtomicU64,
    alert: AtomicU64,
    chat: AtomicU64,
    malformed: AtomicU64,
    unknown: AtomicU64,
}

impl ParseStats {
    pub fn record_accepted(&self, kind: EnvelopeKind) {
        let counter = match kind {
            EnvelopeKind::Telemetry => &self.telemetry,
            EnvelopeKind::Alert => &self.alert,
            EnvelopeKind::Chat => &self.chat,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unknown(&self) {
        self.unknown.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ParseStatsSnapshot {
        ParseStatsSnapshot {
            telemetry: self.telemetry.load(Ordering::Relaxed),
            alert: self.alert.load(Ordering::Relaxed),
            chat: self.chat.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            unknown: self.unknown.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ParseStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStatsSnapshot {
    pub telemetry: u64,
    pub alert: u64,
    pub chat: u64,
    pub malformed: u64,
    pub unknown: u64,
}

impl ParseStatsSnapshot {
    /// Envelopes that produced a stream event.
    pub fn accepted(&self) -> u64 {
        self.telemetry + self.alert + self.chat
    }

    pub fn count(&self, kind: EnvelopeKind) -> u64 {
        match kind {
            EnvelopeKind::Telemetry => self.telemetry,
            EnvelopeKind::Alert => self.alert,
            EnvelopeKind::Chat => self.chat,
        }
    }
}

/// Stream envelope parser.
#[derive(Debug, Default)]
pub struct EnvelopeParser {
    stats: Arc<ParseStats>,
}

impl EnvelopeParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser that records into shared counters.
    pub fn with_stats(stats: Arc<ParseStats>) -> Self {
        Self { stats }
    }

    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Parse one text frame received at `received_at`.
    ///
    /// Returns `Ok(None)` for an unrecognized kind.
    pub fn parse(&self, text: &str, received_at: DateTime<Utc>) -> FeedResult<Option<StreamEvent>> {
        let raw: RawEnvelope = serde_json::from_str(text).map_err(|e| {
            self.stats.record_malformed();
            FeedError::MalformedEnvelope(e.to_string())
        })?;

        let Some(kind) = EnvelopeKind::from_tag(&raw.kind) else {
            self.stats.record_unknown();
            debug!(kind = %raw.kind, "Ignoring envelope of unknown kind");
            return Ok(None);
        };

        let event = match kind {
            EnvelopeKind::Telemetry => {
                TelemetrySnapshot::from_payload(raw.data, received_at).map(StreamEvent::Telemetry)
            }
            EnvelopeKind::Alert => Alert::from_payload(raw.data).map(StreamEvent::Alert),
            EnvelopeKind::Chat => {
                ChatMessage::from_payload(raw.data, received_at).map(StreamEvent::Chat)
            }
        }
        .map_err(|e| {
            self.stats.record_malformed();
            FeedError::from(e)
        })?;

        self.stats.record_accepted(kind);
        Ok(Some(event))
    }
}
