//! Events forwarded from the connection task to the stream consumer.

use crate::error::WsError;
use serde::{Deserialize, Serialize};

/// Connection event, delivered in the order it happened on the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsEvent {
    /// Handshake completed; the connection is OPEN.
    Opened,
    /// A text frame was received.
    Text(String),
    /// The connection attempt ended (or never opened).
    Closed(CloseReason),
}

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CloseReason {
    /// The server sent a Close frame.
    Server { code: u16, reason: String },
    /// Transport failure (handshake, read, or write error).
    Network { message: String },
    /// The stream ended without a Close frame.
    StreamEnded,
    /// Connection establishment exceeded the configured timeout.
    ConnectTimeout,
    /// No pong arrived within the heartbeat timeout.
    HeartbeatTimeout,
    /// The owning client shut the connection down.
    Shutdown,
}

impl CloseReason {
    /// Short label, suitable for metric labels.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Server { .. } => "server",
            Self::Network { .. } => "network",
            Self::StreamEnded => "stream_ended",
            Self::ConnectTimeout => "connect_timeout",
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::Shutdown => "shutdown",
        }
    }

    /// Whether the client itself initiated the close.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown)
    }
}

impl From<&WsError> for CloseReason {
    fn from(err: &WsError) -> Self {
        match err {
            WsError::ConnectTimeout(_) => Self::ConnectTimeout,
            WsError::HeartbeatTimeout => Self::HeartbeatTimeout,
            other => Self::Network {
                message: other.to_string(),
            },
        }
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Server { code, reason } => write!(f, "closed by server ({code}: {reason})"),
            Self::Network { message } => write!(f, "network failure: {message}"),
            Self::StreamEnded => write!(f, "stream ended"),
            Self::ConnectTimeout => write!(f, "connect timeout"),
            Self::HeartbeatTimeout => write!(f, "heartbeat timeout"),
            Self::Shutdown => write!(f, "client shutdown"),
        }
    }
}
