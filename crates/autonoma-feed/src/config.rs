//! Stream configuration.

use crate::error::{FeedError, FeedResult};
use autonoma_ws::{ws_url_for, ConnectionConfig, DEFAULT_API_URL, DEFAULT_WS_PATH};
use serde::{Deserialize, Serialize};

/// Telemetry stream configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// REST API base URL; the stream URL is derived from it.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Stream path appended to the derived WebSocket base.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    /// Rolling telemetry history length.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Maximum retained chat messages (oldest evicted first).
    #[serde(default = "default_chat_log_capacity")]
    pub chat_log_capacity: usize,
    /// Handshake timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Reconnect with backoff after a drop. False keeps the stream
    /// disconnected until it is recreated.
    #[serde(default = "default_reconnect_enabled")]
    pub reconnect_enabled: bool,
    /// Maximum reconnection attempts (0 = infinite).
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    /// Idle time before a ping (0 disables heartbeats).
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
    /// Capacity of the connection -> dispatcher event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_ws_path() -> String {
    DEFAULT_WS_PATH.to_string()
}

fn default_history_capacity() -> usize {
    50
}

fn default_chat_log_capacity() -> usize {
    500
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_reconnect_enabled() -> bool {
    true
}

fn default_reconnect_base_delay_ms() -> u64 {
    1_000
}

fn default_reconnect_max_delay_ms() -> u64 {
    30_000
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    10_000
}

fn default_event_buffer() -> usize {
    256
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ws_path: default_ws_path(),
            history_capacity: default_history_capacity(),
            chat_log_capacity: default_chat_log_capacity(),
            connect_timeout_ms: default_connect_timeout_ms(),
            reconnect_enabled: default_reconnect_enabled(),
            max_reconnect_attempts: 0,
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl StreamConfig {
    /// Default configuration pointed at `api_url`.
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Default::default()
        }
    }

    /// Derived WebSocket URL.
    pub fn ws_url(&self) -> FeedResult<String> {
        Ok(ws_url_for(&self.api_url, &self.ws_path)?)
    }

    pub fn validate(&self) -> FeedResult<()> {
        if self.history_capacity == 0 {
            return Err(FeedError::InvalidConfig(
                "history_capacity must be > 0".to_string(),
            ));
        }
        if self.chat_log_capacity == 0 {
            return Err(FeedError::InvalidConfig(
                "chat_log_capacity must be > 0".to_string(),
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(FeedError::InvalidConfig(
                "connect_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(FeedError::InvalidConfig(
                "event_buffer must be > 0".to_string(),
            ));
        }
        if self.reconnect_base_delay_ms > self.reconnect_max_delay_ms {
            return Err(FeedError::InvalidConfig(
                "reconnect_base_delay_ms must not exceed reconnect_max_delay_ms".to_string(),
            ));
        }
        self.ws_url()?;
        Ok(())
    }

    /// Transport configuration for the connection manager.
    pub fn connection_config(&self) -> FeedResult<ConnectionConfig> {
        Ok(ConnectionConfig {
            url: self.ws_url()?,
            connect_timeout_ms: self.connect_timeout_ms,
            reconnect_enabled: self.reconnect_enabled,
            max_reconnect_attempts: self.max_reconnect_attempts,
            reconnect_base_delay_ms: self.reconnect_base_delay_ms,
            reconnect_max_delay_ms: self.reconnect_max_delay_ms,
            heartbeat_interval_ms: self.heartbeat_interval_ms,
            heartbeat_timeout_ms: self.heartbeat_timeout_ms,
        })
    }
}
