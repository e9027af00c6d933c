//! WebSocket client for the Autonoma telemetry stream.
//!
//! Provides the transport half of the live stream:
//! - Endpoint derivation from the REST API base URL
//! - Connection lifecycle (CONNECTING -> OPEN -> CLOSED) with optional
//!   exponential-backoff reconnection
//! - Heartbeat monitoring (idle ping, pong timeout detection)
//! - Ordered event forwarding (`Opened`, `Text`, `Closed`) over an mpsc channel

pub mod connection;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod heartbeat;

pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState};
pub use endpoint::{normalize_api_url, ws_url_for, API_URL_ENV, DEFAULT_API_URL, DEFAULT_WS_PATH};
pub use error::{WsError, WsResult};
pub use event::{CloseReason, WsEvent};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any `wss://` connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
