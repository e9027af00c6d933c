//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] autonoma_core::CoreError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("WebSocket error: {0}")]
    Ws(#[from] autonoma_ws::WsError),
}

pub type FeedResult<T> = Result<T, FeedError>;
