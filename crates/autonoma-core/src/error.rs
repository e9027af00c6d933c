//! Error types for autonoma-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid telemetry payload: {0}")]
    InvalidTelemetry(String),

    #[error("Invalid alert payload: {0}")]
    InvalidAlert(String),

    #[error("Invalid chat payload: {0}")]
    InvalidChat(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
