//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feed error: {0}")]
    Feed(#[from] autonoma_feed::FeedError),

    #[error("API error: {0}")]
    Api(#[from] autonoma_api::ApiError),

    #[error("Observability error: {0}")]
    Observability(#[from] autonoma_observability::ObservabilityError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
