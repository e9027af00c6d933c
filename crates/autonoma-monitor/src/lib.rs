//! Autonoma vehicle monitor.
//!
//! Headless consumer of the live telemetry stream:
//! - Telemetry stream with rolling history and latest alert
//! - Optional vehicle status polling via the REST API
//! - Periodic summaries and Prometheus metrics

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::{AppConfig, MonitorConfig};
pub use error::{AppError, AppResult};
