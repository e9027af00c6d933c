//! Prometheus metrics and structured logging for Autonoma.
//!
//! - Structured logging with tracing (JSON in production)
//! - Prometheus metrics for the telemetry stream and status poller
//! - `/metrics` and `/healthz` endpoints

pub mod error;
pub mod logging;
pub mod metrics;
pub mod server;

pub use error::{ObservabilityError, ObservabilityResult};
pub use logging::init_logging;
pub use metrics::Metrics;
pub use server::serve_metrics;
