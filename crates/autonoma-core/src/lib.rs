//! Core domain types for the Autonoma telemetry client.
//!
//! This crate provides the types shared by the stream and REST layers:
//! - `TelemetrySnapshot`: Sensor readings stamped at receipt time
//! - `Alert`: Latest known anomaly (overwritten, never accumulated)
//! - `ChatMessage`: Side-channel chat record pushed by the backend
//! - `BoundedHistory`: Fixed-capacity FIFO buffer used for rolling history

pub mod alert;
pub mod chat;
pub mod error;
pub mod history;
pub mod telemetry;

pub use alert::{Alert, UNKNOWN_SEVERITY};
pub use chat::ChatMessage;
pub use error::{CoreError, Result};
pub use history::BoundedHistory;
pub use telemetry::{TelemetrySnapshot, SOURCE_TIMESTAMP_KEY};
