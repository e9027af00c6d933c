//! Live telemetry feed for Autonoma.
//!
//! Turns the raw frames of the stream connection into derived state that any
//! number of consumers can watch:
//! - `EnvelopeParser`: validated `{type, data}` parsing into typed events
//! - `StreamStore`: latest snapshot, rolling history, latest alert, chat log
//!   and connectivity, published as immutable `StreamView` values
//! - `TelemetryStream` / `StreamHandle`: owns the connection and tears it
//!   down deterministically

pub mod config;
pub mod error;
pub mod parser;
pub mod store;
pub mod stream;

pub use config::StreamConfig;
pub use error::{FeedError, FeedResult};
pub use parser::{EnvelopeKind, EnvelopeParser, ParseStats, ParseStatsSnapshot, StreamEvent};
pub use store::{StreamStore, StreamSubscriber, StreamView};
pub use stream::{StreamHandle, TelemetryStream};
