//! Telemetry snapshots.
//!
//! A snapshot is one set of sensor readings (battery temperature, voltage,
//! motor rpm, ...) as pushed by the backend stream. The capture timestamp is
//! assigned when the frame is received; a timestamp carried in the payload is
//! never trusted and is only kept as an attribute.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Attribute key under which a payload-supplied timestamp is preserved.
pub const SOURCE_TIMESTAMP_KEY: &str = "source_timestamp";

/// Point-in-time set of named numeric readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Receipt time, used as the x-axis key for charts.
    pub timestamp: DateTime<Utc>,
    /// Numeric readings keyed by sensor name.
    pub readings: BTreeMap<String, f64>,
    /// Non-numeric payload fields (vehicle id, status strings, ...).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl TelemetrySnapshot {
    /// Create a snapshot from readings, stamped with `timestamp`.
    pub fn new(readings: BTreeMap<String, f64>, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            readings,
            attributes: Map::new(),
        }
    }

    /// Coerce an untyped `data` payload into a snapshot.
    ///
    /// The payload must be a JSON object. Numeric fields become readings,
    /// everything else is kept as an attribute.
    pub fn from_payload(data: Value, received_at: DateTime<Utc>) -> Result<Self> {
        let Value::Object(fields) = data else {
            return Err(CoreError::InvalidTelemetry(format!(
                "expected object, got {}",
                json_type_name(&data)
            )));
        };

        let mut readings = BTreeMap::new();
        let mut attributes = Map::new();

        for (name, value) in fields {
            if name == "timestamp" {
                attributes.insert(SOURCE_TIMESTAMP_KEY.to_string(), value);
                continue;
            }
            match value.as_f64() {
                Some(reading) => {
                    readings.insert(name, reading);
                }
                _ => {
                    attributes.insert(name, value);
                }
            }
        }

        Ok(Self {
            timestamp: received_at,
            readings,
            attributes,
        })
    }

    /// Get a reading by sensor name.
    pub fn reading(&self, name: &str) -> Option<f64> {
        self.readings.get(name).copied()
    }

    /// Get a non-numeric attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
