//! Anomaly alerts.
//!
//! Only the latest alert is retained by consumers: an alert represents the
//! current anomaly state, not a log entry.

use crate::error::{CoreError, Result};
use crate::telemetry::json_type_name;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Severity used when the backend omits it or sends null.
pub const UNKNOWN_SEVERITY: &str = "unknown";

/// Most recent anomaly record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Human-readable anomaly description.
    pub description: String,
    /// Severity label as sent by the backend (e.g. "High", "Critical").
    pub severity: String,
    /// Passthrough fields (diagnosis, remaining useful life, ...).
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl Alert {
    /// Create an alert without passthrough fields.
    pub fn new(description: impl Into<String>, severity: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            severity: severity.into(),
            extra: Map::new(),
        }
    }

    /// Coerce an untyped `data` payload into an alert.
    ///
    /// `description` is required; the stream backend names it `reason`, which
    /// is accepted as an alias. A missing or null severity maps to
    /// [`UNKNOWN_SEVERITY`].
    pub fn from_payload(data: Value) -> Result<Self> {
        let Value::Object(mut fields) = data else {
            return Err(CoreError::InvalidAlert(format!(
                "expected object, got {}",
                json_type_name(&data)
            )));
        };

        let description = match take_string(&mut fields, "description")? {
            Some(d) => d,
            None => take_string(&mut fields, "reason")?.ok_or_else(|| {
                CoreError::InvalidAlert("missing description".to_string())
            })?,
        };
        let severity =
            take_string(&mut fields, "severity")?.unwrap_or_else(|| UNKNOWN_SEVERITY.to_string());

        Ok(Self {
            description,
            severity,
            extra: fields,
        })
    }

    /// Get a passthrough field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}

/// Remove `key` and require it to be a string; null or absent yields `None`.
fn take_string(fields: &mut Map<String, Value>, key: &str) -> Result<Option<String>> {
    match fields.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(CoreError::InvalidAlert(format!(
            "{key} must be a string, got {}",
            json_type_name(&other)
        ))),
    }
}
