//! Side-channel chat messages pushed over the live stream.

use crate::error::{CoreError, Result};
use crate::telemetry::json_type_name;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Chat record pushed by the backend agent.
///
/// The body shape is owned by the backend; the agent currently sends
/// `{"sender": "...", "content": "..."}`, which the accessors understand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Client-assigned id, stable for the lifetime of the log entry.
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    pub body: Value,
}

impl ChatMessage {
    /// Coerce an untyped `data` payload into a chat message.
    ///
    /// Objects and plain strings are accepted; anything else is rejected.
    pub fn from_payload(data: Value, received_at: DateTime<Utc>) -> Result<Self> {
        match data {
            Value::Object(_) | Value::String(_) => Ok(Self {
                id: Uuid::new_v4(),
                received_at,
                body: data,
            }),
            other => Err(CoreError::InvalidChat(format!(
                "expected object or string, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Sender label, if the body carries one.
    pub fn sender(&self) -> Option<&str> {
        self.body.get("sender").and_then(Value::as_str)
    }

    /// Message text: the `content` (or `text`) field, or the body itself
    /// when the backend sent a bare string.
    pub fn content(&self) -> Option<&str> {
        match &self.body {
            Value::String(s) => Some(s),
            body => body
                .get("content")
                .or_else(|| body.get("text"))
                .and_then(Value::as_str),
        }
    }
}
