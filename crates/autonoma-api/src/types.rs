//! Request/response types for the backend REST API.

use crate::session::Role;
use autonoma_core::Alert;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Token issued by login and register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub role: Role,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Account registration.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One prior turn of the chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// "user" or "bot".
    pub sender: String,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            sender: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            sender: "bot".to_string(),
            content: content.into(),
        }
    }
}

/// Request/response chat call.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<ChatTurn>,
    pub vin: String,
}

/// Agent reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub response: String,
    /// The agent suggests opening the booking flow.
    #[serde(default)]
    pub show_booking_ui: bool,
    #[serde(default)]
    pub available_slots: Vec<String>,
}

/// Vehicle owned by the logged-in customer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VehicleInfo {
    pub vin: String,
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

/// Result of the vehicle status poll.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct VehicleStatus {
    #[serde(default)]
    pub vehicle: Option<VehicleInfo>,
    #[serde(default)]
    pub anomaly: Option<Alert>,
}

impl VehicleStatus {
    pub fn vin(&self) -> Option<&str> {
        self.vehicle.as_ref().map(|v| v.vin.as_str())
    }

    /// Banner text for an active anomaly.
    pub fn alert_message(&self) -> Option<String> {
        self.anomaly.as_ref().map(|a| {
            format!("ALERT: {}. Severity: {}.", a.description, a.severity)
        })
    }
}

/// Service slot booking.
#[derive(Debug, Clone, Serialize)]
pub struct BookingRequest {
    pub vin: String,
    /// Slot label as returned by the slots call (e.g. "09:30 AM").
    pub slot: String,
    pub service_type: String,
    pub date: NaiveDate,
}

impl BookingRequest {
    pub fn new(vin: impl Into<String>, slot: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            vin: vin.into(),
            slot: slot.into(),
            service_type: "General Checkup".to_string(),
            date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookingConfirmation {
    pub booking_id: String,
    pub status: String,
    pub message: String,
}

/// Service-center booking record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub vin: String,
    #[serde(default = "default_owner")]
    pub owner: String,
    pub time: String,
    pub date: String,
    #[serde(default = "default_issue")]
    pub issue: String,
    #[serde(default = "default_severity")]
    pub severity: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub purchase_date: Option<String>,
}

fn default_owner() -> String {
    "Unknown".to_string()
}

fn default_issue() -> String {
    "Scheduled Service".to_string()
}

fn default_severity() -> String {
    "Medium".to_string()
}

fn default_status() -> String {
    "PENDING".to_string()
}
