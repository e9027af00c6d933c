//! REST collaborator client for Autonoma.
//!
//! The backend owns chat, booking and auth; this crate only talks to it:
//! - `ApiClient`: JSON-over-HTTP calls (login, chat, vehicle status, slots, bookings)
//! - `Session`: local decoding of the access token to branch on role
//! - `StatusPoller`: periodic vehicle-status refresh published over `watch`

pub mod client;
pub mod config;
pub mod error;
pub mod poller;
pub mod session;
pub mod types;

pub use client::ApiClient;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use poller::{PollStats, PollStatsSnapshot, StatusPoller};
pub use session::{decode_claims, Claims, Role, Session};
pub use types::{
    Booking, BookingConfirmation, BookingRequest, ChatReply, ChatRequest, ChatTurn, Registration,
    TokenResponse, VehicleInfo, VehicleStatus,
};
