//! Access-token session.
//!
//! The token is only decoded locally to learn who is logged in and which
//! dashboard they belong to. Signature verification is the backend's job.

use crate::error::{ApiError, ApiResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role carried in the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Service,
    Manufacturer,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Service => "service",
            Self::Manufacturer => "manufacturer",
            Self::Unknown => "unknown",
        }
    }

    /// Landing route for this role.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Self::Customer => "/dashboard/customer",
            Self::Service => "/dashboard/service",
            Self::Manufacturer => "/dashboard/manufacturing",
            Self::Unknown => "/",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account email.
    pub sub: String,
    #[serde(default)]
    pub role: Role,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Decode the claims of a `header.payload.signature` token without
/// verifying it.
pub fn decode_claims(token: &str) -> ApiResult<Claims> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => {
            return Err(ApiError::InvalidToken(
                "expected three dot-separated segments".to_string(),
            ))
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ApiError::InvalidToken(format!("payload is not base64url: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::InvalidToken(format!("payload is not valid claims: {e}")))
}

/// Logged-in session.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    claims: Claims,
}

impl Session {
    /// Build a session from a raw token, rejecting it if already expired at `now`.
    pub fn from_token(token: impl Into<String>, now: DateTime<Utc>) -> ApiResult<Self> {
        let token = token.into();
        let claims = decode_claims(&token)?;
        let session = Self { token, claims };
        if session.is_expired(now) {
            return Err(ApiError::TokenExpired);
        }
        Ok(session)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn role(&self) -> Role {
        self.claims.role
    }

    pub fn dashboard_path(&self) -> &'static str {
        self.claims.role.dashboard_path()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.claims.exp.saturating_mul(1000) < now.timestamp_millis()
    }
}
