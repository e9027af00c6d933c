//! HTTP client for the backend REST API.
//!
//! All calls are JSON over HTTP against `base_url`. Login and register store
//! the returned access token; subsequent calls send it as a bearer token.

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::types::{
    Booking, BookingConfirmation, BookingRequest, ChatReply, ChatRequest, Registration,
    TokenResponse, VehicleStatus,
};
use autonoma_ws::normalize_api_url;
use chrono::NaiveDate;
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Client for the backend REST API.
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    /// Create a new client from configuration.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ApiError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: normalize_api_url(&config.base_url),
            token: RwLock::new(config.token.clone()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    /// Exchange credentials for an access token.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<TokenResponse> {
        info!(email, "Logging in");
        let request = self
            .client
            .post(self.url("/api/auth/login"))
            .form(&[("username", email), ("password", password)]);

        let token: TokenResponse = Self::decode(self.send(request).await?).await?;
        self.set_token(Some(token.access_token.clone()));
        Ok(token)
    }

    /// Create an account. The new account is logged in.
    pub async fn register(&self, registration: &Registration) -> ApiResult<TokenResponse> {
        info!(email = %registration.email, role = %registration.role, "Registering account");
        let request = self
            .client
            .post(self.url("/api/auth/register"))
            .json(registration);

        let token: TokenResponse = Self::decode(self.send(request).await?).await?;
        self.set_token(Some(token.access_token.clone()));
        Ok(token)
    }

    /// Send one chat turn to the agent.
    pub async fn chat(&self, request: &ChatRequest) -> ApiResult<ChatReply> {
        debug!(vin = %request.vin, history = request.history.len(), "Sending chat message");
        let builder = self.authorized(self.client.post(self.url("/api/chat")).json(request));
        Self::decode(self.send(builder).await?).await
    }

    /// Vehicle and active anomaly of the logged-in customer.
    pub async fn vehicle_status(&self) -> ApiResult<VehicleStatus> {
        let token = self.token().ok_or(ApiError::MissingToken)?;
        let request = self
            .client
            .get(self.url("/api/vehicles/my-status"))
            .bearer_auth(token);
        Self::decode(self.send(request).await?).await
    }

    /// Free service slots on `date`.
    pub async fn available_slots(&self, date: NaiveDate) -> ApiResult<Vec<String>> {
        let date = date.format("%Y-%m-%d").to_string();
        let request = self.authorized(
            self.client
                .get(self.url("/api/service-center/slots"))
                .query(&[("date", date.as_str())]),
        );
        Self::decode(self.send(request).await?).await
    }

    pub async fn book_slot(&self, booking: &BookingRequest) -> ApiResult<BookingConfirmation> {
        info!(vin = %booking.vin, slot = %booking.slot, date = %booking.date, "Booking service slot");
        let request = self.authorized(
            self.client
                .post(self.url("/api/service-center/book"))
                .json(booking),
        );
        Self::decode(self.send(request).await?).await
    }

    /// All service-center bookings.
    pub async fn bookings(&self) -> ApiResult<Vec<Booking>> {
        let request = self.authorized(self.client.get(self.url("/api/service-center/bookings")));
        Self::decode(self.send(request).await?).await
    }

    /// One booking by id. Unknown ids yield `ApiError::NotFound`.
    pub async fn booking(&self, id: &str) -> ApiResult<Booking> {
        let request = self.authorized(
            self.client
                .get(self.url(&format!("/api/service-center/booking/{id}"))),
        );
        Self::decode(self.send(request).await?).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        request
            .send()
            .await
            .map_err(|e| ApiError::HttpClient(format!("HTTP request failed: {e}")))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "API request rejected");
            return Err(match status {
                StatusCode::UNAUTHORIZED => ApiError::Unauthorized(body),
                StatusCode::NOT_FOUND => ApiError::NotFound(body),
                _ => ApiError::Status {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::HttpClient(format!("Failed to parse response: {e}")))
    }
}
