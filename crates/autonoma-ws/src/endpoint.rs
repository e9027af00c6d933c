//! Stream endpoint derivation.
//!
//! The WebSocket endpoint lives next to the REST API: take the API base URL,
//! swap the scheme (`http` -> `ws`, `https` -> `wss`) and append the stream path.

use crate::error::{WsError, WsResult};

/// Environment variable holding the REST API base URL.
pub const API_URL_ENV: &str = "AUTONOMA_API_URL";

/// API base URL used when nothing is configured.
pub const DEFAULT_API_URL: &str = "https://autonoma.onrender.com";

/// Path of the telemetry stream endpoint.
pub const DEFAULT_WS_PATH: &str = "/ws/telemetry";

/// Trim whitespace and trailing slashes.
pub fn normalize_api_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Build the stream URL for an API base URL and stream path.
///
/// `ws://` and `wss://` bases are accepted unchanged; any scheme other than
/// http(s)/ws(s) is rejected.
pub fn ws_url_for(api_url: &str, path: &str) -> WsResult<String> {
    let base = normalize_api_url(api_url);

    let (scheme, rest) = base
        .split_once("://")
        .ok_or_else(|| WsError::InvalidUrl(format!("missing scheme: {base}")))?;

    let ws_scheme = match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(WsError::InvalidUrl(format!(
                "unsupported scheme '{other}' in {base}"
            )))
        }
    };

    if rest.is_empty() {
        return Err(WsError::InvalidUrl(format!("missing host: {base}")));
    }

    let path = path.trim();
    let path = if path.is_empty() || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    Ok(format!("{ws_scheme}://{rest}{path}"))
}
