//! Application configuration.

use crate::error::{AppError, AppResult};
use autonoma_api::ApiConfig;
use autonoma_feed::StreamConfig;
use autonoma_ws::{normalize_api_url, API_URL_ENV};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "AUTONOMA_CONFIG";

/// Environment variable holding the API access token.
pub const TOKEN_ENV: &str = "AUTONOMA_TOKEN";

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Monitor loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Port for the `/metrics` endpoint (0 = disabled).
    #[serde(default)]
    pub metrics_port: u16,
    /// Interval between state summaries (ms).
    #[serde(default = "default_summary_interval_ms")]
    pub summary_interval_ms: u64,
    /// Poll the vehicle status endpoint (requires a token).
    #[serde(default)]
    pub poll_status: bool,
}

fn default_summary_interval_ms() -> u64 {
    10_000
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            metrics_port: 0,
            summary_interval_ms: default_summary_interval_ms(),
            poll_status: false,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load from `path` if given, else from the default path.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    /// Environment overrides are applied afterwards.
    pub fn load(path: Option<&str>) -> AppResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(DEFAULT_CONFIG_PATH)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `AUTONOMA_API_URL` and `AUTONOMA_TOKEN` from `lookup`.
    ///
    /// The API URL feeds both the REST client and the stream endpoint.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            let url = normalize_api_url(&url);
            self.stream.api_url = url.clone();
            self.api.base_url = url;
        }
        if let Some(token) = lookup(TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.api.token = Some(token.trim().to_string());
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        self.stream.validate()?;
        if self.monitor.summary_interval_ms == 0 {
            return Err(AppError::Config(
                "monitor.summary_interval_ms must be > 0".to_string(),
            ));
        }
        if self.monitor.poll_status && self.api.status_poll_interval_ms == 0 {
            return Err(AppError::Config(
                "api.status_poll_interval_ms must be > 0 when polling".to_string(),
            ));
        }
        Ok(())
    }
}
