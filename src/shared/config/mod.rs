//! Application configuration module
//!
//! Provides configuration types for the sync core. Values are validated once
//! in [`AppConfigBuilder::build`]; components read them without re-checking.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default REST base URL
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000/api";

/// Maximum failed replays before a queued mutation is dropped
pub const DEFAULT_MAX_RETRIES: u32 = 3;

const DEFAULT_PROFILE_TTL_SECS: u64 = 300;
const DEFAULT_VITALS_TTL_SECS: u64 = 60;
const DEFAULT_RECONNECT_ATTEMPTS: u32 = 5;
const DEFAULT_RECONNECT_DELAY_MS: u64 = 2_000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// REST base URL, e.g. `http://host:3000/api`
    pub server_url: String,
    /// WebSocket endpoint; derived from `server_url` when absent
    pub socket_url: Option<String>,
    /// URL probed by the connectivity check; `server_url` when absent
    pub probe_url: Option<String>,
    /// TTL for student profile cache entries
    pub profile_ttl_secs: u64,
    /// TTL for vital-sign cache entries
    pub vitals_ttl_secs: u64,
    /// Offline queue retry bound
    pub max_retries: u32,
    /// Socket reconnection attempts after a disconnect
    pub reconnect_attempts: u32,
    /// Fixed delay between socket reconnection attempts
    pub reconnect_delay_ms: u64,
    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
    /// SQLite file backing durable storage
    pub storage_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            socket_url: None,
            probe_url: None,
            profile_ttl_secs: DEFAULT_PROFILE_TTL_SECS,
            vitals_ttl_secs: DEFAULT_VITALS_TTL_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            storage_path: None,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_http_url(&self.server_url)?;
        if let Some(socket_url) = &self.socket_url {
            let url = Url::parse(socket_url).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", socket_url, e)))?;
            if !matches!(url.scheme(), "ws" | "wss") {
                return Err(ConfigError::InvalidUrl(format!("{}: expected ws:// or wss://", socket_url)));
            }
        }
        if let Some(probe_url) = &self.probe_url {
            parse_http_url(probe_url)?;
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidValue("max_retries must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("request_timeout_secs must be at least 1"));
        }
        Ok(())
    }

    /// WebSocket endpoint, defaulting to `ws(s)://<api host>/socket`
    pub fn socket_url(&self) -> String {
        if let Some(url) = &self.socket_url {
            return url.clone();
        }
        match Url::parse(&self.server_url) {
            Ok(mut url) => {
                let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
                // http/https -> ws/wss is always an allowed scheme change
                let _ = url.set_scheme(scheme);
                url.set_path("/socket");
                url.set_query(None);
                url.to_string()
            }
            Err(_) => "ws://127.0.0.1:3000/socket".to_string(),
        }
    }

    /// Connectivity probe URL
    pub fn probe_url(&self) -> &str {
        self.probe_url.as_deref().unwrap_or(&self.server_url)
    }

    pub fn profile_ttl(&self) -> Duration {
        Duration::from_secs(self.profile_ttl_secs)
    }

    pub fn vitals_ttl(&self) -> Duration {
        Duration::from_secs(self.vitals_ttl_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_http_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!("{}: expected http:// or https://", raw)));
    }
    Ok(url)
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the REST base URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = url.into();
        self
    }

    /// Set the WebSocket URL
    pub fn socket_url(mut self, url: impl Into<String>) -> Self {
        self.config.socket_url = Some(url.into());
        self
    }

    /// Set the connectivity probe URL
    pub fn probe_url(mut self, url: impl Into<String>) -> Self {
        self.config.probe_url = Some(url.into());
        self
    }

    pub fn profile_ttl(mut self, ttl: Duration) -> Self {
        self.config.profile_ttl_secs = ttl.as_secs();
        self
    }

    pub fn vitals_ttl(mut self, ttl: Duration) -> Self {
        self.config.vitals_ttl_secs = ttl.as_secs();
        self
    }

    /// Set the offline queue retry bound
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set socket reconnection attempts and the fixed delay between them
    pub fn reconnect(mut self, attempts: u32, delay: Duration) -> Self {
        self.config.reconnect_attempts = attempts;
        self.config.reconnect_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_secs = timeout.as_secs();
        self
    }

    /// Set the SQLite storage file
    pub fn storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.storage_path = Some(path.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid value: {0}")]
    InvalidValue(&'static str),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
