use crate::client::storage::SqliteStore;
use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};
use std::path::{Path, PathBuf};

/// Overrides `server_url`
pub const API_URL_ENV: &str = "VITALSYNC_API_URL";
/// Overrides `socket_url`
pub const SOCKET_URL_ENV: &str = "VITALSYNC_SOCKET_URL";

/// Runtime configuration: file or defaults, then environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    app: AppConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env().unwrap_or_else(|e| {
            tracing::warn!("Ignoring invalid environment configuration: {}", e);
            Self { app: AppConfig::default() }
        })
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_app(AppConfig::default())
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        Ok(Self { app: builder.build()? })
    }

    /// Load a TOML file; keys left out keep their defaults
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let app: AppConfig = toml::from_str(raw)?;
        Self::from_app(app)
    }

    fn from_app(mut app: AppConfig) -> Result<Self, ConfigError> {
        if let Some(url) = env_value(API_URL_ENV) {
            app.server_url = url;
        }
        if let Some(url) = env_value(SOCKET_URL_ENV) {
            app.socket_url = Some(url);
        }
        app.validate()?;
        Ok(Self { app })
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.app.server_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn server_url(&self) -> &str {
        &self.app.server_url
    }

    pub fn socket_url(&self) -> String {
        self.app.socket_url()
    }

    /// SQLite file backing durable storage
    pub fn storage_path(&self) -> PathBuf {
        self.app
            .storage_path
            .clone()
            .unwrap_or_else(SqliteStore::default_path)
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}
