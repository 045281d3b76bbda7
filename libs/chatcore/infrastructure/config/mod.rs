use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Default config location when `CHAT_CONFIG_PATH` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/chat.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarMissing(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Chat client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// API key from .env (not in YAML)
    #[serde(skip)]
    pub api_key: String,

    /// User token from .env (not in YAML)
    #[serde(skip)]
    pub user_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// REST base URL, e.g. https://chat.example.com
    pub base_url: String,
    /// WebSocket endpoint, e.g. wss://chat.example.com/connect
    pub ws_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_pong_timeout")]
    pub pong_timeout_secs: u64,
    #[serde(default = "default_background_grace")]
    pub background_grace_secs: u64,
    #[serde(default = "default_stays_connected")]
    pub stays_connected_in_background: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval(),
            pong_timeout_secs: default_pong_timeout(),
            background_grace_secs: default_background_grace(),
            stays_connected_in_background: default_stays_connected(),
        }
    }
}

impl ConnectionConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn pong_timeout(&self) -> Duration {
        Duration::from_secs(self.pong_timeout_secs)
    }

    pub fn background_grace(&self) -> Duration {
        Duration::from_secs(self.background_grace_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_heartbeat_interval() -> u64 {
    chatsocket::config::DEFAULT_HEARTBEAT_INTERVAL.as_secs()
}

fn default_pong_timeout() -> u64 {
    chatsocket::config::DEFAULT_PONG_TIMEOUT.as_secs()
}

fn default_background_grace() -> u64 {
    chatsocket::config::DEFAULT_BACKGROUND_GRACE.as_secs()
}

fn default_stays_connected() -> bool {
    true
}

fn default_page_size() -> usize {
    crate::pagination::DEFAULT_PAGE_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ChatConfig {
    /// Load configuration from YAML file and .env
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config: ChatConfig = serde_yaml::from_str(&yaml_content)?;

        dotenv::dotenv().ok();

        config.api_key = std::env::var("CHAT_API_KEY")
            .map_err(|_| ConfigError::EnvVarMissing("CHAT_API_KEY".to_string()))?;
        config.user_token = std::env::var("CHAT_USER_TOKEN")
            .map_err(|_| ConfigError::EnvVarMissing("CHAT_USER_TOKEN".to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `CHAT_CONFIG_PATH`, falling back to `config/chat.yaml`
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::load(Self::config_path())
    }

    pub fn config_path() -> PathBuf {
        std::env::var("CHAT_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(
                "api.base_url must start with http:// or https://".to_string(),
            ));
        }

        if !self.api.ws_url.starts_with("ws://") && !self.api.ws_url.starts_with("wss://") {
            return Err(ConfigError::ValidationError(
                "api.ws_url must start with ws:// or wss://".to_string(),
            ));
        }

        if self.connection.heartbeat_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "connection.heartbeat_interval_secs must be greater than 0".to_string(),
            ));
        }

        // The watchdog has to fire before the next ping goes out
        if self.connection.pong_timeout_secs == 0
            || self.connection.pong_timeout_secs >= self.connection.heartbeat_interval_secs
        {
            return Err(ConfigError::ValidationError(
                "connection.pong_timeout_secs must be between 1 and heartbeat_interval_secs"
                    .to_string(),
            ));
        }

        if self.pagination.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "pagination.page_size must be greater than 0".to_string(),
            ));
        }

        if self.api_key.is_empty() {
            return Err(ConfigError::ValidationError(
                "CHAT_API_KEY cannot be empty".to_string(),
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// WebSocket URL with the API key attached
    pub fn websocket_url(&self) -> String {
        let separator = if self.api.ws_url.contains('?') { '&' } else { '?' };
        format!("{}{}api_key={}", self.api.ws_url, separator, self.api_key)
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  REST base URL: {}", self.api.base_url);
        info!("  WebSocket URL: {}", self.api.ws_url);
        info!(
            "  Heartbeat: {}s (pong timeout {}s)",
            self.connection.heartbeat_interval_secs, self.connection.pong_timeout_secs
        );
        info!(
            "  Background: {} ({}s grace)",
            if self.connection.stays_connected_in_background {
                "stay connected"
            } else {
                "disconnect"
            },
            self.connection.background_grace_secs
        );
        info!("  Page size: {}", self.pagination.page_size);
        info!("  Log level: {}", self.log_level);
    }
}
