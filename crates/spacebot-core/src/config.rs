//! Spacebot configuration system.
//!
//! One `SpacebotConfig` is built at process start (file + CLI overrides)
//! and handed down to the collaborators that need it. No module-scope
//! environment reads.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SpacebotError};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SpacebotConfig {
    #[serde(default)]
    pub chat: ChatApiConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl SpacebotConfig {
    /// Load config from the default path (~/.spacebot/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SpacebotError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| SpacebotError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| SpacebotError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Spacebot home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".spacebot")
    }
}

/// Chat platform REST API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatApiConfig {
    /// Base URL of the chat platform API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Bot credential sent as a bearer token.
    #[serde(default)]
    pub bot_token: String,
    /// Per-request timeout for outbound API calls.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    "https://chat.googleapis.com/v1".into()
}
fn default_request_timeout() -> u64 {
    30
}

impl Default for ChatApiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            bot_token: String::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Webhook gateway (HTTP server) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Shared token required on admin API calls. Empty = no auth.
    #[serde(default)]
    pub admin_token: String,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            admin_token: String::new(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "~/.spacebot/spacebot.db".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How far ahead the cron parser scans for the next fire time.
    #[serde(default = "default_lookahead_hours")]
    pub lookahead_hours: u32,
}

fn default_lookahead_hours() -> u32 {
    48
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lookahead_hours: default_lookahead_hours(),
        }
    }
}
