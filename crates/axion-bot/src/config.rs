//! Configuration loading and validation

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub replies: RepliesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the webhook server
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Path the messaging platform posts updates to
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            webhook_path: default_webhook_path(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_webhook_path() -> String {
    "/".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token
    #[serde(default)]
    pub token: String,
    /// Bot API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: default_api_base(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Device registry (structured JSON or flat text)
    #[serde(default = "default_registry_url")]
    pub registry_url: String,
    /// Base URL of the per-variant build manifests
    #[serde(default = "default_build_base_url")]
    pub build_base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            registry_url: default_registry_url(),
            build_base_url: default_build_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_registry_url() -> String {
    "https://raw.githubusercontent.com/AxionAOSP/official_devices/refs/heads/main/OTA/axion.devices"
        .to_string()
}

fn default_build_base_url() -> String {
    "https://raw.githubusercontent.com/AxionAOSP/official_devices/main/OTA".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Freshness window for the registry and build lookups
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
    /// Maximum number of (codename, variant) entries kept
    #[serde(default = "default_max_build_entries")]
    pub max_build_entries: usize,
    /// Also cache "no build" answers for the TTL
    #[serde(default)]
    pub cache_negative_lookups: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            max_build_entries: default_max_build_entries(),
            cache_negative_lookups: false,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

fn default_ttl() -> u64 {
    axion_core::DEFAULT_TTL.as_secs()
}

fn default_max_build_entries() -> usize {
    axion_core::DEFAULT_MAX_BUILD_ENTRIES
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepliesConfig {
    /// Longest message sent in one piece; longer replies are split by line
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

impl Default for RepliesConfig {
    fn default() -> Self {
        Self {
            max_message_len: default_max_message_len(),
        }
    }
}

fn default_max_message_len() -> usize {
    4000 // Telegram rejects messages over 4096 characters
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}
