//! Configuration types and loading
//!
//! Layering: built-in defaults, then an optional `servicedesk.toml`, then
//! `SERVICEDESK__SECTION__KEY` environment variables, then the well-known
//! plain variables (`DATABASE_URL`, `PORT`, `TELEGRAM_BOT_TOKEN`, ...).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SdError;
use crate::result::SdResult;

pub const DEFAULT_CONFIG_FILE: &str = "servicedesk.toml";

static CHAT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").expect("valid chat id pattern"));

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
    pub storage: StorageConfig,
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_size_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_body_size_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// PostgreSQL URL; in-memory stores are used when absent
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: String,
    pub request_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bot_token: None,
            chat_id: None,
            api_base: "https://api.telegram.org".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl TelegramConfig {
    /// Chat id to notify, only when it looks like a Telegram chat id
    pub fn valid_chat_id(&self) -> Option<&str> {
        self.chat_id
            .as_deref()
            .map(str::trim)
            .filter(|id| CHAT_ID.is_match(id))
    }

    /// Delivery is attempted only with a token and a valid chat id
    pub fn is_deliverable(&self) -> bool {
        self.enabled
            && self.bot_token.as_deref().is_some_and(|t| !t.is_empty())
            && self.valid_chat_id().is_some()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Local directory for uploaded files
    pub local_path: String,
    /// URL prefix under which stored files are served
    pub public_base_url: String,
    pub max_file_size_bytes: usize,
    pub max_files_per_request: usize,
    /// Prefix for inventory QR code links
    pub qr_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_path: "./uploads".to_string(),
            public_base_url: "/uploads".to_string(),
            max_file_size_bytes: 10 * 1024 * 1024,
            max_files_per_request: 10,
            qr_base_url: "/inventory/qr".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RealtimeConfig {
    /// Buffered events per subscriber before lagging ones are dropped
    pub channel_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

impl AppConfig {
    /// Load the layered configuration
    pub fn load() -> SdResult<Self> {
        let path = std::env::var("SERVICEDESK_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults, then the given file (if present), then prefixed environment variables
    pub fn load_from(path: &str) -> SdResult<Self> {
        let defaults = config::Config::try_from(&AppConfig::default())
            .map_err(|e| SdError::Config(e.to_string()))?;

        config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("SERVICEDESK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize::<AppConfig>())
            .map_err(|e| SdError::Config(e.to_string()))
    }

    /// Well-known variables used by container platforms
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                self.database.url = Some(url);
            }
        }
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(%port, "Ignoring invalid PORT"),
            }
        }
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Ok(chat_id) = std::env::var("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = Some(chat_id);
        }
        if let Ok(dir) = std::env::var("UPLOADS_DIR") {
            self.storage.local_path = dir;
        }
    }

    /// Get the server address
    pub fn server_addr(&self) -> std::net::SocketAddr {
        use std::net::SocketAddr;
        let ip: std::net::IpAddr = self.server.host.parse().unwrap_or([0, 0, 0, 0].into());
        SocketAddr::new(ip, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert!(config.database.url.is_none());
        assert_eq!(config.storage.max_files_per_request, 10);
    }

    #[test]
    fn test_chat_id_guard() {
        let mut telegram = TelegramConfig {
            bot_token: Some("123:abc".into()),
            chat_id: Some("-1001234".into()),
            ..Default::default()
        };
        assert_eq!(telegram.valid_chat_id(), Some("-1001234"));
        assert!(telegram.is_deliverable());

        telegram.chat_id = Some("@channel".into());
        assert!(telegram.valid_chat_id().is_none());
        assert!(!telegram.is_deliverable());

        telegram.chat_id = Some("42".into());
        telegram.bot_token = None;
        assert!(!telegram.is_deliverable());
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let config = AppConfig::load_from("does-not-exist-servicedesk").unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.realtime.channel_capacity, 256);
    }

    #[test]
    fn test_server_addr() {
        let config = AppConfig::default();
        assert_eq!(config.server_addr().port(), 3000);
    }
}
