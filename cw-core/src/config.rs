//! Application configuration management.
//!
//! Handles loading, saving, and accessing configuration for the chat client:
//! server address, session nickname, heartbeat/reconnect timing, and the
//! encryption passphrase. Configuration is persisted as TOML on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::constants;
use crate::error::{ChatError, ChatResult};
use crate::platform::Platform;

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chat server connection settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Heartbeat timing settings.
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// Reconnection policy settings.
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Message/file encryption settings.
    #[serde(default)]
    pub encryption: EncryptionConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Chat server connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server hostname or IP address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Server TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    /// The `host:port` form used for connecting and logging.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Nickname announced at login and echoed as the sender of every
    /// outbound packet. Immutable for the lifetime of one session.
    #[serde(default)]
    pub nickname: String,
}

/// Heartbeat timing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Interval between keep-alive pings, in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,

    /// Seconds without a pong before the connection is declared dead.
    #[serde(default = "default_pong_timeout")]
    pub pong_timeout_secs: u64,
}

/// Reconnection policy configuration.
///
/// The policy is bounded by design: once the attempt budget is spent the
/// client stays disconnected until the next explicit connect call or
/// heartbeat-triggered retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Maximum connection attempts per reconnect cycle.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts, in seconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

/// Encryption configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Shared passphrase for AES encryption of message text and file
    /// payloads. When unset, content travels in plaintext.
    #[serde(default)]
    pub passphrase: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, uses the default location.
    #[serde(default)]
    pub directory: String,

    /// Enable JSON structured logging output for the file layer.
    #[serde(default)]
    pub json_output: bool,
}

// Default value functions for serde

fn default_host() -> String {
    constants::DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    constants::DEFAULT_PORT
}

fn default_ping_interval() -> u64 {
    constants::PING_INTERVAL_SECS
}

fn default_pong_timeout() -> u64 {
    constants::PONG_TIMEOUT_SECS
}

fn default_max_attempts() -> u32 {
    constants::MAX_CONNECT_ATTEMPTS
}

fn default_retry_delay() -> u64 {
    constants::RETRY_DELAY_SECS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            session: SessionConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            reconnect: ReconnectConfig::default(),
            encryption: EncryptionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            nickname: String::new(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval(),
            pong_timeout_secs: default_pong_timeout(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self { passphrase: None }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            json_output: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default config file path.
    pub fn load_default() -> ChatResult<Self> {
        let path = Self::default_config_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> ChatResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default config file path.
    pub fn save_default(&self) -> ChatResult<()> {
        let path = Self::default_config_path()?;
        self.save_to_file(&path)
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> ChatResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ChatError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> ChatResult<PathBuf> {
        let config_dir = Platform::config_dir()?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get the effective log directory, using the configured path or the default.
    pub fn effective_log_dir(&self) -> ChatResult<PathBuf> {
        if self.logging.directory.is_empty() {
            Platform::default_log_dir()
        } else {
            Ok(PathBuf::from(&self.logging.directory))
        }
    }

    /// Check whether a session nickname has been configured.
    pub fn has_nickname(&self) -> bool {
        !self.session.nickname.trim().is_empty()
    }
}

/// Thread-safe configuration holder for shared access across tasks.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<AppConfig>>,
}

impl ConfigHandle {
    /// Create a new configuration handle.
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Read the configuration.
    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, AppConfig> {
        self.inner.read().await
    }

    /// Write/update the configuration.
    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, AppConfig> {
        self.inner.write().await
    }

    /// Save the current configuration to disk.
    pub async fn save(&self) -> ChatResult<()> {
        let config = self.inner.read().await;
        config.save_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.heartbeat.ping_interval_secs, 10);
        assert_eq!(config.heartbeat.pong_timeout_secs, 30);
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.reconnect.retry_delay_secs, 3);
        assert!(config.encryption.passphrase.is_none());
        assert!(!config.has_nickname());
    }

    #[test]
    fn test_server_address() {
        let server = ServerConfig {
            host: "chat.example.com".into(),
            port: 9100,
        };
        assert_eq!(server.address(), "chat.example.com:9100");
    }

    #[test]
    fn test_roundtrip_toml() {
        let mut config = AppConfig::default();
        config.session.nickname = "alice".into();
        config.encryption.passphrase = Some("hunter2".into());

        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(deserialized.session.nickname, "alice");
        assert_eq!(deserialized.encryption.passphrase.as_deref(), Some("hunter2"));
        assert_eq!(deserialized.reconnect.max_attempts, 5);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            host = "10.0.0.2"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.host, "10.0.0.2");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.heartbeat.ping_interval_secs, 10);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.session.nickname = "bob".into();
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.session.nickname, "bob");
    }
}
