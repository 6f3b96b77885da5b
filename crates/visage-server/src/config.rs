//! Server configuration loading from file and environment variables.
//!
//! Collaborator credentials are deliberately absent here: they come from the
//! environment alone (see `visage_voice::config`) and never touch a file.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Audio artifact settings.
    #[serde(default)]
    pub audio: AudioConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Admission control settings.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Audio artifact configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Directory where synthesized audio waits for delivery.
    #[serde(default = "default_audio_dir")]
    pub dir: String,

    /// Age in seconds after which an undelivered artifact is swept.
    /// 0 disables the sweep.
    #[serde(default = "default_sweep_after_secs")]
    pub sweep_after_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "visage_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Admission control configuration for the chat endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Max chat requests per client address per minute.
    #[serde(default = "default_chat_limit")]
    pub chat_limit: u32,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_audio_dir() -> String {
    "audio".to_string()
}

fn default_sweep_after_secs() -> u64 {
    600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_chat_limit() -> u32 {
    20
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            dir: default_audio_dir(),
            sweep_after_secs: default_sweep_after_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            chat_limit: default_chat_limit(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `VISAGE_HOST` overrides `server.host`
/// - `VISAGE_PORT` overrides `server.port`
/// - `VISAGE_AUDIO_DIR` overrides `audio.dir`
/// - `VISAGE_SWEEP_AFTER_SECS` overrides `audio.sweep_after_secs`
/// - `VISAGE_CHAT_LIMIT` overrides `rate_limit.chat_limit`
/// - `VISAGE_LOG_LEVEL` overrides `logging.level`
/// - `VISAGE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("VISAGE_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("VISAGE_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(dir) = std::env::var("VISAGE_AUDIO_DIR") {
        config.audio.dir = dir;
    }
    if let Ok(secs) = std::env::var("VISAGE_SWEEP_AFTER_SECS") {
        if let Ok(parsed) = secs.parse() {
            config.audio.sweep_after_secs = parsed;
        }
    }
    if let Ok(limit) = std::env::var("VISAGE_CHAT_LIMIT") {
        if let Ok(parsed) = limit.parse() {
            config.rate_limit.chat_limit = parsed;
        }
    }
    if let Ok(level) = std::env::var("VISAGE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("VISAGE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}
