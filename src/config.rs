//! Configuration management for the Amtron exporter
//!
//! Configuration is layered: built-in defaults, then an optional YAML file,
//! then environment variables. The environment always wins so container
//! deployments can run without any file at all.

use crate::error::{AmtronError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Environment variable naming an explicit YAML config file
pub const CONFIG_PATH_ENV: &str = "AMTRON_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Charger web interface connection
    pub device: DeviceConfig,

    /// Delay between the end of one poll cycle and the start of the next
    pub poll_interval_seconds: u64,

    /// Metrics endpoint binding
    pub web: WebConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Charger web interface connection parameters
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// IP address or hostname of the charger
    pub ip: String,

    /// HTTP port of the web dashboard (plain HTTP)
    pub port: u16,

    /// Web interface user
    pub username: String,

    /// Web interface password; only ever sent hashed
    pub password: String,

    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Whether to use JSON format
    pub json_format: bool,

    /// Optional log file; rotated daily next to the given path
    pub file: Option<String>,
}

impl std::fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("ip", &self.ip)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

impl DeviceConfig {
    /// Base URL of the charger web interface
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.ip, self.port)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from file (if any) and the process environment
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => {
                let default_paths = [
                    "amtron_exporter.yaml",
                    "/etc/amtron-exporter/config.yaml",
                ];
                match default_paths.iter().find(|p| Path::new(p).exists()) {
                    Some(path) => Self::from_file(path)?,
                    None => Config::default(),
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment-style overrides from an arbitrary lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("AMTRON_IP") {
            self.device.ip = v.trim().to_string();
        }
        if let Some(v) = get("AMTRON_PORT") {
            self.device.port = parse_env("AMTRON_PORT", &v)?;
        }
        if let Some(v) = get("AMTRON_USERNAME") {
            self.device.username = v;
        }
        if let Some(v) = lookup("AMTRON_PASSWORD") {
            self.device.password = v;
        }
        if let Some(v) = get("AMTRON_TIMEOUT_SECONDS") {
            self.device.request_timeout_seconds = parse_env("AMTRON_TIMEOUT_SECONDS", &v)?;
        }
        if let Some(v) = get("POLLING_INTERVAL_SECONDS") {
            self.poll_interval_seconds = parse_env("POLLING_INTERVAL_SECONDS", &v)?;
        }
        if let Some(v) = get("EXPORTER_HOST") {
            self.web.host = v.trim().to_string();
        }
        if let Some(v) = get("EXPORTER_PORT") {
            self.web.port = parse_env("EXPORTER_PORT", &v)?;
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.logging.level = v.trim().to_string();
        }
        if let Some(v) = get("LOG_JSON") {
            self.logging.json_format = parse_bool("LOG_JSON", &v)?;
        }
        if let Some(v) = get("LOG_FILE") {
            self.logging.file = Some(v.trim().to_string());
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.device.ip.trim().is_empty() {
            return Err(AmtronError::validation(
                "device.ip",
                "IP address cannot be empty",
            ));
        }

        if self.device.port == 0 {
            return Err(AmtronError::validation(
                "device.port",
                "Port must be greater than 0",
            ));
        }

        if self.device.username.trim().is_empty() {
            return Err(AmtronError::validation(
                "device.username",
                "Username cannot be empty",
            ));
        }

        if self.device.request_timeout_seconds == 0 {
            return Err(AmtronError::validation(
                "device.request_timeout_seconds",
                "Must be greater than 0",
            ));
        }

        if self.poll_interval_seconds == 0 {
            return Err(AmtronError::validation(
                "poll_interval_seconds",
                "Must be greater than 0",
            ));
        }

        if self.web.port == 0 {
            return Err(AmtronError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        crate::logging::parse_log_level(&self.logging.level)?;

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| AmtronError::config(format!("Invalid value for {}: '{}'", key, value)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AmtronError::config(format!(
            "Invalid value for {}: '{}'",
            key, value
        ))),
    }
}
