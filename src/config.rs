//! Client configuration for the upload tool and the HTTP API client

use crate::error::{Result, UploadError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Log level for the upload client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl LogLevel {
    /// The matching `log` crate filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Off => write!(f, "off"),
        }
    }
}

/// Configuration for an API endpoint and the uploads issued against it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Full URL of the action API endpoint (e.g. `https://example.org/w/api.php`)
    #[serde(rename = "endpoint")]
    pub endpoint: String,

    /// User agent sent with every request
    #[serde(rename = "user-agent", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Request timeout in seconds (default: 300)
    #[serde(rename = "timeout-secs", skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Size of the pieces the file body is streamed in, which is also the
    /// granularity of progress notifications (default: 64 KiB)
    #[serde(rename = "progress-chunk-size", skip_serializing_if = "Option::is_none")]
    pub progress_chunk_size: Option<usize>,

    /// Log level (default: info)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,

    /// Parameters merged into every request
    #[serde(rename = "default-parameters", default)]
    pub default_parameters: BTreeMap<String, String>,
}

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_PROGRESS_CHUNK_SIZE: usize = 64 * 1024;

impl Default for UploadConfig {
    fn default() -> Self {
        let mut default_parameters = BTreeMap::new();
        default_parameters.insert("format".to_string(), "json".to_string());

        Self {
            endpoint: String::new(),
            user_agent: Some(concat!("upload-client/", env!("CARGO_PKG_VERSION")).to_string()),
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            progress_chunk_size: Some(DEFAULT_PROGRESS_CHUNK_SIZE),
            log_level: Some(LogLevel::Info),
            default_parameters,
        }
    }
}

impl UploadConfig {
    /// Create a configuration for the given endpoint with default values
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set the request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Set the streaming chunk size in bytes
    pub fn progress_chunk_size(mut self, size: usize) -> Self {
        self.progress_chunk_size = Some(size);
        self
    }

    /// Set the log level
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Add a parameter merged into every request
    pub fn default_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_parameters.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(UploadError::invalid_parameter(
                "endpoint",
                "Endpoint must not be empty",
            ));
        }

        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(UploadError::invalid_parameter(
                "endpoint",
                format!("Endpoint must be an http(s) URL: {}", self.endpoint),
            ));
        }

        if self.timeout_secs == Some(0) {
            return Err(UploadError::invalid_parameter(
                "timeout_secs",
                "Timeout must be greater than 0",
            ));
        }

        if self.progress_chunk_size == Some(0) {
            return Err(UploadError::invalid_parameter(
                "progress_chunk_size",
                "Chunk size must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Convert the configuration to a JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(UploadError::from)
    }

    /// Create a configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            UploadError::config_error(format!("Failed to parse configuration: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            UploadError::config_error(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    /// Write the configuration to a file
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
