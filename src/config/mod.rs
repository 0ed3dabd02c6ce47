//! Configuration system for envrelay
//!
//! Loads configuration from TOML files. Everything is optional: an empty
//! file yields the built-in passthrough rules and `info` logging.

mod types;

pub use types::*;

use crate::passthrough::PassthroughRules;
use crate::resolver::EnvMapping;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main envrelay configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Effective dynamic passthrough rules
    pub passthrough: PassthroughRules,
    /// Extra explicit mappings, applied after the built-in table
    pub mappings: Vec<EnvMapping>,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Load configuration from a string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Self::from_raw(raw)
    }

    /// Convert from raw TOML config to validated config
    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let logging = raw.logging.unwrap_or_default().try_into()?;
        let passthrough = raw.passthrough.unwrap_or_default().try_into()?;

        let mappings = raw
            .mappings
            .into_iter()
            .map(EnvMapping::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            logging,
            passthrough,
            mappings,
        })
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            logging: LoggingConfig::default(),
            passthrough: PassthroughRules::defaults(),
            mappings: vec![],
        }
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("envrelay")
            .join("config.toml")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Format: "json" or "pretty"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format
    Pretty,
    /// JSON format
    Json,
}

/// Template written by `envrelay init`
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# envrelay configuration

[logging]
level = "info"
format = "pretty"

[passthrough]
# Built-in conventions stay active unless this is false
inherit_defaults = true
# Extra conventions for dynamic forwarding
# prefixes = ["TOOL_"]
# suffixes = ["_SECRET"]
# Never forwarded dynamically
# blocked_prefixes = ["INTERNAL_"]
# blocked_names = ["SESSION_KV"]

# Extra explicit mappings (source name -> child name)
# [[mappings]]
# from = "HOST_NOTION_TOKEN"
# to = "NOTION_TOKEN"
"#;
