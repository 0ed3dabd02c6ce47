//! Raw configuration types for TOML parsing

use super::*;
use crate::passthrough::BlockPattern;
use serde::Deserialize;

/// Raw configuration as parsed from TOML
#[derive(Debug, Deserialize)]
pub struct RawConfig {
    pub logging: Option<RawLoggingConfig>,
    pub passthrough: Option<RawPassthroughConfig>,
    #[serde(default)]
    pub mappings: Vec<RawMapping>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawLoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl TryFrom<RawLoggingConfig> for LoggingConfig {
    type Error = ConfigError;

    fn try_from(raw: RawLoggingConfig) -> Result<Self, Self::Error> {
        let format = match raw.format.as_deref() {
            Some("pretty") | None => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown log format: {}",
                    other
                )))
            }
        };

        Ok(Self {
            level: raw.level.unwrap_or_else(|| "info".to_string()),
            format,
        })
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawPassthroughConfig {
    pub inherit_defaults: Option<bool>,
    #[serde(default)]
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub suffixes: Vec<String>,
    #[serde(default)]
    pub blocked_prefixes: Vec<String>,
    #[serde(default)]
    pub blocked_names: Vec<String>,
}

impl TryFrom<RawPassthroughConfig> for PassthroughRules {
    type Error = ConfigError;

    fn try_from(raw: RawPassthroughConfig) -> Result<Self, Self::Error> {
        let mut rules = if raw.inherit_defaults.unwrap_or(true) {
            PassthroughRules::defaults()
        } else {
            PassthroughRules::empty()
        };

        // an empty pattern would match every key
        for prefix in raw.prefixes {
            rules.add_prefix(validate_pattern("prefixes", prefix)?);
        }
        for suffix in raw.suffixes {
            rules.add_suffix(validate_pattern("suffixes", suffix)?);
        }
        for prefix in raw.blocked_prefixes {
            rules.add_block(BlockPattern::prefix(validate_pattern("blocked_prefixes", prefix)?));
        }
        for name in raw.blocked_names {
            rules.add_block(BlockPattern::exact(validate_pattern("blocked_names", name)?));
        }

        Ok(rules)
    }
}

#[derive(Debug, Deserialize)]
pub struct RawMapping {
    pub from: String,
    pub to: String,
}

impl TryFrom<RawMapping> for EnvMapping {
    type Error = ConfigError;

    fn try_from(raw: RawMapping) -> Result<Self, Self::Error> {
        let from = validate_pattern("mappings.from", raw.from)?;
        let to = validate_pattern("mappings.to", raw.to)?;
        if to.contains('=') || to.contains('\0') {
            return Err(ConfigError::Invalid(format!(
                "Mapping target is not a valid variable name: {}",
                to
            )));
        }
        Ok(EnvMapping::new(from, to))
    }
}

fn validate_pattern(field: &str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!(
            "Empty entry in {}",
            field
        )));
    }
    if value.trim() != value {
        return Err(ConfigError::Invalid(format!(
            "Entry in {} has surrounding whitespace: {:?}",
            field, value
        )));
    }
    Ok(value)
}
