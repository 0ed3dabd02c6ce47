//! envrelay - credential resolution and secret forwarding
//!
//! envrelay decides which secrets and settings from a configuration snapshot
//! are forwarded into the environment of a spawned child process, under what
//! names, and with what precedence. Resolution runs in two phases:
//!
//! 1. an explicit rule table (provider keys, gateway routing, renames)
//! 2. a dynamic passthrough classifier (prefix/suffix conventions, guarded
//!    by a blocklist)
//!
//! The engine is pure: it reads a [`SourceConfig`] and returns a fresh
//! [`ResolvedEnv`] on every call.

pub mod config;
pub mod passthrough;
pub mod resolver;
pub mod source;

pub use passthrough::{BlockPattern, DynamicOutcome, PassthroughRules};
pub use resolver::{build_env_vars, EnvMapping, EnvResolver, GatewayProvider};

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Core error types for envrelay
#[derive(Error, Debug)]
pub enum EnvrelayError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Source error: {0}")]
    Source(#[from] source::SourceError),
}

/// A string secret that never shows up in `Debug` output
#[derive(Debug, Clone)]
pub struct Secret(SecretString);

impl Secret {
    /// Create a new secret from a string
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// Expose the secret value
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A single value in a configuration snapshot
#[derive(Debug, Clone)]
pub enum SourceValue {
    /// A string value, the only kind eligible for forwarding
    Text(Secret),
    /// An opaque platform binding (service handle, structured object).
    /// The string describes the binding kind, never its contents.
    Binding(String),
    /// Declared but unset
    Absent,
}

impl SourceValue {
    /// Create a string value
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(Secret::new(value))
    }

    /// Create an opaque binding value
    pub fn binding(kind: impl Into<String>) -> Self {
        Self::Binding(kind.into())
    }

    /// The string value, including the empty string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SourceValue::Text(secret) => Some(secret.expose()),
            _ => None,
        }
    }

    /// The string value if it is non-empty
    pub fn present(&self) -> Option<&str> {
        self.as_str().filter(|s| !s.is_empty())
    }

    /// Whether this value is a string
    pub fn is_string(&self) -> bool {
        matches!(self, SourceValue::Text(_))
    }
}

impl From<serde_json::Value> for SourceValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => SourceValue::text(s),
            serde_json::Value::Null => SourceValue::Absent,
            serde_json::Value::Bool(_) => SourceValue::binding("bool"),
            serde_json::Value::Number(_) => SourceValue::binding("number"),
            serde_json::Value::Array(_) => SourceValue::binding("array"),
            serde_json::Value::Object(_) => SourceValue::binding("object"),
        }
    }
}

/// An immutable configuration snapshot handed to the resolver
#[derive(Debug, Clone, Default)]
pub struct SourceConfig {
    entries: HashMap<String, SourceValue>,
}

impl SourceConfig {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from key/value pairs
    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, SourceValue)>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Build a snapshot where every value is a string
    pub fn from_strings<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::from_entries(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), SourceValue::text(v))),
        )
    }

    /// Add a string entry
    pub fn with_text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), SourceValue::text(value));
        self
    }

    /// Add an opaque binding entry
    pub fn with_binding(mut self, key: impl Into<String>, kind: impl Into<String>) -> Self {
        self.entries.insert(key.into(), SourceValue::binding(kind));
        self
    }

    /// Add a declared-but-unset entry
    pub fn with_absent(mut self, key: impl Into<String>) -> Self {
        self.entries.insert(key.into(), SourceValue::Absent);
        self
    }

    /// Look up a raw entry
    pub fn get(&self, key: &str) -> Option<&SourceValue> {
        self.entries.get(key)
    }

    /// Look up a non-empty string entry
    pub fn text(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(SourceValue::present)
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SourceValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The flat environment produced by a resolution
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedEnv {
    vars: BTreeMap<String, String>,
}

impl ResolvedEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a resolved value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate over resolved pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over resolved keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    /// Consume into the underlying map
    pub fn into_map(self) -> BTreeMap<String, String> {
        self.vars
    }

    /// Render as `KEY=value` lines, quoting values that need it
    pub fn to_env_lines(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.vars {
            out.push_str(key);
            out.push('=');
            out.push_str(&quote_env_value(value));
            out.push('\n');
        }
        out
    }

    pub(crate) fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }
}

impl std::fmt::Debug for ResolvedEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.vars.keys()).finish()
    }
}

fn quote_env_value(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:@%+,".contains(c));
    if plain {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '$' => quoted.push_str("\\$"),
            '\n' => quoted.push_str("\\n"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}
