//! Process environment loader

use super::{SourceError, SourceLoader};
use crate::{SourceConfig, SourceValue};
use async_trait::async_trait;
use std::ffi::OsString;

/// Snapshots the current process environment.
///
/// Values that are not valid Unicode become bindings, so they are never
/// forwarded.
#[derive(Debug, Clone, Default)]
pub struct ProcessEnvSource;

impl ProcessEnvSource {
    pub fn new() -> Self {
        Self
    }

    /// Build a snapshot from raw OS pairs
    pub fn from_vars<I>(vars: I) -> SourceConfig
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        SourceConfig::from_entries(vars.into_iter().filter_map(|(key, value)| {
            // a key we cannot name cannot be matched by any rule
            let key = key.into_string().ok()?;
            let value = match value.into_string() {
                Ok(text) => SourceValue::text(text),
                Err(_) => SourceValue::binding("non-unicode"),
            };
            Some((key, value))
        }))
    }
}

#[async_trait]
impl SourceLoader for ProcessEnvSource {
    async fn load(&self) -> Result<SourceConfig, SourceError> {
        Ok(Self::from_vars(std::env::vars_os()))
    }

    fn describe(&self) -> String {
        "process environment".to_string()
    }
}
