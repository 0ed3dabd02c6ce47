//! Configuration snapshot loaders
//!
//! Provides a trait for producing a [`SourceConfig`] and implementations
//! for the process environment, dotenv-style files and JSON snapshots.

mod file;
mod process;

pub use file::{parse_env_file, parse_json_snapshot, EnvFileSource, JsonSnapshotSource};
pub use process::ProcessEnvSource;

use crate::SourceConfig;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Snapshot loading errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read source: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse source: {0}")]
    Parse(String),

    #[error("Snapshot must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Trait for snapshot loaders
#[async_trait]
pub trait SourceLoader: Send + Sync {
    /// Load a fresh snapshot
    async fn load(&self) -> Result<SourceConfig, SourceError>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}
