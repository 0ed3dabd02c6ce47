//! File-based snapshot loaders

use super::{SourceError, SourceLoader};
use crate::{SourceConfig, SourceValue};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Loads a dotenv-style `KEY=value` file
#[derive(Debug, Clone)]
pub struct EnvFileSource {
    path: PathBuf,
}

impl EnvFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl SourceLoader for EnvFileSource {
    async fn load(&self) -> Result<SourceConfig, SourceError> {
        let content = read_source(&self.path).await?;
        let source = parse_env_file(&content)?;
        debug!(path = %self.path.display(), entries = source.len(), "loaded env file");
        Ok(source)
    }

    fn describe(&self) -> String {
        format!("env file {}", self.path.display())
    }
}

/// Loads a JSON object snapshot.
///
/// Strings stay strings, `null` is absent, anything else is a binding.
#[derive(Debug, Clone)]
pub struct JsonSnapshotSource {
    path: PathBuf,
}

impl JsonSnapshotSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl SourceLoader for JsonSnapshotSource {
    async fn load(&self) -> Result<SourceConfig, SourceError> {
        let content = read_source(&self.path).await?;
        let source = parse_json_snapshot(&content)?;
        debug!(path = %self.path.display(), entries = source.len(), "loaded JSON snapshot");
        Ok(source)
    }

    fn describe(&self) -> String {
        format!("JSON snapshot {}", self.path.display())
    }
}

async fn read_source(path: &Path) -> Result<String, SourceError> {
    if !path.exists() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }
    Ok(fs::read_to_string(path).await?)
}

/// Parse dotenv-style content into a snapshot
pub fn parse_env_file(content: &str) -> Result<SourceConfig, SourceError> {
    let entries = dotenvy::from_read_iter(content.as_bytes())
        .collect::<Result<Vec<(String, String)>, _>>()
        .map_err(|e| SourceError::Parse(e.to_string()))?;
    Ok(SourceConfig::from_strings(entries))
}

/// Parse a JSON object into a snapshot
pub fn parse_json_snapshot(content: &str) -> Result<SourceConfig, SourceError> {
    let value: serde_json::Value =
        serde_json::from_str(content).map_err(|e| SourceError::Parse(e.to_string()))?;

    match value {
        serde_json::Value::Object(map) => Ok(SourceConfig::from_entries(
            map.into_iter().map(|(k, v)| (k, SourceValue::from(v))),
        )),
        serde_json::Value::Array(_) => Err(SourceError::NotAnObject("array")),
        serde_json::Value::String(_) => Err(SourceError::NotAnObject("string")),
        serde_json::Value::Number(_) => Err(SourceError::NotAnObject("number")),
        serde_json::Value::Bool(_) => Err(SourceError::NotAnObject("bool")),
        serde_json::Value::Null => Err(SourceError::NotAnObject("null")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_env_file() {
        let source = parse_env_file(
            "# comment\nSKILL_A=a\nQUOTED=\"two words\"\nAPI_B=b\nEMPTY=\n",
        )
        .unwrap();
        assert_eq!(source.text("SKILL_A"), Some("a"));
        assert_eq!(source.text("QUOTED"), Some("two words"));
        assert_eq!(source.text("API_B"), Some("b"));
        assert_eq!(source.get("EMPTY").and_then(SourceValue::as_str), Some(""));
    }

    #[test]
    fn test_parse_env_file_rejects_garbage() {
        let err = parse_env_file("NOT VALID LINE\n").unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[test]
    fn test_parse_json_snapshot() {
        let source = parse_json_snapshot(
            r#"{"SKILL_A": "a", "SKILL_OBJECT": {"foo": "bar"}, "API_UNSET": null, "API_N": 3}"#,
        )
        .unwrap();
        assert_eq!(source.len(), 4);
        assert_eq!(source.text("SKILL_A"), Some("a"));
        assert!(matches!(source.get("SKILL_OBJECT"), Some(SourceValue::Binding(_))));
        assert!(matches!(source.get("API_UNSET"), Some(SourceValue::Absent)));
        assert!(matches!(source.get("API_N"), Some(SourceValue::Binding(_))));
    }

    #[test]
    fn test_parse_json_snapshot_requires_object() {
        assert!(matches!(
            parse_json_snapshot("[1, 2]"),
            Err(SourceError::NotAnObject("array"))
        ));
        assert!(matches!(parse_json_snapshot("{"), Err(SourceError::Parse(_))));
    }

    #[tokio::test]
    async fn test_env_file_source() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("worker.env");
        tokio::fs::write(&path, "SKILL_NOTION_API_KEY=notion\nCF_ACCESS_AUD=aud\n")
            .await
            .unwrap();

        let loader = EnvFileSource::new(&path);
        let source = loader.load().await.unwrap();
        assert_eq!(source.text("SKILL_NOTION_API_KEY"), Some("notion"));
        assert!(loader.describe().contains("worker.env"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempdir().unwrap();
        let loader = JsonSnapshotSource::new(dir.path().join("missing.json"));
        assert!(matches!(loader.load().await, Err(SourceError::NotFound(_))));
    }
}
