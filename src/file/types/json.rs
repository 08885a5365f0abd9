use crate::file::SemanticSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

/// JSON file handler
pub struct JsonFile {
    path: std::path::PathBuf,
    extension: Option<String>,
}

impl JsonFile {
    pub fn new(path: std::path::PathBuf, extension: Option<String>) -> Self {
        Self { path, extension }
    }
}

#[async_trait]
impl SemanticSource for JsonFile {
    async fn to_text_impl(&self) -> Result<String> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read JSON file: {}", self.path.display()))?;

        // Parse to validate and pretty-print for readable passages
        let parsed: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON file: {}", self.path.display()))?;

        serde_json::to_string_pretty(&parsed)
            .with_context(|| format!("Failed to serialize JSON: {}", self.path.display()))
    }

    async fn to_metadata(&self) -> Result<Option<Value>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read JSON file: {}", self.path.display()))?;

        let parsed: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON file: {}", self.path.display()))?;

        let mut meta_map = serde_json::Map::new();
        match &parsed {
            Value::Object(map) => {
                meta_map.insert(
                    "top_level_keys".to_string(),
                    Value::Array(map.keys().cloned().map(Value::String).collect()),
                );
            }
            Value::Array(items) => {
                meta_map.insert("item_count".to_string(), Value::Number(items.len().into()));
            }
            _ => {}
        }

        Ok(Some(Value::Object(meta_map)))
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_json_file_extraction() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        std::fs::write(&path, r#"{"plan":"dental","cashback":120}"#).unwrap();

        let json_file = JsonFile::new(path, Some("json".to_string()));
        let text = json_file.to_text().await.unwrap();
        assert!(text.contains("\"plan\""));
        assert!(text.contains("120"));
    }

    #[tokio::test]
    async fn test_json_file_invalid_errors() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        std::fs::write(&path, "not json {{").unwrap();

        let json_file = JsonFile::new(path, Some("json".to_string()));
        assert!(json_file.to_text().await.is_err());
    }

    #[tokio::test]
    async fn test_json_file_metadata_keys() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        std::fs::write(&path, r#"{"plan":"dental","cashback":120}"#).unwrap();

        let json_file = JsonFile::new(path, Some("json".to_string()));
        let metadata = json_file.to_metadata().await.unwrap().unwrap();
        let keys = metadata["top_level_keys"].as_array().unwrap();
        assert_eq!(keys.len(), 2);
    }
}
