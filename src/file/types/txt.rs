use crate::file::SemanticSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

/// Plain text file handler
pub struct TxtFile {
    path: std::path::PathBuf,
    extension: Option<String>,
}

impl TxtFile {
    pub fn new(path: std::path::PathBuf, extension: Option<String>) -> Self {
        Self { path, extension }
    }
}

#[async_trait]
impl SemanticSource for TxtFile {
    async fn to_text_impl(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read text file: {}", self.path.display()))
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
    async fn test_txt_file_extraction() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        std::fs::write(&path, "plain text content").unwrap();

        let txt_file = TxtFile::new(path.clone(), Some("txt".to_string()));
        let text = txt_file.to_text().await.unwrap();
        assert_eq!(text, "plain text content");

        assert_eq!(txt_file.path(), path);
        assert_eq!(txt_file.extension(), Some("txt"));
    }

    #[tokio::test]
    async fn test_txt_file_empty() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        let txt_file = TxtFile::new(path, Some("txt".to_string()));
        let text = txt_file.to_text().await.unwrap();
        assert_eq!(text, "");
    }
}
