use crate::file::SemanticSource;
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Fallback handler for unrecognized extensions.
///
/// Reads the file as text when it looks mostly printable, returns empty text
/// for binary content so ingestion skips it.
pub struct GenericFile {
    path: std::path::PathBuf,
    extension: Option<String>,
}

impl GenericFile {
    pub fn new(path: std::path::PathBuf, extension: Option<String>) -> Self {
        Self { path, extension }
    }
}

#[async_trait]
impl SemanticSource for GenericFile {
    async fn to_text_impl(&self) -> Result<String> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(_) => return Ok(String::new()),
        };

        if bytes.is_empty() {
            return Ok(String::new());
        }

        let printable_count = bytes
            .iter()
            .filter(|&&b| (32..=126).contains(&b) || b == 9 || b == 10 || b == 13)
            .count();

        if printable_count * 100 / bytes.len() > 80 {
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        } else {
            // Mostly binary, skip
            Ok(String::new())
        }
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
    async fn test_generic_file_reads_printable_content() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        std::fs::write(&path, "notes without an extension").unwrap();

        let generic_file = GenericFile::new(path.clone(), None);
        let text = generic_file.to_text().await.unwrap();
        assert_eq!(text, "notes without an extension");
        assert_eq!(generic_file.extension(), None);
    }

    #[tokio::test]
    async fn test_generic_file_skips_binary_content() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        std::fs::write(&path, [0u8, 1, 2, 3, 255, 254, 253, 7, 0, 128]).unwrap();

        let generic_file = GenericFile::new(path, Some("bin".to_string()));
        let text = generic_file.to_text().await.unwrap();
        assert_eq!(text, "");
    }
}
