use crate::file::SemanticSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

/// CSV file handler
pub struct CsvFile {
    path: std::path::PathBuf,
    extension: Option<String>,
}

impl CsvFile {
    pub fn new(path: std::path::PathBuf, extension: Option<String>) -> Self {
        Self { path, extension }
    }
}

#[async_trait]
impl SemanticSource for CsvFile {
    async fn to_text_impl(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read CSV file: {}", self.path.display()))
    }

    async fn to_metadata(&self) -> Result<Option<Value>> {
        let path = self.path.clone();
        let metadata = tokio::task::spawn_blocking(move || -> Result<Option<Value>> {
            use std::fs::File;
            use std::io::BufReader;

            let file = File::open(&path)
                .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

            let reader = BufReader::new(file);
            let mut rdr = csv::Reader::from_reader(reader);

            let mut meta_map = serde_json::Map::new();

            if let Ok(headers) = rdr.headers() {
                let header_list: Vec<String> =
                    headers.iter().map(|h| h.to_string()).collect();

                if !header_list.is_empty() {
                    meta_map.insert(
                        "column_count".to_string(),
                        Value::Number(header_list.len().into()),
                    );
                    meta_map.insert(
                        "headers".to_string(),
                        Value::Array(header_list.into_iter().map(Value::String).collect()),
                    );
                }
            }

            let row_count = rdr.records().filter(|r| r.is_ok()).count();
            meta_map.insert("row_count".to_string(), Value::Number(row_count.into()));

            Ok(Some(Value::Object(meta_map)))
        })
        .await??;

        Ok(metadata)
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
    async fn test_csv_file_extraction() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        std::fs::write(&path, "name,amount\ndental,120\nvision,80\n").unwrap();

        let csv_file = CsvFile::new(path.clone(), Some("csv".to_string()));
        let text = csv_file.to_text().await.unwrap();
        assert!(text.contains("dental,120"));
    }

    #[tokio::test]
    async fn test_csv_file_metadata() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        std::fs::write(&path, "name,amount\ndental,120\nvision,80\n").unwrap();

        let csv_file = CsvFile::new(path, Some("csv".to_string()));
        let metadata = csv_file.to_metadata().await.unwrap().unwrap();

        assert_eq!(metadata["column_count"], 2);
        assert_eq!(metadata["row_count"], 2);
        assert_eq!(metadata["headers"][0], "name");
    }
}
