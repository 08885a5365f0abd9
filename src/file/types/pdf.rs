use crate::file::SemanticSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

/// PDF file handler
pub struct PdfFile {
    path: std::path::PathBuf,
    extension: Option<String>,
}

impl PdfFile {
    pub fn new(path: std::path::PathBuf, extension: Option<String>) -> Self {
        Self { path, extension }
    }
}

#[async_trait]
impl SemanticSource for PdfFile {
    async fn to_text_impl(&self) -> Result<String> {
        let path = self.path.clone();
        let text = tokio::task::spawn_blocking(move || -> Result<String> {
            use lopdf::Document;

            // Suppress stderr warnings from pdf-extract by using lopdf directly
            let doc = Document::load(&path)
                .with_context(|| format!("Failed to load PDF: {}", path.display()))?;

            let mut text_content = String::new();

            for page_num in doc.get_pages().keys() {
                if let Ok(page_text) = doc.extract_text(&[*page_num]) {
                    text_content.push_str(&page_text);
                    text_content.push('\n');
                }
            }

            if text_content.trim().is_empty() {
                // Fallback: try pdf-extract if lopdf doesn't extract text
                match pdf_extract::extract_text(&path) {
                    Ok(text) => Ok(text.trim().to_string()),
                    Err(_) => Ok(String::new()),
                }
            } else {
                Ok(text_content.trim().to_string())
            }
        })
        .await??;

        Ok(text)
    }

    async fn to_metadata(&self) -> Result<Option<Value>> {
        let path = self.path.clone();
        let metadata_result = tokio::task::spawn_blocking(move || {
            use lopdf::Document;

            let doc = match Document::load(&path) {
                Ok(doc) => doc,
                Err(_) => return None,
            };

            let mut meta_map = serde_json::Map::new();

            if let Ok(info_dict_obj) = doc.trailer.get(b"Info") {
                if let Ok(info_dict) = info_dict_obj.as_dict() {
                    let extract_string = |key: &str| -> Option<String> {
                        if let Ok(lopdf::Object::String(ref bytes, _)) =
                            info_dict.get(key.as_bytes())
                        {
                            String::from_utf8(bytes.clone()).ok()
                        } else {
                            None
                        }
                    };

                    if let Some(title) = extract_string("Title") {
                        meta_map.insert("title".to_string(), Value::String(title));
                    }
                    if let Some(author) = extract_string("Author") {
                        meta_map.insert("author".to_string(), Value::String(author));
                    }
                    if let Some(subject) = extract_string("Subject") {
                        meta_map.insert("subject".to_string(), Value::String(subject));
                    }
                }
            }

            meta_map.insert(
                "page_count".to_string(),
                Value::Number(doc.get_pages().len().into()),
            );

            Some(Value::Object(meta_map))
        })
        .await?;

        Ok(metadata_result)
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

    #[tokio::test]
    async fn test_pdf_file_missing() {
        let pdf_file = PdfFile::new(
            std::path::PathBuf::from("/nonexistent/file.pdf"),
            Some("pdf".to_string()),
        );
        // Missing file surfaces as an error from the loader
        assert!(pdf_file.to_text().await.is_err());
    }

    #[tokio::test]
    async fn test_pdf_metadata_missing_file_is_none() {
        let pdf_file = PdfFile::new(
            std::path::PathBuf::from("/nonexistent/file.pdf"),
            Some("pdf".to_string()),
        );
        let metadata = pdf_file.to_metadata().await.unwrap();
        assert!(metadata.is_none());
    }
}
