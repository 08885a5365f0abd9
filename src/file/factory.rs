use crate::file::types::{CsvFile, GenericFile, JsonFile, MdFile, PdfFile, TxtFile};
use crate::file::SemanticSource;
use crate::models::FileMeta;
use std::path::PathBuf;
use std::sync::Arc;

/// Factory for creating SemanticSource instances based on file extension
pub struct FileFactory;

impl FileFactory {
    /// Create a SemanticSource from FileMeta
    pub fn create_from_meta(meta: &FileMeta) -> Arc<dyn SemanticSource> {
        Self::create(meta.path.clone(), meta.extension.clone())
    }

    /// Create a SemanticSource from path and extension
    pub fn create(path: PathBuf, extension: Option<String>) -> Arc<dyn SemanticSource> {
        let ext_lower = extension.as_ref().map(|s| s.to_lowercase());

        match ext_lower.as_deref() {
            Some("txt") | Some("text") => Arc::new(TxtFile::new(path, extension)),
            Some("md") | Some("markdown") => Arc::new(MdFile::new(path, extension)),
            Some("pdf") => Arc::new(PdfFile::new(path, extension)),
            Some("csv") => Arc::new(CsvFile::new(path, extension)),
            Some("json") => Arc::new(JsonFile::new(path, extension)),
            _ => Arc::new(GenericFile::new(path, extension)),
        }
    }
}
