use crate::models::{FileMeta, ScoredChunk};
use anyhow::Result;
use std::collections::{HashMap, HashSet};

/// Trait for vector indexes that store embedded document chunks and
/// answer similarity queries over them
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Upsert one document per chunk of a file. `chunks` and `embeddings`
    /// must have the same length. Returns the number of chunks indexed.
    async fn index_chunks(
        &self,
        file: &FileMeta,
        chunks: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<usize>;

    /// Nearest-chunk search for a query and its embedding
    async fn search(
        &self,
        query: &str,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>>;

    /// Number of chunk documents currently indexed
    async fn document_count(&self) -> Result<u64>;

    /// Remove all chunks belonging to a source file path.
    /// Returns how many documents were deleted.
    async fn delete_by_path(&self, path: &std::path::Path) -> Result<usize>;

    /// Remove chunks whose source files are not in `existing_paths`.
    /// Returns how many documents were deleted.
    async fn delete_missing_files(&self, existing_paths: &HashSet<String>) -> Result<usize>;

    /// Map of indexed source file path -> content hash, for change detection
    async fn indexed_file_hashes(&self) -> Result<HashMap<String, String>>;

    /// Remove every document from the index
    async fn clear(&self) -> Result<()>;
}
