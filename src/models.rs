use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// Metadata about a file in the filesystem
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileMeta {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// File extension (without the dot)
    pub extension: Option<String>,
    /// Creation time
    pub created_at: SystemTime,
    /// Last modification time
    pub updated_at: SystemTime,
    /// Blake3 hash of file contents
    pub hash: String,
}

impl FileMeta {
    /// Create a new FileMeta instance
    pub fn new(
        path: PathBuf,
        size: u64,
        extension: Option<String>,
        created_at: SystemTime,
        updated_at: SystemTime,
        hash: String,
    ) -> Self {
        Self {
            path,
            size,
            extension,
            created_at,
            updated_at,
            hash,
        }
    }

    /// Build a FileMeta by stat-ing and hashing a file on disk
    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let extension = crate::utils::get_extension(path);
        let hash = crate::utils::compute_file_hash(path)?;
        let created_at = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or_else(|_| SystemTime::now());
        let updated_at = metadata
            .modified()
            .or_else(|_| metadata.created())
            .unwrap_or_else(|_| SystemTime::now());

        Ok(Self::new(
            path.to_path_buf(),
            metadata.len(),
            extension,
            created_at,
            updated_at,
            hash,
        ))
    }
}

/// A passage retrieved from the index, with its provenance and relevance score.
///
/// The unit that flows through the query pipeline: retrieval produces these
/// with index ranking scores, reranking replaces the scores with LLM
/// relevance scores, synthesis consumes their text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    /// Passage text as stored in the index
    pub text: String,
    /// Path of the source file this passage was extracted from
    pub path: PathBuf,
    /// Position of the passage within its source file (0-based)
    pub chunk_index: usize,
    /// Relevance score; index ranking score in [0,1] after retrieval,
    /// LLM choice score in [1,10] after reranking
    pub score: f32,
}

impl ScoredChunk {
    pub fn new(text: String, path: PathBuf, chunk_index: usize, score: f32) -> Self {
        Self {
            text,
            path,
            chunk_index,
            score,
        }
    }
}
