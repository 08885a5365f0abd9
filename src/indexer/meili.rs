use crate::indexer::VectorIndex;
use crate::models::{FileMeta, ScoredChunk};
use anyhow::{Context, Result};
use meilisearch_sdk::{client::Client, indexes::Index, search::SearchResults};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

/// Chunk document structure for Meilisearch
#[derive(Debug, Serialize, Deserialize)]
pub struct ChunkDocument {
    id: String, // Hash(file_hash + chunk_index) - stable across re-ingests of unchanged content
    path: String,
    file_hash: String, // Blake3 hash of source file content for change detection
    chunk_index: usize,
    text: String,
    #[serde(rename = "_vectors", default, skip_serializing_if = "Option::is_none")]
    vectors: Option<ChunkVectors>,
}

/// User-provided vector payload under the index's `default` embedder
#[derive(Debug, Serialize, Deserialize)]
pub struct ChunkVectors {
    default: Vec<f32>,
}

/// Generate a chunk document ID from the source file hash and chunk position
pub(crate) fn generate_chunk_id(file_hash: &str, chunk_index: usize) -> String {
    let combined = format!("{}:{}", file_hash, chunk_index);
    let hash = blake3::hash(combined.as_bytes());
    format!("chunk_{}", &hash.to_hex()[..32])
}

/// Meilisearch implementation of the VectorIndex trait
pub struct MeilisearchIndex {
    client: Client,
    index: Index,
    base_url: String,
    api_key: Option<String>,
    semantic_ratio: f32,
}

impl MeilisearchIndex {
    /// Create a new Meilisearch vector index.
    ///
    /// Ensures the index exists with `id` as primary key (recreating it when
    /// an existing index disagrees) and configures a user-provided embedder
    /// of `dimensions` under the name `default`.
    pub async fn new(
        url: &str,
        api_key: Option<&str>,
        index_name: &str,
        dimensions: usize,
        semantic_ratio: f32,
    ) -> Result<Self> {
        let client = if let Some(key) = api_key {
            Client::new(url, Some(key.to_string()))?
        } else {
            Client::new(url, None::<String>)?
        };

        // Check if index exists and verify its primary key
        let needs_recreation = Self::check_index_primary_key(url, api_key, index_name).await?;

        if needs_recreation {
            eprintln!(
                "Index '{}' has incorrect primary key. Recreating with 'id' as primary key...",
                index_name
            );
            let _ = client.delete_index(index_name).await;
            client
                .create_index(index_name, Some("id"))
                .await
                .context("Failed to create index with 'id' as primary key")?;
        } else {
            let create_result = client.create_index(index_name, Some("id")).await;

            // Ignore error if index already exists with correct primary key
            if let Err(e) = create_result {
                let error_msg = e.to_string();
                if !error_msg.contains("already exists") && !error_msg.contains("Index already exists")
                {
                    return Err(e).context("Failed to create index");
                }
            }
        }

        let index = client.index(index_name);

        let meili = Self {
            client,
            index,
            base_url: url.trim_end_matches('/').to_string(),
            api_key: api_key.map(|k| k.to_string()),
            semantic_ratio: semantic_ratio.clamp(0.0, 1.0),
        };

        meili.configure_embedder(index_name, dimensions).await?;

        Ok(meili)
    }

    /// Check if index exists and if its primary key is correct
    /// Returns true if index needs to be recreated (wrong primary key)
    async fn check_index_primary_key(
        url: &str,
        api_key: Option<&str>,
        index_name: &str,
    ) -> Result<bool> {
        let client = reqwest::Client::new();
        let url = url.trim_end_matches('/');
        let endpoint = format!("{}/indexes/{}", url, index_name);

        let mut request = client.get(&endpoint);
        if let Some(key) = api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await;

        match response {
            Ok(resp) => {
                if resp.status().is_success() {
                    let index_info: Value =
                        resp.json().await.context("Failed to parse index info")?;
                    let primary_key = index_info
                        .get("primaryKey")
                        .and_then(|v| v.as_str())
                        .or_else(|| index_info.get("primary_key").and_then(|v| v.as_str()));

                    Ok(primary_key != Some("id"))
                } else if resp.status() == 404 {
                    // Index doesn't exist, we'll create it
                    Ok(false)
                } else {
                    Ok(true)
                }
            }
            Err(_) => {
                // Network error, assume we need to recreate
                Ok(true)
            }
        }
    }

    /// Configure the user-provided embedder through the REST settings
    /// endpoint (the SDK does not cover embedder settings)
    async fn configure_embedder(&self, index_name: &str, dimensions: usize) -> Result<()> {
        let endpoint = format!("{}/indexes/{}/settings/embedders", self.base_url, index_name);

        let body = json!({
            "default": {
                "source": "userProvided",
                "dimensions": dimensions,
            }
        });

        let client = reqwest::Client::new();
        let mut request = client.patch(&endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .send()
            .await
            .context("Failed to configure Meilisearch embedder")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Meilisearch embedder settings returned error {}: {}",
                status,
                error_text
            );
        }

        Ok(())
    }

    /// Get a reference to the underlying index
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Fetch all chunk documents (without vectors), up to the listing cap
    async fn all_documents(&self) -> Result<Vec<ChunkDocument>> {
        let search_results: SearchResults<ChunkDocument> = self
            .index
            .search()
            .with_query("")
            .with_limit(10000)
            .execute()
            .await
            .context("Failed to list indexed documents")?;

        Ok(search_results.hits.into_iter().map(|hit| hit.result).collect())
    }
}

#[async_trait::async_trait]
impl VectorIndex for MeilisearchIndex {
    async fn index_chunks(
        &self,
        file: &FileMeta,
        chunks: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<usize> {
        if chunks.len() != embeddings.len() {
            anyhow::bail!(
                "Chunk/embedding count mismatch: {} chunks, {} embeddings",
                chunks.len(),
                embeddings.len()
            );
        }
        if chunks.is_empty() {
            return Ok(0);
        }

        let path_str = file.path.to_string_lossy().to_string();
        let docs: Vec<ChunkDocument> = chunks
            .iter()
            .zip(embeddings.iter())
            .enumerate()
            .map(|(chunk_index, (text, embedding))| ChunkDocument {
                id: generate_chunk_id(&file.hash, chunk_index),
                path: path_str.clone(),
                file_hash: file.hash.clone(),
                chunk_index,
                text: text.clone(),
                vectors: Some(ChunkVectors {
                    default: embedding.clone(),
                }),
            })
            .collect();

        // add_documents with the same ID updates the existing document
        self.index
            .add_documents(&docs, Some("id"))
            .await
            .context("Failed to add chunk documents to Meilisearch")?;

        Ok(docs.len())
    }

    async fn search(
        &self,
        query: &str,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let search_results: SearchResults<ChunkDocument> = self
            .index
            .search()
            .with_query(query)
            .with_vector(query_embedding)
            .with_hybrid("default", self.semantic_ratio)
            .with_limit(top_k)
            .with_show_ranking_score(true)
            .execute()
            .await
            .context("Failed to run similarity search")?;

        let results = search_results
            .hits
            .into_iter()
            .map(|hit| {
                let score = hit.ranking_score.unwrap_or(0.0) as f32;
                let doc = hit.result;
                ScoredChunk::new(
                    doc.text,
                    std::path::PathBuf::from(doc.path),
                    doc.chunk_index,
                    score,
                )
            })
            .collect();

        Ok(results)
    }

    async fn document_count(&self) -> Result<u64> {
        let stats = self
            .index
            .get_stats()
            .await
            .context("Failed to get index stats")?;
        Ok(stats.number_of_documents as u64)
    }

    async fn delete_by_path(&self, path: &std::path::Path) -> Result<usize> {
        let path_str = path.to_string_lossy().to_string();

        // Search for candidate documents, then match the path exactly
        let search_results: SearchResults<ChunkDocument> = self
            .index
            .search()
            .with_query(&path_str)
            .with_limit(1000)
            .execute()
            .await
            .context("Failed to search for documents to delete")?;

        let to_delete: Vec<String> = search_results
            .hits
            .into_iter()
            .filter(|hit| hit.result.path == path_str)
            .map(|hit| hit.result.id)
            .collect();

        if to_delete.is_empty() {
            return Ok(0);
        }

        self.index
            .delete_documents(&to_delete)
            .await
            .context("Failed to delete documents by path")?;

        Ok(to_delete.len())
    }

    async fn delete_missing_files(&self, existing_paths: &HashSet<String>) -> Result<usize> {
        let documents = self.all_documents().await?;

        let to_delete: Vec<String> = documents
            .into_iter()
            .filter(|doc| !existing_paths.contains(&doc.path))
            .map(|doc| doc.id)
            .collect();

        if to_delete.is_empty() {
            return Ok(0);
        }

        self.index
            .delete_documents(&to_delete)
            .await
            .context("Failed to delete missing files from index")?;

        Ok(to_delete.len())
    }

    async fn indexed_file_hashes(&self) -> Result<HashMap<String, String>> {
        let documents = self.all_documents().await?;

        Ok(documents
            .into_iter()
            .map(|doc| (doc.path, doc.file_hash))
            .collect())
    }

    async fn clear(&self) -> Result<()> {
        self.index
            .delete_all_documents()
            .await
            .context("Failed to clear index")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn test_file_meta(hash: &str) -> FileMeta {
        let now = SystemTime::now();
        FileMeta::new(
            PathBuf::from("/docs/policy.md"),
            64,
            Some("md".to_string()),
            now,
            now,
            hash.to_string(),
        )
    }

    #[test]
    fn test_generate_chunk_id_stable() {
        let id1 = generate_chunk_id("hash123", 0);
        let id2 = generate_chunk_id("hash123", 0);
        assert_eq!(id1, id2);
        assert!(id1.starts_with("chunk_"));
    }

    #[test]
    fn test_generate_chunk_id_varies_by_index_and_hash() {
        assert_ne!(generate_chunk_id("hash123", 0), generate_chunk_id("hash123", 1));
        assert_ne!(generate_chunk_id("hash123", 0), generate_chunk_id("hash456", 0));
    }

    #[test]
    fn test_chunk_document_serializes_vectors_field() {
        let doc = ChunkDocument {
            id: "chunk_abc".to_string(),
            path: "/docs/policy.md".to_string(),
            file_hash: "hash123".to_string(),
            chunk_index: 1,
            text: "dental cash back is 120".to_string(),
            vectors: Some(ChunkVectors {
                default: vec![0.1, 0.2],
            }),
        };

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["_vectors"]["default"][0], 0.1);
        assert_eq!(value["chunk_index"], 1);
    }

    #[test]
    fn test_chunk_document_deserializes_without_vectors() {
        // Search hits come back without the _vectors payload
        let doc: ChunkDocument = serde_json::from_str(
            r#"{"id":"chunk_abc","path":"/docs/policy.md","file_hash":"h","chunk_index":0,"text":"t"}"#,
        )
        .unwrap();
        assert!(doc.vectors.is_none());
    }

    // Note: These tests require a running Meilisearch instance

    #[tokio::test]
    #[ignore]
    async fn test_meilisearch_index_creation() {
        let index = MeilisearchIndex::new("http://127.0.0.1:7700", None, "test_chunks", 4, 1.0)
            .await
            .unwrap();
        assert!(index.index().uid == "test_chunks");
    }

    #[tokio::test]
    #[ignore]
    async fn test_meilisearch_index_and_search_roundtrip() {
        let index = MeilisearchIndex::new("http://127.0.0.1:7700", None, "test_chunks", 4, 1.0)
            .await
            .unwrap();

        let file = test_file_meta("hash123");
        let chunks = vec!["dental cash back is 120".to_string()];
        let embeddings = vec![vec![0.1, 0.2, 0.3, 0.4]];
        let indexed = index.index_chunks(&file, &chunks, &embeddings).await.unwrap();
        assert_eq!(indexed, 1);

        let results = index
            .search("dental", &[0.1, 0.2, 0.3, 0.4], 2)
            .await
            .unwrap();
        assert!(!results.is_empty());
    }
}
