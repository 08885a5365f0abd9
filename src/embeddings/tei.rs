use crate::embeddings::EmbeddingProvider;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Text Embeddings Inference (TEI) provider from Hugging Face
/// Accepts multiple inputs per request, so chunk batches embed in one round trip
pub struct TeiEmbeddingProvider {
    base_url: String,
    dimension: AtomicUsize, // AtomicUsize allows runtime dimension correction (thread-safe)
}

impl TeiEmbeddingProvider {
    /// Create a new TEI embedding provider
    /// Default URL: http://127.0.0.1:8080
    pub fn new(base_url: Option<&str>, dimension: Option<usize>) -> Self {
        Self {
            base_url: base_url.unwrap_or("http://127.0.0.1:8080").to_string(),
            dimension: AtomicUsize::new(dimension.unwrap_or(384)), // bge-small-en-v1.5 default
        }
    }

    async fn embed_inputs(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embed", self.base_url);

        let request = TeiEmbeddingRequest {
            inputs,
            truncate: Some(true),
        };

        let client = reqwest::Client::new();
        let response = client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to connect to TEI server")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("TEI API returned error {}: {}", status, error_text);
        }

        // TEI returns an array of arrays (one embedding per input)
        let embeddings: Vec<Vec<f32>> = response
            .json()
            .await
            .context("Failed to parse TEI embedding response")?;

        if embeddings.iter().any(|e| e.is_empty()) {
            anyhow::bail!(
                "TEI returned an empty embedding (dimension 0). This usually means an input was too short or empty."
            );
        }

        if let Some(first) = embeddings.first() {
            let actual_dimension = first.len();
            let expected_dimension = self.dimension.load(Ordering::Relaxed);
            if actual_dimension != expected_dimension {
                eprintln!(
                    "Info: TEI model returned embedding dimension {} (expected {}). Updating to match actual dimension.",
                    actual_dimension, expected_dimension
                );
                self.dimension.store(actual_dimension, Ordering::Relaxed);
            }
        }

        Ok(embeddings)
    }
}

#[derive(Serialize)]
struct TeiEmbeddingRequest {
    inputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    truncate: Option<bool>,
}

#[async_trait::async_trait]
impl EmbeddingProvider for TeiEmbeddingProvider {
    async fn compute_embedding(&self, content: &str) -> Result<Vec<f32>> {
        let content = content.trim();
        if content.is_empty() {
            anyhow::bail!("Cannot generate embedding for empty content");
        }

        let mut embeddings = self.embed_inputs(vec![content.to_string()]).await?;
        if embeddings.is_empty() {
            anyhow::bail!("TEI returned empty embeddings array");
        }

        Ok(embeddings.remove(0))
    }

    /// One request for the whole batch
    async fn compute_embeddings(&self, contents: &[String]) -> Result<Vec<Vec<f32>>> {
        if contents.is_empty() {
            return Ok(Vec::new());
        }
        if contents.iter().any(|c| c.trim().is_empty()) {
            anyhow::bail!("Cannot generate embedding for empty content");
        }

        let embeddings = self.embed_inputs(contents.to_vec()).await?;
        if embeddings.len() != contents.len() {
            anyhow::bail!(
                "TEI returned {} embeddings for {} inputs",
                embeddings.len(),
                contents.len()
            );
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension.load(Ordering::Relaxed)
    }
}
