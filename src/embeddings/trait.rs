use anyhow::{Context, Result};

/// Trait for embedding providers that can compute semantic vectors from text
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Compute embedding vector for a single piece of text
    async fn compute_embedding(&self, content: &str) -> Result<Vec<f32>>;

    /// Get the dimension of embeddings produced by this provider
    fn dimension(&self) -> usize;

    /// Compute embeddings for a batch of texts (one vector per input).
    ///
    /// The default implementation embeds sequentially; providers whose API
    /// accepts multiple inputs per request override this with one round trip.
    async fn compute_embeddings(&self, contents: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(contents.len());
        for (i, content) in contents.iter().enumerate() {
            let embedding = self
                .compute_embedding(content)
                .await
                .with_context(|| format!("Failed to embed chunk {}/{}", i + 1, contents.len()))?;
            embeddings.push(embedding);
        }
        Ok(embeddings)
    }
}
