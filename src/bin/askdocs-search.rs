use anyhow::{Context, Result};
use askdocs::{
    config::Config,
    embeddings::{self, EmbeddingProvider},
    indexer::{MeilisearchIndex, VectorIndex},
};
use clap::Parser;

#[derive(Parser)]
#[command(name = "askdocs-search")]
#[command(about = "Retrieve the nearest passages for a query without answering it")]
#[command(version)]
struct Cli {
    /// Search query
    #[arg(value_name = "QUERY")]
    query: String,

    /// Meilisearch URL (overrides config)
    #[arg(long)]
    meili_url: Option<String>,

    /// Meilisearch API key (overrides config and env)
    #[arg(long)]
    meili_key: Option<String>,

    /// Meilisearch index name (overrides config)
    #[arg(long)]
    index_name: Option<String>,

    /// How many passages to return (overrides config)
    #[arg(long)]
    top_k: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load().unwrap_or_default();

    if let Some(url) = cli.meili_url {
        config.meilisearch.url = url;
    }
    if let Some(key) = cli.meili_key {
        config.meilisearch.api_key = Some(key);
    }
    if let Some(name) = cli.index_name {
        config.meilisearch.index_name = name;
    }

    println!("Searching for: {}", cli.query);

    let embeddings = embeddings::provider_from_config(&config);
    let index = MeilisearchIndex::new(
        &config.meilisearch.url,
        config.meilisearch_api_key().as_deref(),
        &config.meilisearch.index_name,
        embeddings.dimension(),
        config.retrieval.semantic_ratio,
    )
    .await
    .context("Failed to open Meilisearch index")?;

    let embedding = embeddings
        .compute_embedding(&cli.query)
        .await
        .context("Failed to embed query")?;
    let top_k = cli.top_k.unwrap_or(config.retrieval.top_k);
    let results = index.search(&cli.query, &embedding, top_k).await?;

    println!("\nFound {} passages:", results.len());
    for (i, chunk) in results.iter().enumerate() {
        println!(
            "{}. [{:.3}] {} (chunk {})",
            i + 1,
            chunk.score,
            chunk.path.display(),
            chunk.chunk_index
        );
        let first_line = chunk.text.lines().next().unwrap_or("");
        if first_line.len() <= 120 {
            println!("   {}", first_line);
        } else {
            let mut end = 120;
            while !first_line.is_char_boundary(end) {
                end -= 1;
            }
            println!("   {}...", &first_line[..end]);
        }
    }

    Ok(())
}
