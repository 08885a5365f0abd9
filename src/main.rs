use anyhow::{Context, Result};
use askdocs::{
    config::Config,
    embeddings::{self, EmbeddingProvider},
    indexer::{MeilisearchIndex, VectorIndex},
    llm::GroqProvider,
    workflow::RagWorkflow,
};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "askdocs")]
#[command(about = "Ask your documents — retrieval-augmented question answering over a folder of files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a directory of documents into the vector index
    Ingest {
        /// Directory to ingest
        #[arg(value_name = "DIR")]
        dir: PathBuf,
        /// Meilisearch URL (overrides config)
        #[arg(long)]
        meili_url: Option<String>,
        /// Meilisearch API key (overrides config and env)
        #[arg(long)]
        meili_key: Option<String>,
        /// Meilisearch index name (overrides config)
        #[arg(long)]
        index_name: Option<String>,
        /// Delete existing chunks before ingesting
        #[arg(long)]
        fresh: bool,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Ask a question and stream the answer
    Ask {
        /// The question to answer
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
        /// Groq model name (overrides config)
        #[arg(long)]
        model: Option<String>,
    },
    /// Retrieve the nearest passages for a query without answering it
    Search {
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
    },
}

/// Apply CLI overrides to the loaded configuration
fn apply_overrides(
    config: &mut Config,
    meili_url: Option<String>,
    meili_key: Option<String>,
    index_name: Option<String>,
) {
    if let Some(url) = meili_url {
        config.meilisearch.url = url;
    }
    if let Some(key) = meili_key {
        config.meilisearch.api_key = Some(key);
    }
    if let Some(name) = index_name {
        config.meilisearch.index_name = name;
    }
}

async fn open_index(
    config: &Config,
    provider: &dyn EmbeddingProvider,
) -> Result<MeilisearchIndex> {
    MeilisearchIndex::new(
        &config.meilisearch.url,
        config.meilisearch_api_key().as_deref(),
        &config.meilisearch.index_name,
        provider.dimension(),
        config.retrieval.semantic_ratio,
    )
    .await
    .context("Failed to open Meilisearch index")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration (falls back to defaults if not found)
    let mut config = Config::load().unwrap_or_default();

    match cli.command {
        Commands::Ingest {
            dir,
            meili_url,
            meili_key,
            index_name,
            fresh,
            yes,
        } => {
            apply_overrides(&mut config, meili_url, meili_key, index_name);
            println!("Ingesting directory: {}", dir.display());

            let embeddings: Arc<dyn EmbeddingProvider> =
                Arc::from(embeddings::provider_from_config(&config));
            let index = Arc::new(open_index(&config, embeddings.as_ref()).await?);

            if fresh {
                let count = index.document_count().await?;
                if count > 0 {
                    if !yes {
                        use dialoguer::Confirm;
                        let proceed = Confirm::new()
                            .with_prompt(format!(
                                "Index '{}' contains {} chunks. Delete them and re-ingest?",
                                config.meilisearch.index_name, count
                            ))
                            .default(false)
                            .interact()
                            .context("Failed to read user input")?;
                        if !proceed {
                            println!("Cancelled.");
                            return Ok(());
                        }
                    }
                    index.clear().await?;
                    println!("Cleared {} existing chunks.", count);
                }
            }

            let workflow = RagWorkflow::new(index, embeddings, &config);
            let stats = workflow.ingest(&dir).await?;

            println!(
                "\nIngested {} of {} files ({} chunks), {} unchanged, {} skipped, {} stale chunks pruned",
                stats.files_indexed,
                stats.files_seen,
                stats.chunks_indexed,
                stats.files_unchanged,
                stats.files_skipped,
                stats.chunks_deleted,
            );
        }
        Commands::Ask {
            query,
            meili_url,
            meili_key,
            index_name,
            model,
        } => {
            apply_overrides(&mut config, meili_url, meili_key, index_name);
            if let Some(model) = model {
                config.groq.model = model;
            }

            let embeddings: Arc<dyn EmbeddingProvider> =
                Arc::from(embeddings::provider_from_config(&config));
            let index = Arc::new(open_index(&config, embeddings.as_ref()).await?);
            let llm = Arc::new(GroqProvider::from_config(&config)?);

            let workflow = RagWorkflow::new(index, embeddings, &config).with_llm(llm);

            match workflow.run_query(&query).await? {
                Some(mut stream) => {
                    while let Some(token) = stream.next().await {
                        print!("{}", token?);
                        std::io::stdout().flush()?;
                    }
                    println!();
                }
                None => {
                    println!("No answer produced.");
                }
            }
        }
        Commands::Search {
            query,
            meili_url,
            meili_key,
            index_name,
            top_k,
        } => {
            apply_overrides(&mut config, meili_url, meili_key, index_name);
            println!("Searching for: {}", query);

            let embeddings = embeddings::provider_from_config(&config);
            let index = open_index(&config, embeddings.as_ref()).await?;

            let embedding = embeddings
                .compute_embedding(&query)
                .await
                .context("Failed to embed query")?;
            let top_k = top_k.unwrap_or(config.retrieval.top_k);
            let results = index.search(&query, &embedding, top_k).await?;

            println!("\nFound {} passages:", results.len());
            for (i, chunk) in results.iter().enumerate() {
                println!(
                    "{}. [{:.3}] {} (chunk {})",
                    i + 1,
                    chunk.score,
                    chunk.path.display(),
                    chunk.chunk_index
                );
                println!("   {}", preview(&chunk.text));
            }
        }
    }

    Ok(())
}

/// First line of a passage, capped for terminal output
fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.len() <= 120 {
        return line.to_string();
    }
    let mut end = 120;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &line[..end])
}
