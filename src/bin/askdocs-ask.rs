use anyhow::{Context, Result};
use askdocs::{
    config::Config,
    embeddings::{self, EmbeddingProvider},
    indexer::MeilisearchIndex,
    llm::GroqProvider,
    workflow::RagWorkflow,
};
use clap::Parser;
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "askdocs-ask")]
#[command(about = "Ask a question about your indexed documents and stream the answer")]
#[command(version)]
struct Cli {
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
    if let Some(model) = cli.model {
        config.groq.model = model;
    }

    let embeddings: Arc<dyn EmbeddingProvider> =
        Arc::from(embeddings::provider_from_config(&config));
    let index = Arc::new(
        MeilisearchIndex::new(
            &config.meilisearch.url,
            config.meilisearch_api_key().as_deref(),
            &config.meilisearch.index_name,
            embeddings.dimension(),
            config.retrieval.semantic_ratio,
        )
        .await
        .context("Failed to open Meilisearch index")?,
    );
    let llm = Arc::new(GroqProvider::from_config(&config)?);

    let workflow = RagWorkflow::new(index, embeddings, &config).with_llm(llm);

    match workflow.run_query(&cli.query).await? {
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

    Ok(())
}
