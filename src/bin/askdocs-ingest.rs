use anyhow::{Context, Result};
use askdocs::{
    config::Config,
    embeddings::{self, EmbeddingProvider},
    file::FileFactory,
    indexer::{MeilisearchIndex, VectorIndex},
    models::FileMeta,
    utils,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "askdocs-ingest")]
#[command(about = "Ingest a directory of documents into the vector index")]
#[command(version)]
struct Cli {
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

    println!("Ingesting directory: {}", cli.dir.display());
    if !cli.dir.is_dir() {
        anyhow::bail!("Not a directory: {}", cli.dir.display());
    }

    // Initialize embedding provider for semantic retrieval
    let embedding_provider: Arc<dyn EmbeddingProvider> =
        Arc::from(embeddings::provider_from_config(&config));
    if config.embedding_provider == "tei" {
        println!("📊 Using TEI embeddings ({} dimensions)", config.tei.dims);
    } else {
        println!(
            "📊 Generating embeddings with Ollama model: {} ({} dimensions)",
            config.ollama.model, config.ollama.dims
        );
    }

    let index = Arc::new(
        MeilisearchIndex::new(
            &config.meilisearch.url,
            config.meilisearch_api_key().as_deref(),
            &config.meilisearch.index_name,
            embedding_provider.dimension(),
            config.retrieval.semantic_ratio,
        )
        .await
        .context("Failed to open Meilisearch index")?,
    );

    if cli.fresh {
        let count = index.document_count().await?;
        if count > 0 {
            if !cli.yes {
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
            println!("✓ Cleared {} existing chunks", count);
        }
    }

    // Process files as we discover them
    println!("📂 Scanning and indexing files...");

    use futures::stream::StreamExt;

    let max_concurrent = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(8)
        .min(16);

    println!(
        "🚀 Starting to process files (max {} concurrent operations)...",
        max_concurrent
    );

    // Create progress bar (will update as we discover files)
    let pb = ProgressBar::new(0); // Start with unknown count
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos} files processed ({msg})")
            .unwrap()
            .progress_chars("#>-"),
    );

    // Thread-safe counters
    let indexed_count = Arc::new(std::sync::Mutex::new(0usize));
    let chunk_count = Arc::new(std::sync::Mutex::new(0usize));
    let unchanged_count = Arc::new(std::sync::Mutex::new(0usize));
    let skipped_count = Arc::new(std::sync::Mutex::new(0usize));
    let semaphore = Arc::new(tokio::sync::Semaphore::new(max_concurrent));

    // Stream file paths as we discover them using a channel, so processing
    // starts before the walk finishes
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    let dir_clone = cli.dir.clone();
    tokio::spawn(async move {
        tokio::task::spawn_blocking(move || {
            for entry in WalkDir::new(&dir_clone).into_iter().filter_entry(|entry| {
                !(entry.file_type().is_dir()
                    && entry
                        .file_name()
                        .to_str()
                        .map(|name| askdocs::constants::SKIP_DIRECTORIES.contains(&name))
                        .unwrap_or(false))
            }) {
                match entry {
                    Ok(e) => {
                        if e.file_type().is_file() && tx.send(e.path().to_path_buf()).is_err() {
                            break; // Receiver dropped, stop walking
                        }
                    }
                    Err(e) => {
                        eprintln!("Warning: Error accessing entry: {}", e);
                    }
                }
            }
        })
        .await
        .ok();
    });

    // Known hashes let unchanged files skip the embedding round trip
    let indexed_hashes = Arc::new(index.indexed_file_hashes().await?);

    use tokio_stream::wrappers::UnboundedReceiverStream;
    let rx_stream = UnboundedReceiverStream::new(rx);

    let seen_paths = Arc::new(std::sync::Mutex::new(HashSet::new()));

    let mut stream = rx_stream
        .map(|path| {
            let semaphore = semaphore.clone();
            let index = index.clone();
            let embedding_provider = embedding_provider.clone();
            let indexed_hashes = indexed_hashes.clone();
            let pb = pb.clone();
            let indexed_count = indexed_count.clone();
            let chunk_count = chunk_count.clone();
            let unchanged_count = unchanged_count.clone();
            let skipped_count = skipped_count.clone();
            let seen_paths = seen_paths.clone();
            let chunk_chars = config.ingest.chunk_chars;
            let chunk_overlap = config.ingest.chunk_overlap_chars;

            async move {
                let _permit = semaphore.acquire().await.unwrap();

                seen_paths
                    .lock()
                    .unwrap()
                    .insert(path.to_string_lossy().to_string());

                let file_name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown")
                    .to_string();
                pb.set_message(format!("Indexing: {}", file_name));
                pb.inc_length(1);

                // Compute file metadata (hash, etc.) in a blocking task
                let file_meta = match tokio::task::spawn_blocking({
                    let path = path.clone();
                    move || FileMeta::from_path(&path)
                })
                .await
                {
                    Ok(Ok(meta)) => meta,
                    Ok(Err(e)) => {
                        eprintln!("Warning: Failed to process {}: {}", file_name, e);
                        *skipped_count.lock().unwrap() += 1;
                        pb.inc(1);
                        return;
                    }
                    Err(e) => {
                        eprintln!("Warning: Task error: {}", e);
                        *skipped_count.lock().unwrap() += 1;
                        pb.inc(1);
                        return;
                    }
                };

                let path_str = file_meta.path.to_string_lossy().to_string();
                if indexed_hashes.get(&path_str) == Some(&file_meta.hash) {
                    *unchanged_count.lock().unwrap() += 1;
                    pb.inc(1);
                    return;
                }

                let source = FileFactory::create_from_meta(&file_meta);
                let text = match source.to_text().await {
                    Ok(t) => t,
                    Err(e) => {
                        eprintln!("Warning: Failed to extract text from {}: {}", file_name, e);
                        *skipped_count.lock().unwrap() += 1;
                        pb.inc(1);
                        return;
                    }
                };

                let chunks = utils::chunk_text(&text, chunk_chars, chunk_overlap);
                if chunks.is_empty() {
                    *skipped_count.lock().unwrap() += 1;
                    pb.inc(1);
                    return;
                }

                // A changed file replaces its previous chunks
                if indexed_hashes.contains_key(&path_str) {
                    if let Err(e) = index.delete_by_path(&file_meta.path).await {
                        eprintln!(
                            "Warning: Failed to drop stale chunks for {}: {}",
                            file_name, e
                        );
                    }
                }

                let embeddings = match embedding_provider.compute_embeddings(&chunks).await {
                    Ok(embeddings) => embeddings,
                    Err(e) => {
                        eprintln!("Warning: Failed to embed {}: {}", file_name, e);
                        *skipped_count.lock().unwrap() += 1;
                        pb.inc(1);
                        return;
                    }
                };

                match index.index_chunks(&file_meta, &chunks, &embeddings).await {
                    Ok(indexed) => {
                        let mut c = indexed_count.lock().unwrap();
                        *c += 1;
                        if *c == 1 {
                            println!("  ✓ First file indexed successfully");
                        }
                        *chunk_count.lock().unwrap() += indexed;
                    }
                    Err(e) => {
                        eprintln!("Error: Failed to index {}: {}", file_name, e);
                        *skipped_count.lock().unwrap() += 1;
                    }
                }

                pb.inc(1);
            }
        })
        .buffer_unordered(max_concurrent);

    while let Some(()) = stream.next().await {}
    drop(stream);

    pb.finish_with_message("done");

    // Prune chunks whose source files no longer exist
    let seen = seen_paths.lock().unwrap().clone();
    let pruned = index.delete_missing_files(&seen).await?;

    let indexed_count = *indexed_count.lock().unwrap();
    let chunk_count = *chunk_count.lock().unwrap();
    let unchanged_count = *unchanged_count.lock().unwrap();
    let skipped_count = *skipped_count.lock().unwrap();

    println!("\n✓ Ingest complete:");
    println!("  {} files indexed ({} chunks)", indexed_count, chunk_count);
    println!("  {} files unchanged", unchanged_count);
    println!("  {} files skipped", skipped_count);
    if pruned > 0 {
        println!("  {} stale chunks pruned", pruned);
    }

    Ok(())
}
