use crate::config::Config;
use crate::constants::SKIP_DIRECTORIES;
use crate::embeddings::EmbeddingProvider;
use crate::file::FileFactory;
use crate::indexer::VectorIndex;
use crate::llm::{LlmProvider, TokenStream};
use crate::models::{FileMeta, ScoredChunk};
use crate::rerank::LlmReranker;
use crate::synthesize::CompactSynthesizer;
use crate::utils;
use anyhow::{Context, Result};
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Result of running retrieval
#[derive(Debug)]
pub struct RetrievedEvent {
    pub query: String,
    pub chunks: Vec<ScoredChunk>,
}

/// Result of running reranking on retrieved chunks
#[derive(Debug)]
pub struct RerankedEvent {
    pub query: String,
    pub chunks: Vec<ScoredChunk>,
}

/// Events passed between the query steps. Each step consumes one event kind
/// and produces the next; `run_query` dispatches them in order.
#[derive(Debug)]
pub enum WorkflowEvent {
    Retrieved(RetrievedEvent),
    Reranked(RerankedEvent),
}

/// Counters reported by an ingest run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestStats {
    /// Candidate files found under the directory
    pub files_seen: usize,
    /// Files whose chunks were (re)indexed
    pub files_indexed: usize,
    /// Files skipped because their content hash is already indexed
    pub files_unchanged: usize,
    /// Files skipped for empty/binary/unextractable content or errors
    pub files_skipped: usize,
    /// Chunk documents written to the index
    pub chunks_indexed: usize,
    /// Chunk documents pruned because their source file is gone
    pub chunks_deleted: usize,
}

enum FileOutcome {
    Indexed(usize),
    Unchanged,
    Skipped,
}

/// The four-step pipeline: ingest builds the index, then a query flows
/// retrieve -> rerank -> synthesize to a streamed answer.
pub struct RagWorkflow {
    index: Arc<dyn VectorIndex>,
    embeddings: Arc<dyn EmbeddingProvider>,
    /// Required for the rerank and synthesize steps only; ingest and
    /// retrieve run without it
    llm: Option<Arc<dyn LlmProvider>>,
    top_k: usize,
    choice_batch_size: usize,
    rerank_top_n: usize,
    max_context_chars: usize,
    chunk_chars: usize,
    chunk_overlap_chars: usize,
}

impl RagWorkflow {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embeddings: Arc<dyn EmbeddingProvider>,
        config: &Config,
    ) -> Self {
        Self {
            index,
            embeddings,
            llm: None,
            top_k: config.retrieval.top_k,
            choice_batch_size: config.rerank.choice_batch_size,
            rerank_top_n: config.rerank.top_n,
            max_context_chars: config.synthesis.max_context_chars,
            chunk_chars: config.ingest.chunk_chars,
            chunk_overlap_chars: config.ingest.chunk_overlap_chars,
        }
    }

    /// Attach the LLM provider used by the rerank and synthesize steps
    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    fn require_llm(&self) -> Result<Arc<dyn LlmProvider>> {
        self.llm
            .clone()
            .context("No LLM provider configured. Set a Groq API key to rerank and synthesize")
    }

    /// Walk a document directory and index its chunks.
    ///
    /// Unchanged files (same content hash) are skipped, chunks of deleted
    /// files are pruned, and changed files replace their previous chunks.
    /// An empty directory argument does nothing.
    pub async fn ingest(&self, dir: &Path) -> Result<IngestStats> {
        if dir.as_os_str().is_empty() {
            return Ok(IngestStats::default());
        }
        if !dir.is_dir() {
            anyhow::bail!("Not a directory: {}", dir.display());
        }

        let mut stats = IngestStats::default();

        // Collect candidate files, pruning VCS/build directories
        let files: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_entry(|entry| {
                !(entry.file_type().is_dir()
                    && entry
                        .file_name()
                        .to_str()
                        .map(|name| SKIP_DIRECTORIES.contains(&name))
                        .unwrap_or(false))
            })
            .filter_map(|entry| match entry {
                Ok(e) if e.file_type().is_file() => Some(e.path().to_path_buf()),
                Ok(_) => None,
                Err(e) => {
                    eprintln!("Warning: Error accessing entry: {}", e);
                    None
                }
            })
            .collect();

        stats.files_seen = files.len();

        // Prune chunks whose source files no longer exist
        let existing: HashSet<String> = files
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();
        stats.chunks_deleted = self.index.delete_missing_files(&existing).await?;

        let indexed_hashes = self.index.indexed_file_hashes().await?;

        let max_concurrent = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8)
            .min(16);

        let outcomes: Vec<FileOutcome> = futures::stream::iter(files)
            .map(|path| self.ingest_file(path, &indexed_hashes))
            .buffer_unordered(max_concurrent)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                FileOutcome::Indexed(chunks) => {
                    stats.files_indexed += 1;
                    stats.chunks_indexed += chunks;
                }
                FileOutcome::Unchanged => stats.files_unchanged += 1,
                FileOutcome::Skipped => stats.files_skipped += 1,
            }
        }

        Ok(stats)
    }

    /// Extract, chunk, embed, and index a single file.
    /// Failures are warnings, not errors: one bad file must not stop a run.
    async fn ingest_file(
        &self,
        path: PathBuf,
        indexed_hashes: &HashMap<String, String>,
    ) -> FileOutcome {
        // Hashing reads the whole file, keep it off the async threads
        let meta = match tokio::task::spawn_blocking({
            let path = path.clone();
            move || FileMeta::from_path(&path)
        })
        .await
        {
            Ok(Ok(meta)) => meta,
            Ok(Err(e)) => {
                eprintln!("Warning: Failed to read {}: {}", path.display(), e);
                return FileOutcome::Skipped;
            }
            Err(e) => {
                eprintln!("Warning: Task error for {}: {}", path.display(), e);
                return FileOutcome::Skipped;
            }
        };

        let path_str = meta.path.to_string_lossy().to_string();
        if indexed_hashes.get(&path_str) == Some(&meta.hash) {
            return FileOutcome::Unchanged;
        }

        let source = FileFactory::create_from_meta(&meta);
        let text = match source.to_text().await {
            Ok(t) => t,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to extract text from {}: {}",
                    path.display(),
                    e
                );
                return FileOutcome::Skipped;
            }
        };

        let chunks = utils::chunk_text(&text, self.chunk_chars, self.chunk_overlap_chars);
        if chunks.is_empty() {
            return FileOutcome::Skipped;
        }

        // A changed file replaces its previous chunks
        if indexed_hashes.contains_key(&path_str) {
            if let Err(e) = self.index.delete_by_path(&meta.path).await {
                eprintln!(
                    "Warning: Failed to drop stale chunks for {}: {}",
                    path.display(),
                    e
                );
            }
        }

        let embeddings = match self.embeddings.compute_embeddings(&chunks).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                eprintln!("Warning: Failed to embed {}: {}", path.display(), e);
                return FileOutcome::Skipped;
            }
        };

        match self.index.index_chunks(&meta, &chunks, &embeddings).await {
            Ok(indexed) => FileOutcome::Indexed(indexed),
            Err(e) => {
                eprintln!("Warning: Failed to index {}: {}", path.display(), e);
                FileOutcome::Skipped
            }
        }
    }

    /// Retrieval step: top-k nearest chunks for the query.
    /// An empty query or an empty index produces nothing.
    pub async fn retrieve(&self, query: &str) -> Result<Option<WorkflowEvent>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        println!("Query the database with: {}", query);

        if self.index.document_count().await? == 0 {
            println!("Index is empty, load some documents before querying!");
            return Ok(None);
        }

        let embedding = self
            .embeddings
            .compute_embedding(query)
            .await
            .context("Failed to embed query")?;

        let chunks = self.index.search(query, &embedding, self.top_k).await?;
        println!("Retrieved {} chunks.", chunks.len());

        Ok(Some(WorkflowEvent::Retrieved(RetrievedEvent {
            query: query.to_string(),
            chunks,
        })))
    }

    /// Rerank step: LLM choice-select over the retrieved chunks
    pub async fn rerank(&self, event: RetrievedEvent) -> Result<WorkflowEvent> {
        let ranker = LlmReranker::new(self.require_llm()?, self.choice_batch_size, self.rerank_top_n);
        let chunks = ranker.rerank(&event.query, event.chunks).await?;
        println!("Reranked chunks to {}", chunks.len());

        Ok(WorkflowEvent::Reranked(RerankedEvent {
            query: event.query,
            chunks,
        }))
    }

    /// Synthesize step: streamed answer from the reranked chunks
    pub async fn synthesize(&self, event: RerankedEvent) -> Result<Option<TokenStream>> {
        let synthesizer = CompactSynthesizer::new(self.require_llm()?, self.max_context_chars);
        synthesizer.synthesize(&event.query, &event.chunks).await
    }

    /// Drive a query through the steps: each event is dispatched to the
    /// step that consumes it until the answer stream is produced
    pub async fn run_query(&self, query: &str) -> Result<Option<TokenStream>> {
        let mut event = match self.retrieve(query).await? {
            Some(event) => event,
            None => return Ok(None),
        };

        loop {
            event = match event {
                WorkflowEvent::Retrieved(ev) => self.rerank(ev).await?,
                WorkflowEvent::Reranked(ev) => return self.synthesize(ev).await,
            };
        }
    }
}
