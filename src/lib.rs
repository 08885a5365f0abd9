pub mod config;
pub mod constants;
pub mod embeddings;
pub mod file;
pub mod indexer;
pub mod llm;
pub mod models;
pub mod rerank;
pub mod synthesize;
pub mod utils;
pub mod workflow;

pub use embeddings::EmbeddingProvider;
pub use indexer::VectorIndex;
pub use llm::LlmProvider;
pub use models::{FileMeta, ScoredChunk};
pub use workflow::{IngestStats, RagWorkflow, WorkflowEvent};
