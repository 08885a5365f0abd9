use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration loaded from settings.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub meilisearch: MeilisearchConfig,
    /// Which embedding provider to use: "ollama" or "tei"
    #[serde(default = "default_embedding_provider")]
    pub embedding_provider: String,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub tei: TeiConfig,
    #[serde(default)]
    pub groq: GroqConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeilisearchConfig {
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub index_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
    #[serde(default = "default_ollama_dims")]
    pub dims: usize,
}

fn default_ollama_dims() -> usize {
    768 // nomic-embed-text dimension
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dims: 768,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeiConfig {
    pub url: String,
    #[serde(default = "default_tei_dims")]
    pub dims: usize,
}

fn default_tei_dims() -> usize {
    384 // bge-small-en-v1.5 dimension
}

impl Default for TeiConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080".to_string(),
            dims: 384,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroqConfig {
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            url: "https://api.groq.com/openai/v1".to_string(),
            api_key: None,
            model: "llama-3.2-90b-text-preview".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// How many passages similarity search returns
    pub top_k: usize,
    /// Weight of semantic vs keyword matching in hybrid search, 0.0..=1.0
    pub semantic_ratio: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 2,
            semantic_ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    /// How many passages are shown to the LLM per choice-select prompt
    pub choice_batch_size: usize,
    /// How many passages survive reranking
    pub top_n: usize,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            choice_batch_size: 5,
            top_n: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Character budget for context packed into a single synthesis prompt
    pub max_context_chars: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_context_chars: 16_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Maximum characters per chunk
    pub chunk_chars: usize,
    /// Overlap carried between consecutive chunks
    pub chunk_overlap_chars: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_chars: 2000,
            chunk_overlap_chars: 200,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration from default location or return defaults
    pub fn load() -> Result<Self> {
        // Try default config locations
        let mut default_paths = vec![
            PathBuf::from("config/settings.toml"),
            PathBuf::from("./settings.toml"),
        ];
        if let Some(home) = std::env::var_os("HOME") {
            default_paths.push(PathBuf::from(home).join(".config/askdocs/settings.toml"));
        }

        for path in &default_paths {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        // Return defaults if no config found
        Ok(Self::default())
    }

    /// Get Meilisearch API key from config or environment variable
    pub fn meilisearch_api_key(&self) -> Option<String> {
        self.meilisearch
            .api_key
            .clone()
            .or_else(|| std::env::var("MEILI_MASTER_KEY").ok())
    }

    /// Get Groq API key from config or environment variable
    pub fn groq_api_key(&self) -> Option<String> {
        self.groq
            .api_key
            .clone()
            .or_else(|| std::env::var("GROQ_API_KEY").ok())
    }

    /// Dimension of the configured embedding provider
    pub fn embedding_dims(&self) -> usize {
        if self.embedding_provider == "tei" {
            self.tei.dims
        } else {
            self.ollama.dims
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meilisearch: MeilisearchConfig {
                url: "http://127.0.0.1:7700".to_string(),
                api_key: None,
                index_name: "askdocs".to_string(),
            },
            embedding_provider: default_embedding_provider(),
            ollama: OllamaConfig::default(),
            tei: TeiConfig::default(),
            groq: GroqConfig::default(),
            retrieval: RetrievalConfig::default(),
            rerank: RerankConfig::default(),
            synthesis: SynthesisConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}
