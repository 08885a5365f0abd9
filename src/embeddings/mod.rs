pub mod local;
pub mod tei;
pub mod r#trait;

pub use local::LocalEmbeddingProvider;
pub use r#trait::EmbeddingProvider;
pub use tei::TeiEmbeddingProvider;

use crate::config::Config;

/// Build the embedding provider selected by the configuration
pub fn provider_from_config(config: &Config) -> Box<dyn EmbeddingProvider> {
    if config.embedding_provider == "tei" {
        Box::new(TeiEmbeddingProvider::new(
            Some(&config.tei.url),
            Some(config.tei.dims),
        ))
    } else {
        Box::new(LocalEmbeddingProvider::new(
            Some(&config.ollama.url),
            Some(&config.ollama.model),
            Some(config.ollama.dims),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_config_default_is_ollama() {
        let config = Config::default();
        let provider = provider_from_config(&config);
        assert_eq!(provider.dimension(), 768);
    }

    #[test]
    fn test_provider_from_config_tei() {
        let mut config = Config::default();
        config.embedding_provider = "tei".to_string();
        config.tei.dims = 384;
        let provider = provider_from_config(&config);
        assert_eq!(provider.dimension(), 384);
    }
}
