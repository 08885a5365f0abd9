use anyhow::Result;
use futures::Stream;
use std::pin::Pin;

/// Stream of answer fragments produced by a streaming completion
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Trait for LLM providers that can complete prompts
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a prompt and return the full response text
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Complete a prompt, yielding the response incrementally as it is generated
    async fn complete_stream(&self, prompt: &str) -> Result<TokenStream>;
}
