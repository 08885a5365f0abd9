use crate::config::Config;
use crate::llm::r#trait::{LlmProvider, TokenStream};
use anyhow::{Context, Result};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// LLM provider for Groq's OpenAI-compatible chat completions API
pub struct GroqProvider {
    base_url: String,
    api_key: String,
    model: String,
}

impl GroqProvider {
    /// Create a new Groq provider
    /// Default URL: https://api.groq.com/openai/v1
    pub fn new(base_url: Option<&str>, api_key: String, model: Option<&str>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or("https://api.groq.com/openai/v1")
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: model.unwrap_or("llama-3.2-90b-text-preview").to_string(),
        }
    }

    /// Build a provider from configuration; the API key comes from the
    /// config file or the GROQ_API_KEY environment variable
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .groq_api_key()
            .context("Groq API key not set. Add it to settings.toml or export GROQ_API_KEY")?;
        Ok(Self::new(
            Some(&config.groq.url),
            api_key,
            Some(&config.groq.model),
        ))
    }

    /// Override the model name
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    fn request_body(&self, prompt: &str, stream: bool) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: 0.0,
            stream,
        }
    }

    async fn send_request(&self, prompt: &str, stream: bool) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = self.request_body(prompt, stream);

        let client = reqwest::Client::new();
        let response = client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .context("Failed to connect to Groq API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Groq API returned error {}: {}", status, error_text);
        }

        Ok(response)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionChunk {
    choices: Vec<ChatChunkChoice>,
}

#[derive(Deserialize)]
struct ChatChunkChoice {
    delta: ChatDelta,
}

#[derive(Deserialize, Default)]
struct ChatDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the token from one SSE `data:` line, if it carries one.
/// Returns Ok(None) for the `[DONE]` terminator and empty deltas.
fn parse_sse_line(line: &str) -> Result<Option<String>> {
    let Some(data) = line.strip_prefix("data:") else {
        // Keep-alive comments and empty lines between events
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    let chunk: ChatCompletionChunk =
        serde_json::from_str(data).context("Failed to parse streaming chunk from Groq")?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

#[async_trait::async_trait]
impl LlmProvider for GroqProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self.send_request(prompt, false).await?;

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse Groq completion response")?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("Groq returned no completion choices")?;

        Ok(content)
    }

    async fn complete_stream(&self, prompt: &str) -> Result<TokenStream> {
        let response = self.send_request(prompt, true).await?;

        // Parse SSE lines off the byte stream in a task and forward tokens
        // through a channel; the caller consumes the receiver as a stream
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = byte_stream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx.send(Err(
                            anyhow::Error::from(e).context("Groq stream interrupted")
                        ));
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // Process every complete line in the buffer; partial lines
                // stay behind for the next chunk
                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim().to_string();
                    buffer.drain(..=newline);

                    match parse_sse_line(&line) {
                        Ok(Some(token)) => {
                            if tx.send(Ok(token)).is_err() {
                                return; // Receiver dropped, stop reading
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            let _ = tx.send(Err(e));
                            return;
                        }
                    }
                }
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groq_provider_creation() {
        let provider = GroqProvider::new(None, "key".to_string(), None);
        assert_eq!(provider.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(provider.model, "llama-3.2-90b-text-preview");
    }

    #[test]
    fn test_groq_provider_with_model() {
        let provider = GroqProvider::new(None, "key".to_string(), None)
            .with_model("llama-3.1-70b-versatile".to_string());
        assert_eq!(provider.model, "llama-3.1-70b-versatile");
    }

    #[test]
    fn test_groq_provider_trailing_slash_trimmed() {
        let provider = GroqProvider::new(
            Some("https://api.groq.com/openai/v1/"),
            "key".to_string(),
            None,
        );
        assert_eq!(provider.base_url, "https://api.groq.com/openai/v1");
    }

    #[test]
    fn test_parse_sse_line_token() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        let token = parse_sse_line(line).unwrap();
        assert_eq!(token, Some("Hel".to_string()));
    }

    #[test]
    fn test_parse_sse_line_done() {
        assert_eq!(parse_sse_line("data: [DONE]").unwrap(), None);
    }

    #[test]
    fn test_parse_sse_line_empty_delta() {
        let line = r#"data: {"choices":[{"delta":{}}]}"#;
        assert_eq!(parse_sse_line(line).unwrap(), None);
    }

    #[test]
    fn test_parse_sse_line_non_data_line() {
        assert_eq!(parse_sse_line(": keep-alive").unwrap(), None);
        assert_eq!(parse_sse_line("").unwrap(), None);
    }

    #[test]
    fn test_parse_sse_line_malformed_json_errors() {
        assert!(parse_sse_line("data: {not json").is_err());
    }

    #[tokio::test]
    #[ignore] // Requires GROQ_API_KEY and network access
    async fn test_groq_complete() {
        let api_key = std::env::var("GROQ_API_KEY").unwrap();
        let provider = GroqProvider::new(None, api_key, None);
        let answer = provider.complete("Say the word: hello").await.unwrap();
        assert!(!answer.is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires GROQ_API_KEY and network access
    async fn test_groq_complete_stream() {
        let api_key = std::env::var("GROQ_API_KEY").unwrap();
        let provider = GroqProvider::new(None, api_key, None);
        let mut stream = provider.complete_stream("Count from 1 to 5").await.unwrap();

        let mut full = String::new();
        while let Some(token) = StreamExt::next(&mut stream).await {
            full.push_str(&token.unwrap());
        }
        assert!(!full.is_empty());
    }
}
