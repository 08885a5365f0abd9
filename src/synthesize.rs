use crate::constants::{REFINE_PROMPT, TEXT_QA_PROMPT};
use crate::llm::{LlmProvider, TokenStream};
use crate::models::ScoredChunk;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Synthesizes a streamed answer from reranked passages.
///
/// Passages are compacted into as few prompts as possible under the
/// character budget. The first batch answers the query, each further batch
/// refines the existing answer, and the final call streams so the caller
/// sees the answer as it is generated.
pub struct CompactSynthesizer {
    llm: Arc<dyn LlmProvider>,
    max_context_chars: usize,
}

impl CompactSynthesizer {
    pub fn new(llm: Arc<dyn LlmProvider>, max_context_chars: usize) -> Self {
        Self {
            llm,
            max_context_chars: max_context_chars.max(1),
        }
    }

    /// Produce a streamed answer for `query` from `chunks`.
    /// Returns None when there are no passages to answer from.
    pub async fn synthesize(
        &self,
        query: &str,
        chunks: &[ScoredChunk],
    ) -> Result<Option<TokenStream>> {
        let batches = self.pack(chunks);
        if batches.is_empty() {
            return Ok(None);
        }

        let qa_prompt = TEXT_QA_PROMPT
            .replace("{context}", &batches[0])
            .replace("{question}", query);

        // Single batch: stream the answer directly
        if batches.len() == 1 {
            let stream = self
                .llm
                .complete_stream(&qa_prompt)
                .await
                .context("Answer synthesis request failed")?;
            return Ok(Some(stream));
        }

        // Several batches: answer on the first, refine through the rest,
        // stream only the final refinement
        let mut answer = self
            .llm
            .complete(&qa_prompt)
            .await
            .context("Answer synthesis request failed")?;

        for batch in &batches[1..batches.len() - 1] {
            let refine_prompt = REFINE_PROMPT
                .replace("{question}", query)
                .replace("{answer}", &answer)
                .replace("{context}", batch);
            answer = self
                .llm
                .complete(&refine_prompt)
                .await
                .context("Answer refinement request failed")?;
        }

        let final_prompt = REFINE_PROMPT
            .replace("{question}", query)
            .replace("{answer}", &answer)
            .replace("{context}", &batches[batches.len() - 1]);

        let stream = self
            .llm
            .complete_stream(&final_prompt)
            .await
            .context("Answer refinement request failed")?;

        Ok(Some(stream))
    }

    /// Greedily join passage texts into context batches under the budget.
    /// A single passage longer than the budget is truncated to fit.
    fn pack(&self, chunks: &[ScoredChunk]) -> Vec<String> {
        let mut batches: Vec<String> = Vec::new();
        let mut current = String::new();

        for chunk in chunks {
            let text = chunk.text.trim();
            if text.is_empty() {
                continue;
            }

            let mut text = text;
            if text.len() > self.max_context_chars {
                let mut end = self.max_context_chars;
                while !text.is_char_boundary(end) {
                    end -= 1;
                }
                text = &text[..end];
            }

            let needed = if current.is_empty() {
                text.len()
            } else {
                current.len() + 2 + text.len()
            };

            if needed > self.max_context_chars && !current.is_empty() {
                batches.push(std::mem::take(&mut current));
            }

            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(text);
        }

        if !current.is_empty() {
            batches.push(current);
        }

        batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// LLM stub that echoes a fixed answer and records prompts, tagging
    /// which calls were streamed
    struct RecordingLlm {
        answer: String,
        prompts: Mutex<Vec<(String, bool)>>,
    }

    impl RecordingLlm {
        fn new(answer: &str) -> Self {
            Self {
                answer: answer.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for RecordingLlm {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push((prompt.to_string(), false));
            Ok(self.answer.clone())
        }

        async fn complete_stream(&self, prompt: &str) -> Result<TokenStream> {
            self.prompts.lock().unwrap().push((prompt.to_string(), true));
            let tokens: Vec<Result<String>> = self
                .answer
                .split_whitespace()
                .map(|w| Ok(format!("{} ", w)))
                .collect();
            Ok(Box::pin(futures::stream::iter(tokens)))
        }
    }

    fn chunk(text: &str) -> ScoredChunk {
        ScoredChunk::new(text.to_string(), PathBuf::from("/docs/a.md"), 0, 9.0)
    }

    async fn collect(stream: TokenStream) -> String {
        stream
            .map(|t| t.unwrap())
            .collect::<Vec<_>>()
            .await
            .concat()
    }

    #[tokio::test]
    async fn test_synthesize_no_chunks_returns_none() {
        let llm = Arc::new(RecordingLlm::new("answer"));
        let synthesizer = CompactSynthesizer::new(llm.clone(), 1000);

        let result = synthesizer.synthesize("q", &[]).await.unwrap();
        assert!(result.is_none());
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_synthesize_single_batch_streams_directly() {
        let llm = Arc::new(RecordingLlm::new("the cash back is 120"));
        let synthesizer = CompactSynthesizer::new(llm.clone(), 1000);

        let chunks = vec![chunk("dental cash back: 120"), chunk("vision cash back: 80")];
        let stream = synthesizer
            .synthesize("Whats the dental cash back?", &chunks)
            .await
            .unwrap()
            .unwrap();

        let answer = collect(stream).await;
        assert!(answer.contains("120"));

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        let (prompt, streamed) = &prompts[0];
        assert!(streamed);
        assert!(prompt.contains("dental cash back: 120"));
        assert!(prompt.contains("vision cash back: 80"));
        assert!(prompt.contains("Whats the dental cash back?"));
    }

    #[tokio::test]
    async fn test_synthesize_multiple_batches_refines_then_streams() {
        let llm = Arc::new(RecordingLlm::new("refined answer"));
        // Budget fits one passage per batch
        let synthesizer = CompactSynthesizer::new(llm.clone(), 30);

        let chunks = vec![
            chunk("first passage of context"),
            chunk("second passage of context"),
            chunk("third passage of context"),
        ];
        let stream = synthesizer.synthesize("q", &chunks).await.unwrap().unwrap();
        let _ = collect(stream).await;

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        // First call answers, intermediate refines non-streaming, final streams
        assert!(!prompts[0].1);
        assert!(prompts[0].0.contains("first passage"));
        assert!(!prompts[1].1);
        assert!(prompts[1].0.contains("second passage"));
        assert!(prompts[1].0.contains("refined answer"));
        assert!(prompts[2].1);
        assert!(prompts[2].0.contains("third passage"));
    }

    #[tokio::test]
    async fn test_pack_joins_under_budget() {
        let llm = Arc::new(RecordingLlm::new(""));
        let synthesizer = CompactSynthesizer::new(llm, 100);

        let batches = synthesizer.pack(&[chunk("aaa"), chunk("bbb"), chunk("ccc")]);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], "aaa\n\nbbb\n\nccc");
    }

    #[tokio::test]
    async fn test_pack_splits_over_budget() {
        let llm = Arc::new(RecordingLlm::new(""));
        let synthesizer = CompactSynthesizer::new(llm, 10);

        let batches = synthesizer.pack(&[chunk("aaaa"), chunk("bbbb"), chunk("cccc")]);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], "aaaa\n\nbbbb");
        assert_eq!(batches[1], "cccc");
    }

    #[tokio::test]
    async fn test_pack_truncates_oversized_passage() {
        let llm = Arc::new(RecordingLlm::new(""));
        let synthesizer = CompactSynthesizer::new(llm, 50);

        let batches = synthesizer.pack(&[chunk(&"x".repeat(500))]);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 50);
    }

    #[tokio::test]
    async fn test_pack_skips_empty_passages() {
        let llm = Arc::new(RecordingLlm::new(""));
        let synthesizer = CompactSynthesizer::new(llm, 100);

        let batches = synthesizer.pack(&[chunk("   "), chunk("real content")]);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], "real content");
    }
}
