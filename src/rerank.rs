use crate::constants::CHOICE_SELECT_PROMPT;
use crate::llm::LlmProvider;
use crate::models::ScoredChunk;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Maximum characters of a passage shown in a choice-select prompt
const CHOICE_TEXT_CAP: usize = 1500;

/// Reranks retrieved passages by asking the LLM to pick and score the ones
/// relevant to the query.
///
/// Passages are shown to the model in numbered batches of
/// `choice_batch_size`; the scored selections from every batch are merged,
/// sorted by relevance, and cut to `top_n`.
pub struct LlmReranker {
    llm: Arc<dyn LlmProvider>,
    choice_batch_size: usize,
    top_n: usize,
}

impl LlmReranker {
    pub fn new(llm: Arc<dyn LlmProvider>, choice_batch_size: usize, top_n: usize) -> Self {
        Self {
            llm,
            choice_batch_size: choice_batch_size.max(1),
            top_n: top_n.max(1),
        }
    }

    /// Rerank `chunks` against `query`. Chunks the LLM does not select are
    /// dropped; the survivors carry the LLM's 1-10 relevance score.
    pub async fn rerank(&self, query: &str, chunks: Vec<ScoredChunk>) -> Result<Vec<ScoredChunk>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let mut selected: Vec<ScoredChunk> = Vec::new();

        for batch in chunks.chunks(self.choice_batch_size) {
            let context = format_choices(batch);
            let prompt = CHOICE_SELECT_PROMPT
                .replace("{context}", &context)
                .replace("{question}", query);

            let answer = self
                .llm
                .complete(&prompt)
                .await
                .context("Choice-select rerank request failed")?;

            for (doc_number, relevance) in parse_choice_select(&answer, batch.len()) {
                let mut chunk = batch[doc_number - 1].clone();
                chunk.score = relevance;
                selected.push(chunk);
            }
        }

        selected.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        selected.truncate(self.top_n);

        Ok(selected)
    }
}

/// Render a batch of passages as a numbered document list
fn format_choices(batch: &[ScoredChunk]) -> String {
    let mut context = String::new();
    for (i, chunk) in batch.iter().enumerate() {
        let mut text = chunk.text.as_str();
        if text.len() > CHOICE_TEXT_CAP {
            let mut end = CHOICE_TEXT_CAP;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text = &text[..end];
        }
        context.push_str(&format!("Document {}:\n{}\n\n", i + 1, text));
    }
    context
}

/// Parse `Doc: <n>, Relevance: <score>` lines from a choice-select answer.
///
/// Lenient on purpose: malformed lines are skipped, document numbers outside
/// 1..=num_choices are ignored, duplicate selections keep the first score,
/// and a selection without a score defaults to relevance 1.0.
fn parse_choice_select(answer: &str, num_choices: usize) -> Vec<(usize, f32)> {
    let mut selections: Vec<(usize, f32)> = Vec::new();

    for line in answer.lines() {
        let line = line.trim();
        let Some(doc_pos) = line.find("Doc") else {
            continue;
        };

        let after_doc = &line[doc_pos + 3..];
        let Some(doc_number) = first_number(after_doc) else {
            continue;
        };
        let doc_number = doc_number as usize;
        if doc_number == 0 || doc_number > num_choices {
            continue;
        }
        if selections.iter().any(|(n, _)| *n == doc_number) {
            continue;
        }

        let relevance = line
            .find("Relevance")
            .and_then(|pos| first_number(&line[pos + 9..]))
            .unwrap_or(1.0);

        selections.push((doc_number, relevance));
    }

    selections
}

/// First decimal number in a string, if any
fn first_number(s: &str) -> Option<f32> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let rest = &s[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::TokenStream;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// LLM stub that replays canned answers and records prompts
    struct ScriptedLlm {
        answers: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn new(answers: Vec<&str>) -> Self {
            Self {
                answers: Mutex::new(answers.into_iter().rev().map(String::from).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self
                .answers
                .lock()
                .unwrap()
                .pop()
                .expect("no scripted answer left"))
        }

        async fn complete_stream(&self, prompt: &str) -> Result<TokenStream> {
            let answer = self.complete(prompt).await?;
            Ok(Box::pin(futures::stream::iter(vec![Ok(answer)])))
        }
    }

    fn chunk(text: &str, index: usize) -> ScoredChunk {
        ScoredChunk::new(text.to_string(), PathBuf::from("/docs/a.md"), index, 0.5)
    }

    #[test]
    fn test_parse_choice_select_basic() {
        let answer = "Doc: 2, Relevance: 7\nDoc: 1, Relevance: 4";
        let parsed = parse_choice_select(answer, 3);
        assert_eq!(parsed, vec![(2, 7.0), (1, 4.0)]);
    }

    #[test]
    fn test_parse_choice_select_skips_malformed_lines() {
        let answer = "Here are the documents:\nDoc: 1, Relevance: 9\ngarbage line\nDoc: foo";
        let parsed = parse_choice_select(answer, 5);
        assert_eq!(parsed, vec![(1, 9.0)]);
    }

    #[test]
    fn test_parse_choice_select_ignores_out_of_range() {
        let answer = "Doc: 7, Relevance: 9\nDoc: 0, Relevance: 3\nDoc: 2, Relevance: 5";
        let parsed = parse_choice_select(answer, 3);
        assert_eq!(parsed, vec![(2, 5.0)]);
    }

    #[test]
    fn test_parse_choice_select_missing_relevance_defaults() {
        let parsed = parse_choice_select("Doc: 3", 5);
        assert_eq!(parsed, vec![(3, 1.0)]);
    }

    #[test]
    fn test_parse_choice_select_duplicate_keeps_first() {
        let answer = "Doc: 1, Relevance: 8\nDoc: 1, Relevance: 2";
        let parsed = parse_choice_select(answer, 3);
        assert_eq!(parsed, vec![(1, 8.0)]);
    }

    #[test]
    fn test_format_choices_numbers_from_one() {
        let batch = vec![chunk("first passage", 0), chunk("second passage", 1)];
        let context = format_choices(&batch);
        assert!(context.contains("Document 1:\nfirst passage"));
        assert!(context.contains("Document 2:\nsecond passage"));
    }

    #[test]
    fn test_format_choices_caps_long_text() {
        let batch = vec![chunk(&"x".repeat(5000), 0)];
        let context = format_choices(&batch);
        assert!(context.len() < 2000);
    }

    #[tokio::test]
    async fn test_rerank_empty_input_no_llm_call() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let reranker = LlmReranker::new(llm.clone(), 5, 3);

        let result = reranker.rerank("anything", Vec::new()).await.unwrap();
        assert!(result.is_empty());
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rerank_selects_and_scores() {
        let llm = Arc::new(ScriptedLlm::new(vec!["Doc: 2, Relevance: 9\nDoc: 1, Relevance: 3"]));
        let reranker = LlmReranker::new(llm, 5, 3);

        let chunks = vec![chunk("alpha", 0), chunk("beta", 1), chunk("gamma", 2)];
        let result = reranker.rerank("which is beta?", chunks).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].text, "beta");
        assert!((result[0].score - 9.0).abs() < f32::EPSILON);
        assert_eq!(result[1].text, "alpha");
    }

    #[tokio::test]
    async fn test_rerank_batches_and_merges() {
        // Two batches of 2: the model picks one from each
        let llm = Arc::new(ScriptedLlm::new(vec![
            "Doc: 1, Relevance: 4",
            "Doc: 2, Relevance: 8",
        ]));
        let reranker = LlmReranker::new(llm.clone(), 2, 3);

        let chunks = vec![
            chunk("one", 0),
            chunk("two", 1),
            chunk("three", 2),
            chunk("four", 3),
        ];
        let result = reranker.rerank("q", chunks).await.unwrap();

        assert_eq!(llm.prompts.lock().unwrap().len(), 2);
        assert_eq!(result.len(), 2);
        // Highest relevance first: "four" (batch 2, doc 2) scored 8
        assert_eq!(result[0].text, "four");
        assert_eq!(result[1].text, "one");
    }

    #[tokio::test]
    async fn test_rerank_truncates_to_top_n() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            "Doc: 1, Relevance: 9\nDoc: 2, Relevance: 8\nDoc: 3, Relevance: 7",
        ]));
        let reranker = LlmReranker::new(llm, 5, 2);

        let chunks = vec![chunk("a", 0), chunk("b", 1), chunk("c", 2)];
        let result = reranker.rerank("q", chunks).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].text, "a");
        assert_eq!(result[1].text, "b");
    }

    #[tokio::test]
    async fn test_rerank_unparseable_answer_selects_nothing() {
        let llm = Arc::new(ScriptedLlm::new(vec!["I cannot determine relevance."]));
        let reranker = LlmReranker::new(llm, 5, 3);

        let chunks = vec![chunk("a", 0)];
        let result = reranker.rerank("q", chunks).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_rerank_prompt_contains_query_and_passages() {
        let llm = Arc::new(ScriptedLlm::new(vec!["Doc: 1, Relevance: 5"]));
        let reranker = LlmReranker::new(llm.clone(), 5, 3);

        let chunks = vec![chunk("the dental cash back is 120", 0)];
        reranker
            .rerank("Whats the cash back amount for dental expenses?", chunks)
            .await
            .unwrap();

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("the dental cash back is 120"));
        assert!(prompts[0].contains("Whats the cash back amount for dental expenses?"));
    }
}
