//! Answer generation with a deterministic fallback.
//!
//! Sources are mapped from the working set before the generative call and
//! are returned unchanged whether the call succeeds or not. When the call
//! fails, times out or returns nothing usable, the answer text is built
//! from the working set by a fixed template instead.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use groundwork_core::{defaults, Answer, Candidate, GenerationBackend, Source};

use crate::prompt::Prompt;

/// Marker present in every fallback answer.
pub const FALLBACK_NOTICE: &str =
    "Note: this is an automatic fallback response because the AI model could not be reached.";

/// Answer returned when retrieval produced nothing to ground on.
pub const NO_CONTEXT_ANSWER: &str = "I couldn't find any relevant information in this \
project's connected sources to answer that question. Try rephrasing it, or sync more \
sources for this project.";

/// Truncate to at most `max_chars` characters, appending `...` if cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}

/// Invokes the generative service and falls back when it is unavailable.
pub struct AnswerGenerator {
    backend: Arc<dyn GenerationBackend>,
    snippet_length: usize,
    fallback_excerpt_length: usize,
}

impl AnswerGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            snippet_length: defaults::SNIPPET_LENGTH,
            fallback_excerpt_length: defaults::FALLBACK_EXCERPT_LENGTH,
        }
    }

    pub fn with_snippet_length(mut self, chars: usize) -> Self {
        self.snippet_length = chars;
        self
    }

    pub fn with_fallback_excerpt_length(mut self, chars: usize) -> Self {
        self.fallback_excerpt_length = chars;
        self
    }

    /// Citation for one working-set chunk.
    pub fn to_source(&self, candidate: &Candidate) -> Source {
        Source {
            id: candidate.id,
            source_type: candidate.source_type,
            source_id: candidate.source_id.clone(),
            snippet: truncate_chars(candidate.text.trim(), self.snippet_length),
            metadata: candidate.metadata.clone(),
        }
    }

    /// The templated answer used when generation is unavailable.
    pub fn fallback_answer(&self, working_set: &[Candidate]) -> String {
        let context = working_set
            .iter()
            .map(|c| c.text.trim())
            .collect::<Vec<_>>()
            .join("\n\n");
        let noun = if working_set.len() == 1 { "source" } else { "sources" };
        format!(
            "I found {} relevant {} for your question, but I couldn't generate a full answer \
             right now. Here is the most relevant context:\n\n{}\n\n{}",
            working_set.len(),
            noun,
            truncate_chars(&context, self.fallback_excerpt_length),
            FALLBACK_NOTICE
        )
    }

    /// Answer `prompt` grounded on `working_set`. Never fails.
    pub async fn generate(&self, prompt: &Prompt, working_set: &[Candidate]) -> Answer {
        if working_set.is_empty() {
            debug!(
                subsystem = "inference",
                component = "answer",
                "Empty working set, skipping generation"
            );
            return Answer {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
                fallback: false,
            };
        }

        let sources: Vec<Source> = working_set.iter().map(|c| self.to_source(c)).collect();
        let start = Instant::now();

        let outcome = self
            .backend
            .generate_with_system(&prompt.system, &prompt.user)
            .await;

        let failure = match outcome {
            Ok(text) if !text.trim().is_empty() => {
                debug!(
                    subsystem = "inference",
                    component = "answer",
                    model = self.backend.model_name(),
                    chunk_count = working_set.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Answer generated"
                );
                return Answer {
                    answer: text.trim().to_string(),
                    sources,
                    fallback: false,
                };
            }
            Ok(_) => "empty response".to_string(),
            Err(e) => e.to_string(),
        };

        warn!(
            subsystem = "inference",
            component = "answer",
            model = self.backend.model_name(),
            fallback = true,
            error = %failure,
            duration_ms = start.elapsed().as_millis() as u64,
            "Generation unavailable, using fallback answer"
        );
        Answer {
            answer: self.fallback_answer(working_set),
            sources,
            fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockInferenceBackend;
    use crate::prompt::PromptBuilder;
    use groundwork_core::SourceType;
    use serde_json::json;
    use uuid::Uuid;

    fn candidate(text: &str) -> Candidate {
        Candidate {
            id: Uuid::new_v4(),
            project_id: 1,
            source_type: SourceType::Code,
            source_id: "src/lib.rs#1-20".to_string(),
            text: text.to_string(),
            metadata: json!({"path": "src/lib.rs"}),
            distance: 0.2,
        }
    }

    fn prompt(set: &[Candidate]) -> Prompt {
        PromptBuilder::default().build("what does it do?", set, &[])
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("abc", 3), "abc");
        // Multi-byte characters are never split.
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
    }

    #[tokio::test]
    async fn test_success_wraps_model_text() {
        let backend = Arc::new(MockInferenceBackend::new().with_fixed_response("  It parses.  "));
        let generator = AnswerGenerator::new(backend.clone());
        let set = vec![candidate("fn parse() {}")];

        let answer = generator.generate(&prompt(&set), &set).await;

        assert_eq!(answer.answer, "It parses.");
        assert!(!answer.fallback);
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].id, set[0].id);
        assert_eq!(backend.generate_call_count(), 1);
        let call = backend.last_generation().unwrap();
        assert!(call.system.starts_with("You are Groundwork"));
        assert!(call.input.contains("fn parse() {}"));
    }

    #[tokio::test]
    async fn test_failure_uses_fallback_with_same_sources() {
        let ok = AnswerGenerator::new(Arc::new(MockInferenceBackend::new()));
        let failing =
            AnswerGenerator::new(Arc::new(MockInferenceBackend::new().failing_generation()));
        let set = vec![candidate("first chunk"), candidate("second chunk")];

        let good = ok.generate(&prompt(&set), &set).await;
        let degraded = failing.generate(&prompt(&set), &set).await;

        assert!(degraded.fallback);
        assert!(degraded.answer.contains(FALLBACK_NOTICE));
        assert!(degraded.answer.contains("I found 2 relevant sources"));
        assert!(degraded.answer.contains("first chunk\n\nsecond chunk"));
        assert_eq!(good.sources, degraded.sources);
    }

    #[tokio::test]
    async fn test_empty_output_uses_fallback() {
        let generator =
            AnswerGenerator::new(Arc::new(MockInferenceBackend::new().with_fixed_response("   ")));
        let set = vec![candidate("only chunk")];

        let answer = generator.generate(&prompt(&set), &set).await;
        assert!(answer.fallback);
        assert!(answer.answer.contains("I found 1 relevant source "));
    }

    #[tokio::test]
    async fn test_empty_working_set_skips_generation() {
        let backend = Arc::new(MockInferenceBackend::new());
        let generator = AnswerGenerator::new(backend.clone());

        let answer = generator.generate(&prompt(&[]), &[]).await;
        assert_eq!(answer.answer, NO_CONTEXT_ANSWER);
        assert!(answer.sources.is_empty());
        assert_eq!(backend.generate_call_count(), 0);
    }

    #[test]
    fn test_snippet_truncated_to_length() {
        let generator = AnswerGenerator::new(Arc::new(MockInferenceBackend::new()));
        let long = "x".repeat(250);
        let source = generator.to_source(&candidate(&long));
        assert_eq!(source.snippet.chars().count(), 203);
        assert!(source.snippet.ends_with("..."));

        let short = generator.to_source(&candidate("tiny"));
        assert_eq!(short.snippet, "tiny");
    }

    #[test]
    fn test_fallback_excerpt_is_bounded() {
        let generator = AnswerGenerator::new(Arc::new(MockInferenceBackend::new()))
            .with_fallback_excerpt_length(500);
        let set = vec![candidate(&"a".repeat(400)), candidate(&"b".repeat(400))];
        let text = generator.fallback_answer(&set);
        assert!(text.contains(&format!("{}...", "b".repeat(98))));
        assert!(!text.contains(&"b".repeat(99)));
    }
}
