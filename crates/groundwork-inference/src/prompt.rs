//! Prompt assembly for grounded answers.
//!
//! [`PromptBuilder::build`] is a pure function of the question, the working
//! set and the conversation history. Its output is rendered in a fixed order:
//!
//! 1. persona and mission
//! 2. behavioral instructions
//! 3. output format directive
//! 4. recent conversation history (last N turns)
//! 5. context chunks, each under a source label, separated by `---`
//! 6. the question
//!
//! Items 1-3 form the system message; 4-6 the user message.

use groundwork_core::{defaults, meta_str, meta_u64, Candidate, ChatTurn, SourceType};

/// Delimiter between rendered context chunks.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

const PERSONA: &str = "You are Groundwork, an assistant that answers questions about a \
software project using only material from the project's own sources: its code \
repositories, chat channels, issues and documents. Your mission is to help the \
team understand and move their project forward.";

const INSTRUCTIONS: &[&str] = &[
    "Base every statement on the provided context and cite the source label it came from.",
    "If the context does not contain the answer, say so plainly instead of guessing.",
    "Prefer concrete, actionable answers: name files, functions, people and next steps.",
    "Use structured formatting (headings, bullet lists, code blocks) where it aids reading.",
];

const FORMAT_DIRECTIVE: &str = "Respond in Markdown. Start with a one or two sentence \
direct answer, follow with supporting details, and end with a \"Sources\" list of the \
labels you relied on.";

/// A rendered generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// System and user message joined, for backends without a system role.
    pub fn to_single_string(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

/// Human-readable label for a chunk, derived from its source type and
/// metadata. Missing metadata falls back to the source id.
///
/// - code: `src/lib.rs (lines 1-20)`
/// - chat: `#general` or `#general (alice)`
/// - issue: `Issue #42: Title` when number/title are present
pub fn source_label(candidate: &Candidate) -> String {
    let meta = &candidate.metadata;
    match candidate.source_type {
        SourceType::Code | SourceType::Document => {
            let file = meta_str(meta, "path").or_else(|| meta_str(meta, "file_name"));
            match (file, meta_u64(meta, "start_line"), meta_u64(meta, "end_line")) {
                (Some(file), Some(start), Some(end)) => {
                    format!("{} (lines {}-{})", file, start, end)
                }
                (Some(file), _, _) => file.to_string(),
                _ => candidate.source_id.clone(),
            }
        }
        SourceType::Chat => {
            let channel = meta_str(meta, "channel")
                .or_else(|| meta_str(meta, "channel_name"))
                .map(|c| c.trim_start_matches('#'));
            let author = meta_str(meta, "author").or_else(|| meta_str(meta, "user"));
            match (channel, author) {
                (Some(channel), Some(author)) => format!("#{} ({})", channel, author),
                (Some(channel), None) => format!("#{}", channel),
                (None, Some(author)) => format!("chat ({})", author),
                (None, None) => candidate.source_id.clone(),
            }
        }
        SourceType::Issue => match (meta_u64(meta, "number"), meta_str(meta, "title")) {
            (Some(number), Some(title)) => format!("Issue #{}: {}", number, title),
            (Some(number), None) => format!("Issue #{}", number),
            (None, Some(title)) => format!("Issue: {}", title),
            (None, None) => candidate.source_id.clone(),
        },
    }
}

/// Renders questions, context and history into a [`Prompt`].
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    history_turns: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(defaults::HISTORY_TURNS)
    }
}

impl PromptBuilder {
    pub fn new(history_turns: usize) -> Self {
        Self { history_turns }
    }

    pub fn history_turns(&self) -> usize {
        self.history_turns
    }

    fn system_message(&self) -> String {
        let mut out = String::with_capacity(1024);
        out.push_str(PERSONA);
        out.push_str("\n\nInstructions:\n");
        for instruction in INSTRUCTIONS {
            out.push_str("- ");
            out.push_str(instruction);
            out.push('\n');
        }
        out.push_str("\nOutput format:\n");
        out.push_str(FORMAT_DIRECTIVE);
        out
    }

    /// Build the prompt for `question` over `working_set`.
    pub fn build(&self, question: &str, working_set: &[Candidate], history: &[ChatTurn]) -> Prompt {
        let mut user = String::new();

        let recent = &history[history.len().saturating_sub(self.history_turns)..];
        if !recent.is_empty() {
            user.push_str("Conversation so far:\n");
            for turn in recent {
                user.push_str(&format!("{}: {}\n", speaker(&turn.sender), turn.content.trim()));
            }
            user.push('\n');
        }

        user.push_str("Context:\n\n");
        if working_set.is_empty() {
            user.push_str("(no context available)");
        } else {
            let blocks: Vec<String> = working_set
                .iter()
                .map(|c| format!("[{}] {}\n{}", c.source_type, source_label(c), c.text.trim_end()))
                .collect();
            user.push_str(&blocks.join(CONTEXT_DELIMITER));
        }

        user.push_str("\n\nQuestion: ");
        user.push_str(question.trim());

        Prompt {
            system: self.system_message(),
            user,
        }
    }
}

fn speaker(sender: &str) -> &str {
    match sender.trim().to_lowercase().as_str() {
        "user" | "human" => "User",
        "assistant" | "bot" | "ai" => "Assistant",
        _ => sender.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn candidate(source_type: SourceType, source_id: &str, text: &str, metadata: serde_json::Value) -> Candidate {
        Candidate {
            id: Uuid::nil(),
            project_id: 1,
            source_type,
            source_id: source_id.to_string(),
            text: text.to_string(),
            metadata,
            distance: 0.1,
        }
    }

    fn turn(sender: &str, content: &str) -> ChatTurn {
        ChatTurn {
            content: content.to_string(),
            sender: sender.to_string(),
        }
    }

    #[test]
    fn test_code_label_uses_path_and_lines() {
        let c = candidate(
            SourceType::Code,
            "src/lib.rs#1-20",
            "fn main() {}",
            json!({"path": "src/lib.rs", "start_line": 1, "end_line": 20}),
        );
        assert_eq!(source_label(&c), "src/lib.rs (lines 1-20)");
    }

    #[test]
    fn test_chat_label_uses_channel_and_author() {
        let c = candidate(
            SourceType::Chat,
            "C01/1700000000.1",
            "deploy is blocked",
            json!({"channel": "#deploys", "author": "alice"}),
        );
        assert_eq!(source_label(&c), "#deploys (alice)");

        let c = candidate(SourceType::Chat, "C01/1", "x", json!({"channel_name": "general"}));
        assert_eq!(source_label(&c), "#general");
    }

    #[test]
    fn test_issue_label() {
        let c = candidate(SourceType::Issue, "issue-42", "x", json!({"number": 42, "title": "Crash"}));
        assert_eq!(source_label(&c), "Issue #42: Crash");
    }

    #[test]
    fn test_label_tolerates_missing_metadata() {
        for st in [SourceType::Code, SourceType::Chat, SourceType::Issue, SourceType::Document] {
            let c = candidate(st, "raw-id", "x", json!({}));
            assert_eq!(source_label(&c), "raw-id");
        }
        let c = candidate(SourceType::Code, "raw-id", "x", json!(null));
        assert_eq!(source_label(&c), "raw-id");
    }

    #[test]
    fn test_sections_in_order() {
        let builder = PromptBuilder::new(6);
        let set = vec![
            candidate(SourceType::Code, "a.rs#1-2", "let a = 1;", json!({"path": "a.rs"})),
            candidate(SourceType::Chat, "c1", "we ship friday", json!({"channel": "release"})),
        ];
        let prompt = builder.build("When do we ship?", &set, &[turn("user", "hi"), turn("assistant", "hello")]);

        let sys = &prompt.system;
        let persona = sys.find("You are Groundwork").unwrap();
        let instructions = sys.find("Instructions:").unwrap();
        let format = sys.find("Output format:").unwrap();
        assert!(persona < instructions && instructions < format);

        let user = &prompt.user;
        let history = user.find("Conversation so far:").unwrap();
        let context = user.find("Context:").unwrap();
        let first = user.find("let a = 1;").unwrap();
        let delimiter = user.find("---").unwrap();
        let second = user.find("we ship friday").unwrap();
        let question = user.find("Question: When do we ship?").unwrap();
        assert!(history < context);
        assert!(context < first && first < delimiter && delimiter < second);
        assert!(second < question);
        assert!(user.contains("[code] a.rs\nlet a = 1;"));
        assert!(user.contains("[chat] #release\nwe ship friday"));
    }

    #[test]
    fn test_only_last_turns_rendered() {
        let builder = PromptBuilder::new(2);
        let history: Vec<ChatTurn> = (1..=5).map(|i| turn("user", &format!("turn {}", i))).collect();
        let prompt = builder.build("q", &[], &history);
        assert!(!prompt.user.contains("turn 3"));
        assert!(prompt.user.contains("User: turn 4"));
        assert!(prompt.user.contains("User: turn 5"));
    }

    #[test]
    fn test_no_history_section_when_empty() {
        let prompt = PromptBuilder::default().build("q", &[], &[]);
        assert!(!prompt.user.contains("Conversation so far"));
        assert!(prompt.user.contains("(no context available)"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = PromptBuilder::default();
        let set = vec![candidate(SourceType::Document, "d", "text", json!({}))];
        assert_eq!(builder.build("q", &set, &[]), builder.build("q", &set, &[]));
    }

    #[test]
    fn test_single_string_contains_both_parts() {
        let prompt = PromptBuilder::default().build("why?", &[], &[]);
        let joined = prompt.to_single_string();
        assert!(joined.starts_with("You are Groundwork"));
        assert!(joined.ends_with("Question: why?"));
    }
}
