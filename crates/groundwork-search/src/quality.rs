//! Low-signal candidate removal.
//!
//! A candidate is dropped when:
//! - it is a chat message whose whole text is a system notice (join/leave,
//!   topic or purpose change, pin/unpin, file upload, call start/end,
//!   channel rename/archive), matched case-insensitively
//! - it is a chat message shorter than `min_chat_message_length` once trimmed
//! - it is shorter than `min_chunk_length` once trimmed (any source type)
//!
//! Filtering is order-preserving and never reorders or rescores.

use regex::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use groundwork_core::{defaults, Candidate, Error, Result, RetrievalConfig};

/// Chat system-notice patterns. Each matches a notice template end to
/// end; the actor is a `<@U…>` mention or a name of at most two words.
pub const CHAT_NOISE_PATTERNS: &[&str] = &[
    // <@U123> has joined the channel / alice has left the group
    r"^\s*(<@[a-z0-9]+(\|[^>\n]{1,40})?>|[\w.'-]{1,40}( [\w.'-]{1,40})?) has (joined|left) the (channel|group|conversation)\.?\s*$",
    // alice joined #general
    r"^\s*(<@[a-z0-9]+(\|[^>\n]{1,40})?>|[\w.'-]{1,40}( [\w.'-]{1,40})?) (joined|left) #[\w.-]+\.?\s*$",
    // bob set the channel topic: Q3 planning / changed the channel purpose to ...
    r"^\s*(<@[a-z0-9]+(\|[^>\n]{1,40})?>|[\w.'-]{1,40}( [\w.'-]{1,40})?) (set|changed|updated) the channel (topic|purpose|description)(: | to )[^\n]{1,250}$",
    r"^\s*(<@[a-z0-9]+(\|[^>\n]{1,40})?>|[\w.'-]{1,40}( [\w.'-]{1,40})?) cleared the channel (topic|purpose|description)\.?\s*$",
    // dave pinned a message to this channel / unpinned an item from this channel
    r"^\s*(<@[a-z0-9]+(\|[^>\n]{1,40})?>|[\w.'-]{1,40}( [\w.'-]{1,40})?) (pinned|unpinned) (a message|an item|a file) (to|from) this (channel|conversation)\.?\s*$",
    // <@U123> uploaded a file: report.pdf
    r"^\s*(<@[a-z0-9]+(\|[^>\n]{1,40})?>|[\w.'-]{1,40}( [\w.'-]{1,40})?) (uploaded|shared) (a |an )?(file|image|snippet|post)(: [^\n]{1,120})?\.?\s*$",
    // grace started a call / frank ended the call
    r"^\s*(<@[a-z0-9]+(\|[^>\n]{1,40})?>|[\w.'-]{1,40}( [\w.'-]{1,40})?) (started|ended) (a|the) call\.?\s*$",
    // The call ended after 12 minutes / a call was started
    r"^\s*(a |the )?call (has |was )?(started|ended)( after [\w ]{1,40})?\.?\s*$",
    // heidi renamed the channel from "dev" to "engineering" / ivan archived the channel
    r#"^\s*(<@[a-z0-9]+(\|[^>\n]{1,40})?>|[\w.'-]{1,40}( [\w.'-]{1,40})?) renamed the channel (from ("[^"\n]{1,80}"|#?[\w.-]{1,80}) )?to ("[^"\n]{1,80}"|#?[\w.-]{1,80})\.?\s*$"#,
    r"^\s*(<@[a-z0-9]+(\|[^>\n]{1,40})?>|[\w.'-]{1,40}( [\w.'-]{1,40})?) (archived|unarchived) the channel\.?\s*$",
    r"^\s*(this )?channel (was|has been) (archived|unarchived)\.?\s*$",
];

/// Length thresholds for the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityConfig {
    pub min_chunk_length: usize,
    pub min_chat_message_length: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_chunk_length: defaults::MIN_CHUNK_LENGTH,
            min_chat_message_length: defaults::MIN_CHAT_MESSAGE_LENGTH,
        }
    }
}

impl From<&RetrievalConfig> for QualityConfig {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            min_chunk_length: config.min_chunk_length,
            min_chat_message_length: config.min_chat_message_length,
        }
    }
}

/// Why a candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    ChatNoise,
    ChatTooShort,
    TooShort,
}

/// Predicate filter over candidate text and source type.
#[derive(Debug, Clone)]
pub struct QualityFilter {
    config: QualityConfig,
    noise: RegexSet,
}

impl QualityFilter {
    pub fn new(config: QualityConfig) -> Result<Self> {
        Self::with_patterns(config, CHAT_NOISE_PATTERNS)
    }

    /// Build with a custom set of chat noise patterns.
    pub fn with_patterns<I, S>(config: QualityConfig, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let noise = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| Error::Config(format!("Invalid chat noise pattern: {}", e)))?;
        Ok(Self { config, noise })
    }

    pub fn config(&self) -> QualityConfig {
        self.config
    }

    /// Whether `text` is a chat system notice.
    pub fn is_chat_noise(&self, text: &str) -> bool {
        self.noise.is_match(text)
    }

    /// The reason `candidate` would be dropped, if any.
    pub fn rejection(&self, candidate: &Candidate) -> Option<Rejection> {
        let trimmed = candidate.text.trim();
        let length = trimmed.chars().count();

        if candidate.source_type.is_chat() {
            if self.is_chat_noise(trimmed) {
                return Some(Rejection::ChatNoise);
            }
            if length < self.config.min_chat_message_length {
                return Some(Rejection::ChatTooShort);
            }
        }
        if length < self.config.min_chunk_length {
            return Some(Rejection::TooShort);
        }
        None
    }

    pub fn accepts(&self, candidate: &Candidate) -> bool {
        self.rejection(candidate).is_none()
    }

    /// Keep the candidates that pass, in their original order.
    pub fn filter(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let input_count = candidates.len();
        let kept: Vec<Candidate> = candidates.into_iter().filter(|c| self.accepts(c)).collect();
        debug!(
            subsystem = "search",
            component = "quality",
            input_count,
            result_count = kept.len(),
            "Quality filter applied"
        );
        kept
    }
}
