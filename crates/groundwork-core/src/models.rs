//! Core data models for groundwork.
//!
//! These types are shared across all groundwork crates: the ingestion input
//! (source documents), the stored retrievable unit (chunks), the per-query
//! candidates, and the chat request/response shapes exposed over HTTP.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Embedding vector type (re-exported from pgvector).
pub use pgvector::Vector;

// =============================================================================
// SOURCE TYPES
// =============================================================================

/// Kind of connected source a chunk was ingested from.
///
/// Stored as its lowercase name. Connector-specific names (`github`,
/// `slack`) are accepted as aliases when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Source code files from a repository.
    #[serde(alias = "github", alias = "code_file", alias = "code-file")]
    Code,
    /// Chat channel messages.
    #[serde(alias = "slack", alias = "chat_message", alias = "chat-message")]
    Chat,
    /// Issue tracker items.
    Issue,
    /// Free-form documents (wikis, markdown pages).
    #[serde(alias = "doc", alias = "docs")]
    Document,
}

impl SourceType {
    /// Canonical lowercase name, as stored in the chunk table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Chat => "chat",
            Self::Issue => "issue",
            Self::Document => "document",
        }
    }

    /// Chat sources get stricter noise and length filtering.
    pub fn is_chat(&self) -> bool {
        matches!(self, Self::Chat)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "code" | "github" | "code_file" | "code-file" => Ok(Self::Code),
            "chat" | "slack" | "chat_message" | "chat-message" => Ok(Self::Chat),
            "issue" | "issues" => Ok(Self::Issue),
            "document" | "doc" | "docs" => Ok(Self::Document),
            other => Err(Error::InvalidInput(format!("Unknown source type: {}", other))),
        }
    }
}

// =============================================================================
// INGESTION TYPES
// =============================================================================

/// Raw document handed over by a connector for one project/source-type batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDocument {
    /// File path, message id, or other connector-specific identifier.
    #[serde(alias = "path")]
    pub source_id: String,
    pub content: String,
    #[serde(default)]
    pub size: Option<u64>,
    /// Connector metadata (file path, channel, author...). Free-form.
    #[serde(default = "empty_metadata")]
    pub metadata: JsonValue,
}

fn empty_metadata() -> JsonValue {
    JsonValue::Object(Default::default())
}

/// A chunk ready for storage: text plus its embedding.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub project_id: i64,
    pub source_type: SourceType,
    pub source_id: String,
    pub text: String,
    pub embedding: Vector,
    pub metadata: JsonValue,
}

impl NewChunk {
    /// Enforce the chunk invariants: non-blank text, non-empty embedding,
    /// and, when known, the configured dimension.
    pub fn validate(&self, dimension: Option<usize>) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "Chunk {} has empty text",
                self.source_id
            )));
        }
        let len = self.embedding.as_slice().len();
        if len == 0 {
            return Err(Error::Embedding(format!(
                "Chunk {} has an empty embedding",
                self.source_id
            )));
        }
        if let Some(expected) = dimension {
            if len != expected {
                return Err(Error::Embedding(format!(
                    "Chunk {} embedding has dimension {}, expected {}",
                    self.source_id, len, expected
                )));
            }
        }
        Ok(())
    }
}

/// A persisted chunk row.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: Uuid,
    pub project_id: i64,
    pub source_type: SourceType,
    pub source_id: String,
    pub text: String,
    pub embedding: Vector,
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of ingesting one source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOutcome {
    pub source_id: String,
    pub chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a sync batch for one project and source type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub project_id: i64,
    pub source_type: SourceType,
    pub documents: Vec<DocumentOutcome>,
    pub chunks_stored: u64,
    /// False when every document failed and the stored set was left as is.
    pub replaced: bool,
}

impl IngestReport {
    pub fn failed_count(&self) -> usize {
        self.documents.iter().filter(|d| d.error.is_some()).count()
    }
}

/// Request body for a source sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    pub documents: Vec<SourceDocument>,
}

// =============================================================================
// RETRIEVAL TYPES
// =============================================================================

/// A chunk annotated with its distance to one query. Lower is more relevant.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: Uuid,
    pub project_id: i64,
    pub source_type: SourceType,
    pub source_id: String,
    pub text: String,
    pub metadata: JsonValue,
    pub distance: f64,
}

/// One turn of prior conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub content: String,
    /// "user" or "assistant"; other values are rendered verbatim.
    pub sender: String,
}

/// A cited passage returned alongside an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: Uuid,
    pub source_type: SourceType,
    pub source_id: String,
    pub snippet: String,
    pub metadata: JsonValue,
}

/// Generated (or fallback) answer with its citations.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<Source>,
    /// True when the templated fallback was used instead of the model.
    pub fallback: bool,
}

// =============================================================================
// CHAT API TYPES
// =============================================================================

/// Chat request from the UI collaborator.
///
/// Fields are optional so that missing values are reported as validation
/// errors rather than deserialization failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub project_id: Option<i64>,
    pub message: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

impl ChatRequest {
    /// Returns the project id and trimmed message, or an `InvalidInput` error.
    pub fn validate(&self) -> Result<(i64, &str)> {
        let project_id = self
            .project_id
            .ok_or_else(|| Error::InvalidInput("projectId is required".to_string()))?;
        let message = self
            .message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| Error::InvalidInput("message is required".to_string()))?;
        Ok((project_id, message))
    }
}

/// Diagnostic metadata attached to a chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerMetadata {
    pub project_name: String,
    pub chunks_found: usize,
    pub source_types_found: Vec<SourceType>,
    pub source_type_distribution: BTreeMap<String, usize>,
    pub timestamp: DateTime<Utc>,
    pub fallback: bool,
}

/// Chat response returned to the UI collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    pub sources: Vec<Source>,
    pub metadata: AnswerMetadata,
}

// =============================================================================
// METADATA HELPERS
// =============================================================================

/// Look up a string value in a metadata map without assuming it exists.
pub fn meta_str<'a>(metadata: &'a JsonValue, key: &str) -> Option<&'a str> {
    metadata
        .get(key)
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Look up an unsigned integer value in a metadata map.
pub fn meta_u64(metadata: &JsonValue, key: &str) -> Option<u64> {
    metadata.get(key).and_then(JsonValue::as_u64)
}
