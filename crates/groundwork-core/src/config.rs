//! Runtime configuration loaded from the environment.
//!
//! Every option falls back to the constant in [`crate::defaults`] when its
//! environment variable is unset or unparsable.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

// =============================================================================
// RETRIEVAL
// =============================================================================

/// Tuning for the retrieval-and-answer pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Candidates fetched from the chunk store per question.
    pub max_chunks_to_retrieve: usize,
    /// Target working-set size.
    pub max_chunks_to_process: usize,
    /// Guaranteed slots per source type.
    pub max_chunks_per_source_type: usize,
    /// Minimum trimmed length of any chunk.
    pub min_chunk_length: usize,
    /// Minimum trimmed length of a chat message chunk.
    pub min_chat_message_length: usize,
    /// Conversation turns rendered into the prompt.
    pub history_turns: usize,
    /// Citation snippet length in characters.
    pub snippet_length: usize,
    /// Context excerpt length in characters for the fallback answer.
    pub fallback_excerpt_length: usize,
    /// Lines per chunk at ingestion time.
    pub lines_per_chunk: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_chunks_to_retrieve: defaults::MAX_CHUNKS_TO_RETRIEVE,
            max_chunks_to_process: defaults::MAX_CHUNKS_TO_PROCESS,
            max_chunks_per_source_type: defaults::MAX_CHUNKS_PER_SOURCE_TYPE,
            min_chunk_length: defaults::MIN_CHUNK_LENGTH,
            min_chat_message_length: defaults::MIN_CHAT_MESSAGE_LENGTH,
            history_turns: defaults::HISTORY_TURNS,
            snippet_length: defaults::SNIPPET_LENGTH,
            fallback_excerpt_length: defaults::FALLBACK_EXCERPT_LENGTH,
            lines_per_chunk: defaults::LINES_PER_CHUNK,
        }
    }
}

impl RetrievalConfig {
    /// Load from `GROUNDWORK_*` environment variables.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_chunks_to_retrieve: env_or(
                "GROUNDWORK_MAX_CHUNKS_TO_RETRIEVE",
                d.max_chunks_to_retrieve,
            ),
            max_chunks_to_process: env_or(
                "GROUNDWORK_MAX_CHUNKS_TO_PROCESS",
                d.max_chunks_to_process,
            ),
            max_chunks_per_source_type: env_or(
                "GROUNDWORK_MAX_CHUNKS_PER_SOURCE_TYPE",
                d.max_chunks_per_source_type,
            ),
            min_chunk_length: env_or("GROUNDWORK_MIN_CHUNK_LENGTH", d.min_chunk_length),
            min_chat_message_length: env_or(
                "GROUNDWORK_MIN_CHAT_MESSAGE_LENGTH",
                d.min_chat_message_length,
            ),
            history_turns: env_or("GROUNDWORK_HISTORY_TURNS", d.history_turns),
            snippet_length: env_or("GROUNDWORK_SNIPPET_LENGTH", d.snippet_length),
            fallback_excerpt_length: env_or(
                "GROUNDWORK_FALLBACK_EXCERPT_LENGTH",
                d.fallback_excerpt_length,
            ),
            lines_per_chunk: env_or("GROUNDWORK_LINES_PER_CHUNK", d.lines_per_chunk),
        }
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("max_chunks_to_retrieve", self.max_chunks_to_retrieve),
            ("max_chunks_to_process", self.max_chunks_to_process),
            ("max_chunks_per_source_type", self.max_chunks_per_source_type),
            ("lines_per_chunk", self.lines_per_chunk),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(Error::Config(format!("{} must be greater than zero", name)));
            }
        }
        Ok(())
    }
}

// =============================================================================
// EMBEDDING
// =============================================================================

/// Pooling strategy over token embeddings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pooling {
    #[default]
    Mean,
}

impl FromStr for Pooling {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            other => Err(Error::Config(format!(
                "Unsupported pooling strategy: {} (only \"mean\" is supported)",
                other
            ))),
        }
    }
}

/// Which embedding backend serves both ingestion and queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// In-process ONNX model via fastembed.
    #[default]
    Local,
    /// Remote Ollama `/api/embed`.
    Ollama,
}

impl FromStr for EmbeddingProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "ollama" => Ok(Self::Ollama),
            other => Err(Error::Config(format!("Invalid embedding provider: {}", other))),
        }
    }
}

/// Fixed embedding configuration for the whole process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub model: String,
    pub dimension: usize,
    pub pooling: Pooling,
    pub normalize: bool,
    /// Where downloaded model files are cached (local provider only).
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            model: defaults::EMBED_MODEL.to_string(),
            dimension: defaults::EMBED_DIMENSION,
            pooling: Pooling::Mean,
            normalize: defaults::EMBED_NORMALIZE,
            cache_dir: None,
        }
    }
}

impl EmbeddingConfig {
    /// Load from `GROUNDWORK_EMBED_*` environment variables.
    ///
    /// Fails on an unknown provider or pooling strategy rather than silently
    /// falling back, since vectors from different models are not comparable.
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        let provider = match std::env::var("GROUNDWORK_EMBED_PROVIDER") {
            Ok(v) => v.parse()?,
            Err(_) => d.provider,
        };
        let pooling = match std::env::var("GROUNDWORK_EMBED_POOLING") {
            Ok(v) => v.parse()?,
            Err(_) => d.pooling,
        };
        Ok(Self {
            provider,
            model: std::env::var("GROUNDWORK_EMBED_MODEL").unwrap_or(d.model),
            dimension: env_or("GROUNDWORK_EMBED_DIM", d.dimension),
            pooling,
            normalize: env_or("GROUNDWORK_EMBED_NORMALIZE", d.normalize),
            cache_dir: std::env::var("GROUNDWORK_EMBED_CACHE_DIR")
                .ok()
                .map(PathBuf::from),
        })
    }
}

// =============================================================================
// GENERATION
// =============================================================================

/// Generative language service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::OLLAMA_URL.to_string(),
            model: defaults::GEN_MODEL.to_string(),
            timeout_secs: defaults::GEN_TIMEOUT_SECS,
        }
    }
}

impl GenerationConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            base_url: std::env::var("OLLAMA_BASE").unwrap_or(d.base_url),
            model: std::env::var("OLLAMA_GEN_MODEL").unwrap_or(d.model),
            timeout_secs: env_or("GROUNDWORK_GEN_TIMEOUT_SECS", d.timeout_secs),
        }
    }
}
