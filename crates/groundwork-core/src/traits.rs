//! Core traits for groundwork abstractions.
//!
//! These traits define the seams between the pipeline and its backends,
//! enabling pluggable storage and inference implementations and
//! deterministic tests.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::*;

// =============================================================================
// CHUNK STORE TRAITS
// =============================================================================

/// Persistent chunk storage scoped by project and source type.
///
/// Rows are never updated in place: a resync replaces every chunk of a
/// project/source-type pair.
#[async_trait]
pub trait ChunkRepository: Send + Sync {
    /// Append a single chunk. Returns the new chunk id.
    async fn insert(&self, chunk: NewChunk) -> Result<uuid::Uuid>;

    /// Delete every chunk for the project and source type.
    ///
    /// Returns the number of rows removed.
    async fn delete_source(&self, project_id: i64, source_type: SourceType) -> Result<u64>;

    /// Atomically replace every chunk for the project and source type.
    ///
    /// Readers observe either the previous set or the new one, never an
    /// empty or partial set. Returns the number of rows inserted.
    async fn replace_source(
        &self,
        project_id: i64,
        source_type: SourceType,
        chunks: Vec<NewChunk>,
    ) -> Result<u64>;

    /// The `top_k` chunks of `project_id` nearest to `query`, by ascending
    /// Euclidean distance. Never returns chunks of another project.
    async fn search(&self, project_id: i64, query: &Vector, top_k: usize)
        -> Result<Vec<Candidate>>;

    /// Number of chunks stored for a project.
    async fn count_for_project(&self, project_id: i64) -> Result<i64>;
}

/// Resolves project ids owned by the (external) account system.
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    /// Display name of the project, or `None` if it does not exist.
    async fn project_name(&self, project_id: i64) -> Result<Option<String>>;
}

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for generating text embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for the given texts.
    ///
    /// Returns a vector of embedding vectors, one per input text.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>>;

    /// Get the expected dimension of embedding vectors.
    fn dimension(&self) -> usize;

    /// Get the model name being used.
    fn model_name(&self) -> &str;

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vector> {
        self.embed_texts(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("Backend returned no embedding".to_string()))
    }
}

/// Backend for text generation (LLM).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text given a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate text with system context.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;

    /// Check if the backend is available and responding.
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
