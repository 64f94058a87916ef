//! Centralized default constants for groundwork.
//!
//! **This module is the single source of truth** for shared default values.
//! Configuration types fall back to these when the environment does not
//! override them.

// =============================================================================
// CHUNKING
// =============================================================================

/// Lines per chunk window for ingested source documents.
pub const LINES_PER_CHUNK: usize = 20;

// =============================================================================
// EMBEDDING
// =============================================================================

/// Default local embedding model identifier.
pub const EMBED_MODEL: &str = "all-minilm-l6-v2";

/// Embedding vector dimension for all-minilm-l6-v2.
pub const EMBED_DIMENSION: usize = 384;

/// Pooling strategy applied to token embeddings.
pub const EMBED_POOLING: &str = "mean";

/// Whether embedding vectors are L2-normalized.
pub const EMBED_NORMALIZE: bool = true;

/// Timeout for embedding requests against a remote backend, in seconds.
pub const EMBED_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// RETRIEVAL
// =============================================================================

/// Candidates fetched from the chunk store per question.
///
/// Deliberately larger than the working set so diversity selection has
/// enough material across source types.
pub const MAX_CHUNKS_TO_RETRIEVE: usize = 30;

/// Target size of the working set handed to generation.
pub const MAX_CHUNKS_TO_PROCESS: usize = 10;

/// Guaranteed slots per source type during diversity selection.
pub const MAX_CHUNKS_PER_SOURCE_TYPE: usize = 4;

/// Minimum trimmed length of any chunk to be considered.
pub const MIN_CHUNK_LENGTH: usize = 10;

/// Minimum trimmed length of a chat message chunk to be considered.
pub const MIN_CHAT_MESSAGE_LENGTH: usize = 20;

/// Lower bound for the HNSW candidate list (`hnsw.ef_search`) per query.
pub const HNSW_EF_SEARCH_MIN: u32 = 40;

/// Upper bound for `hnsw.ef_search`; pgvector rejects larger values.
pub const HNSW_EF_SEARCH_MAX: u32 = 1000;

/// `hnsw.ef_search` per requested result. The index scan is shared by all
/// projects and the project filter runs after it.
pub const HNSW_EF_SEARCH_PER_RESULT: u32 = 8;

// =============================================================================
// PROMPT / ANSWER
// =============================================================================

/// Conversation turns rendered into the prompt.
pub const HISTORY_TURNS: usize = 6;

/// Snippet length in characters for cited sources.
pub const SNIPPET_LENGTH: usize = 200;

/// Context excerpt length in characters for the fallback answer.
pub const FALLBACK_EXCERPT_LENGTH: usize = 500;

// =============================================================================
// DATABASE
// =============================================================================

/// Maximum connections in the PostgreSQL pool.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Connections kept open while idle.
pub const DB_MIN_CONNECTIONS: u32 = 1;

/// Seconds a request waits for a free connection.
pub const DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Seconds before an idle connection is closed.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Ollama base URL.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default generation model name (Ollama).
pub const GEN_MODEL: &str = "llama3.1:8b";

/// Timeout for generation requests in seconds.
pub const GEN_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// INGESTION
// =============================================================================

/// Documents embedded concurrently during a sync batch.
pub const INGEST_CONCURRENCY: usize = 4;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Maximum request body size in bytes for ingestion batches (32 MB).
pub const MAX_BODY_SIZE_BYTES: usize = 32 * 1024 * 1024;
