//! # groundwork-inference
//!
//! Embedding and generation backends for groundwork, plus the two pure
//! stages around the generative call.
//!
//! This crate provides:
//! - Local embedding via fastembed, loaded once and shared (feature `local`)
//! - Ollama embedding and generation backend (feature `ollama`)
//! - Prompt assembly from question, working set and history
//! - Answer generation with a deterministic fallback
//! - Mock backends for tests (feature `mock`)
//!
//! # Feature Flags
//!
//! - `ollama` (default): Enable Ollama backend
//! - `local` (default): Enable in-process fastembed embedding
//! - `mock`: Expose [`mock::MockInferenceBackend`] to dependent crates
//!
//! # Example
//!
//! ```rust,no_run
//! use groundwork_inference::OllamaBackend;
//! use groundwork_core::GenerationBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OllamaBackend::from_env().unwrap();
//!     let reply = backend.generate("Hello").await.unwrap();
//!     println!("{}", reply);
//! }
//! ```

pub mod answer;
pub mod prompt;
pub mod vector;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "local")]
pub mod local;

// Mock inference backend for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use groundwork_core::*;

pub use answer::{truncate_chars, AnswerGenerator, FALLBACK_NOTICE, NO_CONTEXT_ANSWER};
pub use prompt::{source_label, Prompt, PromptBuilder, CONTEXT_DELIMITER};
pub use vector::{finish_embeddings, normalize_l2};

#[cfg(feature = "ollama")]
pub use ollama::OllamaBackend;

#[cfg(feature = "local")]
pub use local::{LocalEmbedder, ModelSlot};
