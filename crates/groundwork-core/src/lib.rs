//! # groundwork-core
//!
//! Core types, traits, and configuration for groundwork, the project
//! question-answering service.
//!
//! This crate provides the foundational data structures (chunks, candidates,
//! answers), the error type, and the trait seams (embedding, generation,
//! chunk storage, project lookup) that the other groundwork crates implement.

pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{EmbeddingConfig, EmbeddingProviderKind, GenerationConfig, Pooling, RetrievalConfig};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;

/// Generate a new UUIDv7 identifier (time-ordered).
#[inline]
pub fn new_v7() -> uuid::Uuid {
    uuid::Uuid::now_v7()
}
