//! # groundwork-search
//!
//! Query-time retrieval for groundwork.
//!
//! This crate provides:
//! - Quality filtering of chat noise and short fragments
//! - Source-type-diversity selection of a bounded working set
//! - The retrieval pipeline (embed, search, filter, select)
//!
//! ## Example
//!
//! ```ignore
//! use groundwork_search::RetrievalPipeline;
//!
//! let pipeline = RetrievalPipeline::new(chunks, embedder, &RetrievalConfig::from_env())?;
//! let retrieval = pipeline.retrieve(project_id, "Where is the retry logic?").await?;
//! for candidate in &retrieval.working_set {
//!     println!("{:.3} {}", candidate.distance, candidate.source_id);
//! }
//! ```

pub mod diversity;
pub mod pipeline;
pub mod quality;

// Re-export core types
pub use groundwork_core::*;

pub use diversity::{
    source_type_distribution, source_types_found, DiversityConfig, DiversitySelector,
};
pub use pipeline::{Retrieval, RetrievalPipeline};
pub use quality::{QualityConfig, QualityFilter, Rejection, CHAT_NOISE_PATTERNS};
