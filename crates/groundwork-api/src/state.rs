//! Shared application state.

use std::sync::Arc;

use groundwork_core::{
    ChunkRepository, EmbeddingBackend, GenerationBackend, ProjectDirectory, Result,
    RetrievalConfig,
};
use groundwork_db::LineChunker;
use groundwork_inference::{AnswerGenerator, PromptBuilder};
use groundwork_search::RetrievalPipeline;

use crate::services::{AskService, IngestService};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub ask: Arc<AskService>,
    pub ingest: Arc<IngestService>,
    pub embedder: Arc<dyn EmbeddingBackend>,
    pub generator: Arc<dyn GenerationBackend>,
    pub projects: Arc<dyn ProjectDirectory>,
}

impl AppState {
    /// Wire the services from their backends.
    pub fn new(
        chunks: Arc<dyn ChunkRepository>,
        projects: Arc<dyn ProjectDirectory>,
        embedder: Arc<dyn EmbeddingBackend>,
        generator: Arc<dyn GenerationBackend>,
        config: &RetrievalConfig,
    ) -> Result<Self> {
        config.validate()?;

        let pipeline = RetrievalPipeline::new(chunks.clone(), embedder.clone(), config)?;
        let answers = AnswerGenerator::new(generator.clone())
            .with_snippet_length(config.snippet_length)
            .with_fallback_excerpt_length(config.fallback_excerpt_length);
        let ask = AskService::new(
            projects.clone(),
            pipeline,
            PromptBuilder::new(config.history_turns),
            answers,
        );
        let ingest = IngestService::new(
            chunks,
            embedder.clone(),
            LineChunker::new(config.lines_per_chunk),
        );

        Ok(Self {
            ask: Arc::new(ask),
            ingest: Arc::new(ingest),
            embedder,
            generator,
            projects,
        })
    }
}
