//! Query-time retrieval: embed, search, filter, select.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument};

use groundwork_core::{Candidate, ChunkRepository, EmbeddingBackend, Result, RetrievalConfig};

use crate::diversity::{DiversityConfig, DiversitySelector};
use crate::quality::{QualityConfig, QualityFilter};

/// Outcome of one retrieval, with the counts seen at each stage.
#[derive(Debug, Clone)]
pub struct Retrieval {
    /// Candidates returned by the chunk store.
    pub retrieved: usize,
    /// Candidates left after quality filtering.
    pub filtered: usize,
    /// Final working set, ascending distance.
    pub working_set: Vec<Candidate>,
}

/// Runs the stages upstream of prompt assembly for one question.
///
/// Stages run one after another within the calling task. Any error fails
/// the retrieval; there is no degraded mode before generation.
pub struct RetrievalPipeline {
    chunks: Arc<dyn ChunkRepository>,
    embedder: Arc<dyn EmbeddingBackend>,
    filter: QualityFilter,
    selector: DiversitySelector,
    top_k: usize,
}

impl RetrievalPipeline {
    pub fn new(
        chunks: Arc<dyn ChunkRepository>,
        embedder: Arc<dyn EmbeddingBackend>,
        config: &RetrievalConfig,
    ) -> Result<Self> {
        Ok(Self {
            chunks,
            embedder,
            filter: QualityFilter::new(QualityConfig::from(config))?,
            selector: DiversitySelector::new(DiversityConfig::from(config)),
            top_k: config.max_chunks_to_retrieve,
        })
    }

    /// Pipeline with default retrieval settings.
    pub fn with_defaults(
        chunks: Arc<dyn ChunkRepository>,
        embedder: Arc<dyn EmbeddingBackend>,
    ) -> Result<Self> {
        Self::new(chunks, embedder, &RetrievalConfig::default())
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    #[instrument(skip(self, question), fields(subsystem = "search", component = "pipeline", op = "retrieve"))]
    pub async fn retrieve(&self, project_id: i64, question: &str) -> Result<Retrieval> {
        let start = Instant::now();

        let query = self.embedder.embed_query(question).await?;
        let candidates = self.chunks.search(project_id, &query, self.top_k).await?;
        let retrieved = candidates.len();

        let kept = self.filter.filter(candidates);
        let filtered = kept.len();

        let working_set = self.selector.select(kept);

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            retrieved,
            filtered,
            result_count = working_set.len(),
            duration_ms = elapsed,
            "Retrieval complete"
        );
        Ok(Retrieval {
            retrieved,
            filtered,
            working_set,
        })
    }
}
