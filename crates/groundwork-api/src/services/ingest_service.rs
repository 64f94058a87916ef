//! Source sync: chunk, embed, and replace a project's chunks for one
//! source type.
//!
//! Each document is chunked and its chunks are embedded in a single
//! backend call. Documents are processed concurrently, up to
//! `concurrency` at a time. A document that fails is reported and
//! skipped; the remaining documents are written in one transactional
//! replace. When every document of a non-empty batch fails, the stored
//! chunks are left untouched.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use groundwork_core::{
    defaults, ChunkRepository, DocumentOutcome, EmbeddingBackend, Error, IngestReport, NewChunk,
    Result, SourceDocument, SourceType,
};
use groundwork_db::LineChunker;

/// Service for the sync endpoint.
pub struct IngestService {
    chunks: Arc<dyn ChunkRepository>,
    embedder: Arc<dyn EmbeddingBackend>,
    chunker: LineChunker,
    concurrency: usize,
}

impl IngestService {
    pub fn new(
        chunks: Arc<dyn ChunkRepository>,
        embedder: Arc<dyn EmbeddingBackend>,
        chunker: LineChunker,
    ) -> Self {
        Self {
            chunks,
            embedder,
            chunker,
            concurrency: defaults::INGEST_CONCURRENCY,
        }
    }

    /// Number of documents embedded at the same time.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Chunk and embed a single document.
    async fn prepare(
        &self,
        project_id: i64,
        source_type: SourceType,
        doc: &SourceDocument,
    ) -> Result<Vec<NewChunk>> {
        let windows = self.chunker.chunk(doc);
        if windows.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = windows.iter().map(|w| w.text.clone()).collect();
        let embeddings = self.embedder.embed_texts(&texts).await?;
        if embeddings.len() != windows.len() {
            return Err(Error::Ingestion(format!(
                "Expected {} embeddings for {}, got {}",
                windows.len(),
                doc.source_id,
                embeddings.len()
            )));
        }

        let dimension = self.embedder.dimension();
        windows
            .into_iter()
            .zip(embeddings)
            .map(|(window, embedding)| {
                let chunk = NewChunk {
                    project_id,
                    source_type,
                    source_id: window.source_id,
                    text: window.text,
                    embedding,
                    metadata: window.metadata,
                };
                chunk.validate(Some(dimension))?;
                Ok(chunk)
            })
            .collect()
    }

    /// Replace the stored chunks of `project_id`/`source_type` with the
    /// chunks of `documents`.
    #[instrument(skip(self, documents), fields(subsystem = "ingest", component = "sync", op = "sync", source_type = %source_type, input_count = documents.len()))]
    pub async fn sync(
        &self,
        project_id: i64,
        source_type: SourceType,
        documents: Vec<SourceDocument>,
    ) -> Result<IngestReport> {
        let start = Instant::now();
        let total = documents.len();

        let mut results: Vec<(usize, String, Result<Vec<NewChunk>>)> =
            stream::iter(0..total)
                .map(|index| {
                    let doc = &documents[index];
                    async move {
                        let prepared = self.prepare(project_id, source_type, doc).await;
                        (index, doc.source_id.clone(), prepared)
                    }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
        results.sort_by_key(|(index, _, _)| *index);

        let mut outcomes = Vec::with_capacity(total);
        let mut new_chunks = Vec::new();
        for (_, source_id, prepared) in results {
            match prepared {
                Ok(chunks) => {
                    debug!(source_id = %source_id, chunk_count = chunks.len(), "Document prepared");
                    outcomes.push(DocumentOutcome {
                        source_id,
                        chunks: chunks.len(),
                        error: None,
                    });
                    new_chunks.extend(chunks);
                }
                Err(e) => {
                    warn!(source_id = %source_id, error = %e, "Document skipped");
                    outcomes.push(DocumentOutcome {
                        source_id,
                        chunks: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
        if total > 0 && failed == total {
            warn!(
                failed,
                "Every document failed, keeping previously stored chunks"
            );
            return Ok(IngestReport {
                project_id,
                source_type,
                documents: outcomes,
                chunks_stored: 0,
                replaced: false,
            });
        }

        let chunks_stored = self
            .chunks
            .replace_source(project_id, source_type, new_chunks)
            .await?;

        info!(
            documents = total,
            failed,
            chunk_count = chunks_stored,
            duration_ms = start.elapsed().as_millis() as u64,
            "Source synced"
        );

        Ok(IngestReport {
            project_id,
            source_type,
            documents: outcomes,
            chunks_stored,
            replaced: true,
        })
    }
}
