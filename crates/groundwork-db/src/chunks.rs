//! Chunk repository implementation (PostgreSQL + pgvector).

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use pgvector::Vector;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use groundwork_core::{
    defaults, new_v7, Candidate, Chunk, ChunkRepository, Error, NewChunk, Result, SourceType,
};

/// PostgreSQL implementation of ChunkRepository.
///
/// Distances are computed in the database with pgvector's Euclidean
/// operator (`<->`), backed by an HNSW `vector_l2_ops` index. Searches
/// that the index returns short for a project fall back to an exact scan.
#[derive(Clone)]
pub struct PgChunkRepository {
    pool: Pool<Postgres>,
}

impl PgChunkRepository {
    /// Create a new PgChunkRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a chunk within an existing transaction.
    pub async fn insert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        chunk: &NewChunk,
    ) -> Result<Uuid> {
        chunk.validate(None)?;
        let id = new_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO chunk (id, project_id, source_type, source_id, chunk_text, embedding, metadata, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)",
        )
        .bind(id)
        .bind(chunk.project_id)
        .bind(chunk.source_type.as_str())
        .bind(&chunk.source_id)
        .bind(&chunk.text)
        .bind(&chunk.embedding)
        .bind(&chunk.metadata)
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    /// Delete all chunks of a project/source-type within an existing transaction.
    pub async fn delete_source_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        project_id: i64,
        source_type: SourceType,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chunk WHERE project_id = $1 AND source_type = $2")
            .bind(project_id)
            .bind(source_type.as_str())
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }

    /// All chunks of a project/source-type, ordered by source id.
    pub async fn list_for_source(
        &self,
        project_id: i64,
        source_type: SourceType,
    ) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(
            "SELECT id, project_id, source_type, source_id, chunk_text, embedding, metadata, created_at, updated_at
             FROM chunk
             WHERE project_id = $1 AND source_type = $2
             ORDER BY source_id",
        )
        .bind(project_id)
        .bind(source_type.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(row_to_chunk).collect()
    }
}

const SEARCH_SQL: &str = "SELECT id, project_id, source_type, source_id, chunk_text, metadata,
        (embedding <-> $2) AS distance
 FROM chunk
 WHERE project_id = $1
 ORDER BY embedding <-> $2, id
 LIMIT $3";

/// HNSW candidate list size for a query asking for `top_k` results.
fn ef_search_for(top_k: usize) -> u32 {
    let wanted = (top_k as u64).saturating_mul(defaults::HNSW_EF_SEARCH_PER_RESULT as u64);
    wanted.clamp(
        defaults::HNSW_EF_SEARCH_MIN as u64,
        defaults::HNSW_EF_SEARCH_MAX as u64,
    ) as u32
}

fn parse_source_type(row: &PgRow) -> Result<SourceType> {
    let raw: String = row.try_get("source_type").map_err(Error::Database)?;
    raw.parse()
        .map_err(|_| Error::Internal(format!("Stored chunk has unknown source type: {}", raw)))
}

fn row_to_chunk(row: &PgRow) -> Result<Chunk> {
    Ok(Chunk {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        source_type: parse_source_type(row)?,
        source_id: row.try_get("source_id")?,
        text: row.try_get("chunk_text")?,
        embedding: row.try_get("embedding")?,
        metadata: row.try_get("metadata")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_candidate(row: &PgRow) -> Result<Candidate> {
    Ok(Candidate {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        source_type: parse_source_type(row)?,
        source_id: row.try_get("source_id")?,
        text: row.try_get("chunk_text")?,
        metadata: row.try_get("metadata")?,
        distance: row.try_get("distance")?,
    })
}

#[async_trait]
impl ChunkRepository for PgChunkRepository {
    async fn insert(&self, chunk: NewChunk) -> Result<Uuid> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let id = self.insert_tx(&mut tx, &chunk).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(id)
    }

    async fn delete_source(&self, project_id: i64, source_type: SourceType) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let deleted = self.delete_source_tx(&mut tx, project_id, source_type).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(deleted)
    }

    #[instrument(skip(self, chunks), fields(subsystem = "db", component = "chunks", op = "replace_source", source_type = %source_type, chunk_count = chunks.len()))]
    async fn replace_source(
        &self,
        project_id: i64,
        source_type: SourceType,
        chunks: Vec<NewChunk>,
    ) -> Result<u64> {
        let start = Instant::now();

        if let Some(foreign) = chunks
            .iter()
            .find(|c| c.project_id != project_id || c.source_type != source_type)
        {
            return Err(Error::InvalidInput(format!(
                "Chunk {} does not belong to project {} / {}",
                foreign.source_id, project_id, source_type
            )));
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let deleted = self.delete_source_tx(&mut tx, project_id, source_type).await?;

        let mut inserted = 0u64;
        for chunk in &chunks {
            self.insert_tx(&mut tx, chunk).await?;
            inserted += 1;
        }
        tx.commit().await.map_err(Error::Database)?;

        info!(
            deleted,
            inserted,
            duration_ms = start.elapsed().as_millis() as u64,
            "Replaced source chunks"
        );
        Ok(inserted)
    }

    #[instrument(skip(self, query), fields(subsystem = "db", component = "chunks", op = "search"))]
    async fn search(&self, project_id: i64, query: &Vector, top_k: usize) -> Result<Vec<Candidate>> {
        if top_k == 0 {
            return Ok(vec![]);
        }
        let start = Instant::now();
        let ef_search = ef_search_for(top_k);

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // SET cannot take bind parameters; ef_search is a clamped integer.
        let set_ef_search = format!("SET LOCAL hnsw.ef_search = {}", ef_search);
        sqlx::query(&set_ef_search)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let mut rows = sqlx::query(SEARCH_SQL)
            .bind(project_id)
            .bind(query)
            .bind(top_k as i64)
            .fetch_all(&mut *tx)
            .await
            .map_err(Error::Database)?;

        // The HNSW scan is shared by every project and the project filter
        // runs after it, so a project outnumbered near the query can come
        // back short. Re-run as an exact scan, which returns
        // min(top_k, project size) rows.
        let exact = rows.len() < top_k;
        if exact {
            sqlx::query("SET LOCAL enable_indexscan = off")
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
            rows = sqlx::query(SEARCH_SQL)
                .bind(project_id)
                .bind(query)
                .bind(top_k as i64)
                .fetch_all(&mut *tx)
                .await
                .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;

        let candidates = rows
            .iter()
            .map(row_to_candidate)
            .collect::<Result<Vec<_>>>()?;

        debug!(
            result_count = candidates.len(),
            ef_search,
            exact,
            duration_ms = start.elapsed().as_millis() as u64,
            "Vector search complete"
        );
        Ok(candidates)
    }

    async fn count_for_project(&self, project_id: i64) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM chunk WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.try_get("count")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ef_search_never_below_minimum() {
        assert_eq!(ef_search_for(1), defaults::HNSW_EF_SEARCH_MIN);
    }

    #[test]
    fn test_ef_search_scales_with_top_k() {
        assert_eq!(ef_search_for(30), 30 * defaults::HNSW_EF_SEARCH_PER_RESULT);
        assert!(ef_search_for(30) as usize >= 30);
    }

    #[test]
    fn test_ef_search_capped() {
        assert_eq!(ef_search_for(10_000), defaults::HNSW_EF_SEARCH_MAX);
        assert_eq!(ef_search_for(usize::MAX), defaults::HNSW_EF_SEARCH_MAX);
    }
}
