//! In-memory [`ChunkRepository`] and [`ProjectDirectory`] implementations.
//!
//! Used by API tests and local development without PostgreSQL. Search is a
//! brute-force Euclidean scan with the same ordering as the pgvector query:
//! ascending distance, ties broken by chunk id.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use pgvector::Vector;
use tokio::sync::RwLock;
use uuid::Uuid;

use groundwork_core::{
    new_v7, Candidate, Chunk, ChunkRepository, Error, NewChunk, ProjectDirectory, Result,
    SourceType,
};

/// Euclidean distance. Vectors of different lengths are infinitely far apart.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = (*x as f64) - (*y as f64);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

fn to_chunk(chunk: NewChunk) -> Chunk {
    let now = Utc::now();
    Chunk {
        id: new_v7(),
        project_id: chunk.project_id,
        source_type: chunk.source_type,
        source_id: chunk.source_id,
        text: chunk.text,
        embedding: chunk.embedding,
        metadata: chunk.metadata,
        created_at: now,
        updated_at: now,
    }
}

/// Chunk store held in process memory.
#[derive(Default)]
pub struct InMemoryChunkRepository {
    chunks: RwLock<Vec<Chunk>>,
}

impl InMemoryChunkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored chunk of a project/source-type pair.
    pub async fn list_for_source(&self, project_id: i64, source_type: SourceType) -> Vec<Chunk> {
        self.chunks
            .read()
            .await
            .iter()
            .filter(|c| c.project_id == project_id && c.source_type == source_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ChunkRepository for InMemoryChunkRepository {
    async fn insert(&self, chunk: NewChunk) -> Result<Uuid> {
        chunk.validate(None)?;
        let stored = to_chunk(chunk);
        let id = stored.id;
        self.chunks.write().await.push(stored);
        Ok(id)
    }

    async fn delete_source(&self, project_id: i64, source_type: SourceType) -> Result<u64> {
        let mut chunks = self.chunks.write().await;
        let before = chunks.len();
        chunks.retain(|c| !(c.project_id == project_id && c.source_type == source_type));
        Ok((before - chunks.len()) as u64)
    }

    async fn replace_source(
        &self,
        project_id: i64,
        source_type: SourceType,
        chunks: Vec<NewChunk>,
    ) -> Result<u64> {
        for chunk in &chunks {
            if chunk.project_id != project_id || chunk.source_type != source_type {
                return Err(Error::InvalidInput(format!(
                    "Chunk {} does not belong to project {} / {}",
                    chunk.source_id, project_id, source_type
                )));
            }
            chunk.validate(None)?;
        }

        let fresh: Vec<Chunk> = chunks.into_iter().map(to_chunk).collect();
        let inserted = fresh.len() as u64;

        // A single write guard makes the swap atomic for readers.
        let mut stored = self.chunks.write().await;
        stored.retain(|c| !(c.project_id == project_id && c.source_type == source_type));
        stored.extend(fresh);
        Ok(inserted)
    }

    async fn search(&self, project_id: i64, query: &Vector, top_k: usize) -> Result<Vec<Candidate>> {
        let chunks = self.chunks.read().await;
        let query = query.as_slice();

        let mut candidates: Vec<Candidate> = chunks
            .iter()
            .filter(|c| c.project_id == project_id)
            .map(|c| Candidate {
                id: c.id,
                project_id: c.project_id,
                source_type: c.source_type,
                source_id: c.source_id.clone(),
                text: c.text.clone(),
                metadata: c.metadata.clone(),
                distance: l2_distance(c.embedding.as_slice(), query),
            })
            .collect();

        candidates.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.id.cmp(&b.id))
        });
        candidates.truncate(top_k);
        Ok(candidates)
    }

    async fn count_for_project(&self, project_id: i64) -> Result<i64> {
        Ok(self
            .chunks
            .read()
            .await
            .iter()
            .filter(|c| c.project_id == project_id)
            .count() as i64)
    }
}

/// Fixed set of known projects.
#[derive(Default)]
pub struct InMemoryProjectDirectory {
    projects: RwLock<HashMap<i64, String>>,
}

impl InMemoryProjectDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_projects<I, S>(projects: I) -> Self
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        Self {
            projects: RwLock::new(projects.into_iter().map(|(id, n)| (id, n.into())).collect()),
        }
    }

    pub async fn insert(&self, project_id: i64, name: impl Into<String>) {
        self.projects.write().await.insert(project_id, name.into());
    }
}

#[async_trait]
impl ProjectDirectory for InMemoryProjectDirectory {
    async fn project_name(&self, project_id: i64) -> Result<Option<String>> {
        Ok(self.projects.read().await.get(&project_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk(project_id: i64, source_type: SourceType, source_id: &str, v: [f32; 2]) -> NewChunk {
        NewChunk {
            project_id,
            source_type,
            source_id: source_id.to_string(),
            text: format!("text of {}", source_id),
            embedding: Vector::from(v.to_vec()),
            metadata: json!({}),
        }
    }

    #[test]
    fn test_l2_distance() {
        assert_eq!(l2_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(l2_distance(&[1.0], &[1.0]), 0.0);
        assert!(l2_distance(&[1.0], &[1.0, 2.0]).is_infinite());
    }

    #[tokio::test]
    async fn test_search_orders_by_distance_and_scopes_project() {
        let repo = InMemoryChunkRepository::new();
        repo.insert(chunk(1, SourceType::Code, "far", [5.0, 0.0])).await.unwrap();
        repo.insert(chunk(1, SourceType::Chat, "near", [1.0, 0.0])).await.unwrap();
        repo.insert(chunk(2, SourceType::Code, "other", [0.0, 0.0])).await.unwrap();

        let query = Vector::from(vec![0.0, 0.0]);
        let results = repo.search(1, &query, 10).await.unwrap();

        let ids: Vec<&str> = results.iter().map(|c| c.source_id.as_str()).collect();
        assert_eq!(ids, vec!["near", "far"]);
        assert!(results.iter().all(|c| c.project_id == 1));
        assert_eq!(results[0].distance, 1.0);
    }

    #[tokio::test]
    async fn test_search_respects_top_k() {
        let repo = InMemoryChunkRepository::new();
        for i in 0..5 {
            repo.insert(chunk(1, SourceType::Code, &format!("c{}", i), [i as f32, 0.0]))
                .await
                .unwrap();
        }
        let query = Vector::from(vec![0.0, 0.0]);
        assert_eq!(repo.search(1, &query, 3).await.unwrap().len(), 3);
        assert!(repo.search(1, &query, 0).await.unwrap().is_empty());
        assert!(repo.search(99, &query, 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_source_only_touches_its_pair() {
        let repo = InMemoryChunkRepository::new();
        repo.insert(chunk(1, SourceType::Code, "old", [0.0, 0.0])).await.unwrap();
        repo.insert(chunk(1, SourceType::Chat, "chat", [0.0, 0.0])).await.unwrap();
        repo.insert(chunk(2, SourceType::Code, "p2", [0.0, 0.0])).await.unwrap();

        let inserted = repo
            .replace_source(
                1,
                SourceType::Code,
                vec![
                    chunk(1, SourceType::Code, "new-a", [1.0, 0.0]),
                    chunk(1, SourceType::Code, "new-b", [2.0, 0.0]),
                ],
            )
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        let code: Vec<String> = repo
            .list_for_source(1, SourceType::Code)
            .await
            .into_iter()
            .map(|c| c.source_id)
            .collect();
        assert_eq!(code, vec!["new-a", "new-b"]);
        assert_eq!(repo.list_for_source(1, SourceType::Chat).await.len(), 1);
        assert_eq!(repo.list_for_source(2, SourceType::Code).await.len(), 1);
        assert_eq!(repo.count_for_project(1).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_replace_source_rejects_foreign_chunk_without_changes() {
        let repo = InMemoryChunkRepository::new();
        repo.insert(chunk(1, SourceType::Code, "keep", [0.0, 0.0])).await.unwrap();

        let result = repo
            .replace_source(1, SourceType::Code, vec![chunk(2, SourceType::Code, "x", [0.0, 0.0])])
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(repo.list_for_source(1, SourceType::Code).await.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_blank_text() {
        let repo = InMemoryChunkRepository::new();
        let mut c = chunk(1, SourceType::Code, "blank", [0.0, 0.0]);
        c.text = "   ".to_string();
        assert!(repo.insert(c).await.is_err());
        assert_eq!(repo.count_for_project(1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_source() {
        let repo = InMemoryChunkRepository::new();
        repo.insert(chunk(1, SourceType::Issue, "i1", [0.0, 0.0])).await.unwrap();
        repo.insert(chunk(1, SourceType::Issue, "i2", [0.0, 0.0])).await.unwrap();
        assert_eq!(repo.delete_source(1, SourceType::Issue).await.unwrap(), 2);
        assert_eq!(repo.delete_source(1, SourceType::Issue).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_project_directory() {
        let dir = InMemoryProjectDirectory::with_projects([(1, "Acme")]);
        assert_eq!(dir.project_name(1).await.unwrap().as_deref(), Some("Acme"));
        assert_eq!(dir.project_name(2).await.unwrap(), None);
        dir.insert(2, "Beta").await;
        assert_eq!(dir.project_name(2).await.unwrap().as_deref(), Some("Beta"));
    }
}
