//! Integration tests for the pgvector chunk store.
//!
//! These need a PostgreSQL instance with the `vector` extension and the
//! workspace migrations applied. Run with:
//!
//! ```sh
//! DATABASE_URL=postgres://... cargo test -p groundwork-db -- --ignored
//! ```

use groundwork_db::{
    ChunkRepository, Database, NewChunk, ProjectDirectory, SourceType, Vector,
    DEFAULT_TEST_DATABASE_URL,
};
use serde_json::json;

const DIM: usize = 384;

async fn setup_test_db() -> Database {
    let _ = dotenvy::dotenv();
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_TEST_DATABASE_URL.to_string());
    Database::connect(&database_url)
        .await
        .expect("Failed to connect to test database")
}

/// Unit vector along `axis`, scaled by `scale`.
fn axis_vector(axis: usize, scale: f32) -> Vector {
    let mut v = vec![0.0f32; DIM];
    v[axis] = scale;
    Vector::from(v)
}

fn new_chunk(project_id: i64, source_type: SourceType, source_id: &str, embedding: Vector) -> NewChunk {
    NewChunk {
        project_id,
        source_type,
        source_id: source_id.to_string(),
        text: format!("content for {}", source_id),
        embedding,
        metadata: json!({"path": source_id}),
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL with pgvector"]
async fn test_search_never_crosses_projects() {
    let db = setup_test_db().await;
    let p1 = db.projects.create("scope-test-one").await.unwrap();
    let p2 = db.projects.create("scope-test-two").await.unwrap();

    db.chunks
        .replace_source(
            p1,
            SourceType::Code,
            vec![new_chunk(p1, SourceType::Code, "p1.rs#1-20", axis_vector(0, 0.5))],
        )
        .await
        .unwrap();
    // Exact match for the query, but in the other project.
    db.chunks
        .replace_source(
            p2,
            SourceType::Code,
            vec![new_chunk(p2, SourceType::Code, "p2.rs#1-20", axis_vector(0, 1.0))],
        )
        .await
        .unwrap();

    let results = db.chunks.search(p1, &axis_vector(0, 1.0), 30).await.unwrap();

    assert_eq!(results.len(), 1);
    assert!(results.iter().all(|c| c.project_id == p1));
    assert_eq!(results[0].source_id, "p1.rs#1-20");
    assert!((results[0].distance - 0.5).abs() < 1e-6);

    // Crowd the neighbourhood of the query with more chunks from project 2
    // than the HNSW candidate list holds.
    let crowd = (0..200)
        .map(|i| {
            let mut v = vec![0.0f32; DIM];
            v[0] = 1.0;
            v[1 + i % (DIM - 1)] = 0.001 * (1 + i / (DIM - 1)) as f32;
            new_chunk(p2, SourceType::Code, &format!("crowd.rs#{}", i), Vector::from(v))
        })
        .collect();
    db.chunks.replace_source(p2, SourceType::Code, crowd).await.unwrap();

    let far = (1..=5)
        .map(|i| {
            new_chunk(
                p1,
                SourceType::Document,
                &format!("far.md#{}", i),
                axis_vector(2, i as f32),
            )
        })
        .collect();
    db.chunks.replace_source(p1, SourceType::Document, far).await.unwrap();

    let results = db.chunks.search(p1, &axis_vector(0, 1.0), 5).await.unwrap();
    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|c| c.project_id == p1));
    assert_eq!(results[0].source_id, "p1.rs#1-20");

    let results = db.chunks.search(p1, &axis_vector(0, 1.0), 30).await.unwrap();
    assert_eq!(results.len(), 6);
    assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[tokio::test]
#[ignore = "requires PostgreSQL with pgvector"]
async fn test_search_orders_by_ascending_distance() {
    let db = setup_test_db().await;
    let project = db.projects.create("ordering-test").await.unwrap();

    let chunks = (1..=5)
        .map(|i| {
            new_chunk(
                project,
                SourceType::Document,
                &format!("doc.md#{}-{}", i, i),
                axis_vector(0, 1.0 - i as f32 * 0.1),
            )
        })
        .collect();
    db.chunks
        .replace_source(project, SourceType::Document, chunks)
        .await
        .unwrap();

    let results = db.chunks.search(project, &axis_vector(0, 1.0), 3).await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert_eq!(results[0].source_id, "doc.md#1-1");
}

#[tokio::test]
#[ignore = "requires PostgreSQL with pgvector"]
async fn test_replace_source_swaps_only_its_pair() {
    let db = setup_test_db().await;
    let project = db.projects.create("replace-test").await.unwrap();

    db.chunks
        .insert(new_chunk(project, SourceType::Chat, "#general 1", axis_vector(1, 1.0)))
        .await
        .unwrap();
    db.chunks
        .replace_source(
            project,
            SourceType::Code,
            vec![new_chunk(project, SourceType::Code, "old.rs#1-20", axis_vector(2, 1.0))],
        )
        .await
        .unwrap();

    let inserted = db
        .chunks
        .replace_source(
            project,
            SourceType::Code,
            vec![
                new_chunk(project, SourceType::Code, "new.rs#1-20", axis_vector(3, 1.0)),
                new_chunk(project, SourceType::Code, "new.rs#21-30", axis_vector(4, 1.0)),
            ],
        )
        .await
        .unwrap();
    assert_eq!(inserted, 2);

    let code = db.chunks.list_for_source(project, SourceType::Code).await.unwrap();
    let ids: Vec<&str> = code.iter().map(|c| c.source_id.as_str()).collect();
    assert_eq!(ids, vec!["new.rs#1-20", "new.rs#21-30"]);
    assert_eq!(db.chunks.count_for_project(project).await.unwrap(), 3);
}

#[tokio::test]
#[ignore = "requires PostgreSQL with pgvector"]
async fn test_failed_replace_keeps_previous_corpus() {
    let db = setup_test_db().await;
    let project = db.projects.create("rollback-test").await.unwrap();

    db.chunks
        .replace_source(
            project,
            SourceType::Issue,
            vec![new_chunk(project, SourceType::Issue, "issue-1", axis_vector(0, 1.0))],
        )
        .await
        .unwrap();

    // Wrong dimension makes the second insert fail inside the transaction.
    let result = db
        .chunks
        .replace_source(
            project,
            SourceType::Issue,
            vec![
                new_chunk(project, SourceType::Issue, "issue-2", axis_vector(0, 1.0)),
                new_chunk(project, SourceType::Issue, "issue-3", Vector::from(vec![1.0, 0.0])),
            ],
        )
        .await;
    assert!(result.is_err());

    let remaining = db.chunks.list_for_source(project, SourceType::Issue).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].source_id, "issue-1");
}

#[tokio::test]
#[ignore = "requires PostgreSQL with pgvector"]
async fn test_unknown_project_has_no_name() {
    let db = setup_test_db().await;
    assert_eq!(db.projects.project_name(i64::MAX).await.unwrap(), None);
}
