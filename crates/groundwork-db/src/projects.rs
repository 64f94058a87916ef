//! Project lookup against the `project` table.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use groundwork_core::{Error, ProjectDirectory, Result};

/// PostgreSQL implementation of ProjectDirectory.
#[derive(Clone)]
pub struct PgProjectDirectory {
    pool: Pool<Postgres>,
}

impl PgProjectDirectory {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Register a project and return its id.
    pub async fn create(&self, name: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Project name cannot be empty".to_string()));
        }
        let row = sqlx::query("INSERT INTO project (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("id"))
    }
}

#[async_trait]
impl ProjectDirectory for PgProjectDirectory {
    async fn project_name(&self, project_id: i64) -> Result<Option<String>> {
        let row = sqlx::query("SELECT name FROM project WHERE id = $1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("name")))
    }
}
