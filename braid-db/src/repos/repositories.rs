//! Repo metadata rows

use crate::error::Result;
use crate::models::RepoRecord;
use sqlx::SqlitePool;

pub struct RepoRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RepoRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a repo; fails with `Conflict` if the id is taken
    pub async fn insert(&self, repo: &RepoRecord) -> Result<()> {
        sqlx::query("INSERT INTO repos (id, name, created_at) VALUES (?, ?, ?)")
            .bind(&repo.id)
            .bind(&repo.name)
            .bind(repo.created_at)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<RepoRecord>> {
        sqlx::query_as::<_, RepoRecord>("SELECT id, name, created_at FROM repos WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(Into::into)
    }

    /// All repos in creation order
    pub async fn list(&self) -> Result<Vec<RepoRecord>> {
        sqlx::query_as::<_, RepoRecord>("SELECT id, name, created_at FROM repos ORDER BY rowid")
            .fetch_all(self.pool)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, Error, RepoRecord};
    use chrono::Utc;

    fn record(id: &str, name: &str) -> RepoRecord {
        RepoRecord {
            id: id.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::in_memory().await.unwrap();
        let repo = record("ab12cd34", "Notes");

        db.repos().insert(&repo).await.unwrap();

        let loaded = db.repos().get("ab12cd34").await.unwrap().unwrap();
        assert_eq!(loaded.name, "Notes");
        assert_eq!(loaded.created_at, repo.created_at);
        assert!(db.repos().get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_conflicts() {
        let db = Database::in_memory().await.unwrap();
        db.repos().insert(&record("ab12cd34", "Notes")).await.unwrap();

        let result = db.repos().insert(&record("ab12cd34", "Other")).await;
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_list_in_creation_order() {
        let db = Database::in_memory().await.unwrap();
        for (id, name) in [("zz000001", "First"), ("aa000002", "Second")] {
            db.repos().insert(&record(id, name)).await.unwrap();
        }

        let names: Vec<_> = db.repos().list().await.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }
}
