//! Pull request rows

use crate::error::{Error, Result};
use crate::models::PullRequestRecord;
use sqlx::SqlitePool;

const COLUMNS: &str = "id, repo_id, issue_id, source_branch, target_branch, title, status, \
                       reviewer_platform, review_comment, created_at, merged_at";

/// Repository for pull request records
pub struct PullRequestRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PullRequestRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, pr: &PullRequestRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pull_requests (
                id, repo_id, issue_id, source_branch, target_branch, title, status,
                reviewer_platform, review_comment, created_at, merged_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&pr.id)
        .bind(&pr.repo_id)
        .bind(&pr.issue_id)
        .bind(&pr.source_branch)
        .bind(&pr.target_branch)
        .bind(&pr.title)
        .bind(&pr.status)
        .bind(&pr.reviewer_platform)
        .bind(&pr.review_comment)
        .bind(pr.created_at)
        .bind(pr.merged_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<PullRequestRecord>> {
        sqlx::query_as::<_, PullRequestRecord>(&format!("SELECT {} FROM pull_requests WHERE id = ?", COLUMNS))
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(Into::into)
    }

    /// Persist review and merge progress
    pub async fn update(&self, pr: &PullRequestRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE pull_requests
            SET title = ?, status = ?, reviewer_platform = ?, review_comment = ?, merged_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&pr.title)
        .bind(&pr.status)
        .bind(&pr.reviewer_platform)
        .bind(&pr.review_comment)
        .bind(pr.merged_at)
        .bind(&pr.id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("pull request {}", pr.id)));
        }

        Ok(())
    }

    pub async fn list(&self, repo_id: &str, status: Option<&str>) -> Result<Vec<PullRequestRecord>> {
        sqlx::query_as::<_, PullRequestRecord>(&format!(
            "SELECT {} FROM pull_requests WHERE repo_id = ?1 AND (?2 IS NULL OR status = ?2) ORDER BY rowid",
            COLUMNS
        ))
        .bind(repo_id)
        .bind(status)
        .fetch_all(self.pool)
        .await
        .map_err(Into::into)
    }

    /// Every pull request ever opened for an issue, oldest first
    pub async fn list_for_issue(&self, issue_id: &str) -> Result<Vec<PullRequestRecord>> {
        sqlx::query_as::<_, PullRequestRecord>(&format!(
            "SELECT {} FROM pull_requests WHERE issue_id = ? ORDER BY rowid",
            COLUMNS
        ))
        .bind(issue_id)
        .fetch_all(self.pool)
        .await
        .map_err(Into::into)
    }
}
