//! Issue rows

use crate::error::{Error, Result};
use crate::models::{IssueRecord, IssueRow};
use sqlx::SqlitePool;

const COLUMNS: &str = "id, repo_id, title, description, assigned_platform, reviewer_platform, \
                       status, branch_name, depends_on, labels, created_at, closed_at";

/// Repository for issue records
pub struct IssueRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> IssueRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an issue; fails with `Conflict` if the id is taken
    pub async fn insert(&self, issue: &IssueRecord) -> Result<()> {
        let depends_on = serde_json::to_string(&issue.depends_on)?;
        let labels = serde_json::to_string(&issue.labels)?;

        sqlx::query(
            r#"
            INSERT INTO issues (
                id, repo_id, title, description, assigned_platform, reviewer_platform,
                status, branch_name, depends_on, labels, created_at, closed_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&issue.id)
        .bind(&issue.repo_id)
        .bind(&issue.title)
        .bind(&issue.description)
        .bind(&issue.assigned_platform)
        .bind(&issue.reviewer_platform)
        .bind(&issue.status)
        .bind(&issue.branch_name)
        .bind(depends_on)
        .bind(labels)
        .bind(issue.created_at)
        .bind(issue.closed_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<IssueRecord>> {
        let row = sqlx::query_as::<_, IssueRow>(&format!("SELECT {} FROM issues WHERE id = ?", COLUMNS))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(IssueRecord::try_from).transpose().map_err(Into::into)
    }

    /// Overwrite the mutable fields of an existing issue
    pub async fn update(&self, issue: &IssueRecord) -> Result<()> {
        let depends_on = serde_json::to_string(&issue.depends_on)?;
        let labels = serde_json::to_string(&issue.labels)?;

        let result = sqlx::query(
            r#"
            UPDATE issues
            SET title = ?, description = ?, assigned_platform = ?, reviewer_platform = ?,
                status = ?, branch_name = ?, depends_on = ?, labels = ?, closed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&issue.title)
        .bind(&issue.description)
        .bind(&issue.assigned_platform)
        .bind(&issue.reviewer_platform)
        .bind(&issue.status)
        .bind(&issue.branch_name)
        .bind(depends_on)
        .bind(labels)
        .bind(issue.closed_at)
        .bind(&issue.id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("issue {}", issue.id)));
        }

        Ok(())
    }

    /// Issues of one repo in creation order, optionally filtered by status
    pub async fn list(&self, repo_id: &str, status: Option<&str>) -> Result<Vec<IssueRecord>> {
        let rows = sqlx::query_as::<_, IssueRow>(&format!(
            "SELECT {} FROM issues WHERE repo_id = ?1 AND (?2 IS NULL OR status = ?2) ORDER BY rowid",
            COLUMNS
        ))
        .bind(repo_id)
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| IssueRecord::try_from(row).map_err(Error::from))
            .collect()
    }
}
