//! Row types
//!
//! Platforms and statuses are stored as their lowercase names; id lists are
//! stored as JSON arrays.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A repo's metadata row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RepoRecord {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// An issue row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub id: String,
    pub repo_id: String,
    pub title: String,
    pub description: String,
    pub assigned_platform: Option<String>,
    pub reviewer_platform: Option<String>,
    pub status: String,
    pub branch_name: Option<String>,
    pub depends_on: Vec<String>,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Issue row as stored, with JSON-encoded lists
#[derive(Debug, FromRow)]
pub(crate) struct IssueRow {
    pub id: String,
    pub repo_id: String,
    pub title: String,
    pub description: String,
    pub assigned_platform: Option<String>,
    pub reviewer_platform: Option<String>,
    pub status: String,
    pub branch_name: Option<String>,
    pub depends_on: String,
    pub labels: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl TryFrom<IssueRow> for IssueRecord {
    type Error = serde_json::Error;

    fn try_from(row: IssueRow) -> Result<Self, Self::Error> {
        Ok(Self {
            depends_on: serde_json::from_str(&row.depends_on)?,
            labels: serde_json::from_str(&row.labels)?,
            id: row.id,
            repo_id: row.repo_id,
            title: row.title,
            description: row.description,
            assigned_platform: row.assigned_platform,
            reviewer_platform: row.reviewer_platform,
            status: row.status,
            branch_name: row.branch_name,
            created_at: row.created_at,
            closed_at: row.closed_at,
        })
    }
}

/// A pull request row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PullRequestRecord {
    pub id: String,
    pub repo_id: String,
    pub issue_id: String,
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    pub status: String,
    pub reviewer_platform: Option<String>,
    pub review_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
}
