//! Persistence seam for repos, issues and pull requests
//!
//! Lists come back in creation order. Lookups return `Ok(None)` for unknown
//! ids; callers turn that into the matching not-found error.

mod memory;
#[cfg(feature = "database")]
mod sqlite;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::issues::{Issue, IssueStatus};
use crate::pulls::{PrStatus, PullRequest};
use crate::repos::RepoMeta;
use crate::Result;

/// Storage backend for workflow records
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_repo(&self, repo: &RepoMeta) -> Result<()>;

    async fn get_repo(&self, id: &str) -> Result<Option<RepoMeta>>;

    async fn list_repos(&self) -> Result<Vec<RepoMeta>>;

    /// Insert a new issue; fails with `Config` if the id is taken
    async fn insert_issue(&self, issue: &Issue) -> Result<()>;

    async fn get_issue(&self, id: &str) -> Result<Option<Issue>>;

    /// Replace a stored issue; fails with `IssueNotFound` if absent
    async fn update_issue(&self, issue: &Issue) -> Result<()>;

    async fn list_issues(&self, repo_id: &str, status: Option<IssueStatus>) -> Result<Vec<Issue>>;

    /// Insert a new pull request; fails with `Config` if the id is taken
    async fn insert_pr(&self, pr: &PullRequest) -> Result<()>;

    async fn get_pr(&self, id: &str) -> Result<Option<PullRequest>>;

    /// Replace a stored pull request; fails with `PrNotFound` if absent
    async fn update_pr(&self, pr: &PullRequest) -> Result<()>;

    async fn list_prs(&self, repo_id: &str, status: Option<PrStatus>) -> Result<Vec<PullRequest>>;

    async fn list_prs_for_issue(&self, issue_id: &str) -> Result<Vec<PullRequest>>;
}
