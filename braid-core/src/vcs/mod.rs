//! Version-control facade
//!
//! The workflow only needs a handful of primitives: branches, file writes,
//! whole-tree commits, merges and branch diffs. [`VersionControl`] names
//! them; [`GitBackend`] implements them with `git2` over one working tree
//! per repo.

mod git;

pub use git::GitBackend;

use serde::{Deserialize, Serialize};

use crate::Result;

/// One commit in a branch history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Abbreviated commit id
    pub hash: String,
    pub message: String,
    pub author: String,
    /// Author time, RFC 3339
    pub date: String,
}

/// Working-tree summary for a repo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub id: String,
    pub name: String,
    pub current_branch: String,
    pub branches: Vec<String>,
}

/// Repository operations used by the issue and pull-request managers
///
/// Implementations serialize mutations per repo; calls on different repos
/// may run concurrently.
pub trait VersionControl: Send + Sync {
    /// Create a repo with a `main` branch holding one initial commit
    fn init_repo(&self, repo_id: &str, name: &str) -> Result<()>;

    fn repo_info(&self, repo_id: &str) -> Result<RepoInfo>;

    fn list_branches(&self, repo_id: &str) -> Result<Vec<String>>;

    /// Create `branch` at the tip of `base`; an existing branch is kept as is
    fn create_branch(&self, repo_id: &str, branch: &str, base: &str) -> Result<()>;

    fn checkout(&self, repo_id: &str, branch: &str) -> Result<()>;

    fn ensure_dir(&self, repo_id: &str, path: &str) -> Result<()>;

    fn write_file(&self, repo_id: &str, path: &str, content: &str) -> Result<()>;

    /// File contents at a branch tip without checking it out
    fn read_file_at_branch(&self, repo_id: &str, branch: &str, path: &str) -> Result<Option<String>>;

    /// Stage every change in the working tree and commit it on the current branch
    fn commit_all(&self, repo_id: &str, message: &str) -> Result<CommitInfo>;

    /// Merge `source` into `target`, leaving `target` checked out
    fn merge(&self, repo_id: &str, source: &str, target: &str) -> Result<()>;

    /// Unified diff from `base` to `compare`, one section per changed file
    fn branch_diff(&self, repo_id: &str, base: &str, compare: &str) -> Result<String>;

    /// Newest-first history of `branch`, or of HEAD when `None`
    fn log(&self, repo_id: &str, branch: Option<&str>, limit: usize) -> Result<Vec<CommitInfo>>;
}
