//! Issue lifecycle operations

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::types::{branch_name, Issue, IssueStatus, NewIssue};
use crate::adapter::PromptRouter;
use crate::lifecycle::Lifecycle;
use crate::platform::Platform;
use crate::store::Store;
use crate::vcs::{CommitInfo, VersionControl};
use crate::{Error, Result};

/// Result of starting an issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartOutcome {
    pub branch_name: String,
    /// Whether the prompt reached the platform's tab
    pub sent: bool,
}

/// Path of the committed response for an issue
pub fn response_path(platform: Platform, issue_id: &str) -> String {
    format!("outputs/{}/{}.md", platform, issue_id)
}

/// Creates issues and moves them through their lifecycle
#[derive(Clone)]
pub struct IssueManager {
    store: Arc<dyn Store>,
    vcs: Arc<dyn VersionControl>,
    router: PromptRouter,
    target_branch: String,
}

impl IssueManager {
    pub fn new(
        store: Arc<dyn Store>,
        vcs: Arc<dyn VersionControl>,
        router: PromptRouter,
        target_branch: impl Into<String>,
    ) -> Self {
        Self {
            store,
            vcs,
            router,
            target_branch: target_branch.into(),
        }
    }

    pub async fn create_issue(&self, repo_id: &str, new: NewIssue) -> Result<Issue> {
        if self.store.get_repo(repo_id).await?.is_none() {
            return Err(Error::RepoNotFound(repo_id.to_string()));
        }

        let issue = Issue::from_new(repo_id, new)?;
        self.store.insert_issue(&issue).await?;

        tracing::info!(
            issue_id = %issue.id,
            repo_id,
            platform = ?issue.assigned_platform,
            depends_on = ?issue.depends_on,
            "Created issue"
        );
        Ok(issue)
    }

    /// Create several issues, validating the whole batch before storing any
    ///
    /// Ids must be unique within the batch and not already taken.
    pub async fn create_issues(&self, repo_id: &str, defs: Vec<NewIssue>) -> Result<Vec<Issue>> {
        if self.store.get_repo(repo_id).await?.is_none() {
            return Err(Error::RepoNotFound(repo_id.to_string()));
        }

        let issues = defs
            .into_iter()
            .map(|def| Issue::from_new(repo_id, def))
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::new();
        for issue in &issues {
            if !seen.insert(issue.id.as_str()) {
                return Err(Error::Config(format!("Duplicate issue id {} in batch", issue.id)));
            }
            if self.store.get_issue(&issue.id).await?.is_some() {
                return Err(Error::Config(format!("Issue {} already exists", issue.id)));
            }
        }

        for issue in &issues {
            self.store.insert_issue(issue).await?;
        }

        tracing::info!(repo_id, count = issues.len(), "Created issue batch");
        Ok(issues)
    }

    pub async fn get_issue(&self, id: &str) -> Result<Issue> {
        self.find_issue(id)
            .await?
            .ok_or_else(|| Error::IssueNotFound(id.to_string()))
    }

    pub async fn find_issue(&self, id: &str) -> Result<Option<Issue>> {
        self.store.get_issue(id).await
    }

    pub async fn list_issues(&self, repo_id: &str, status: Option<IssueStatus>) -> Result<Vec<Issue>> {
        self.store.list_issues(repo_id, status).await
    }

    /// Advance an issue's status, enforcing the lifecycle
    pub async fn update_status(&self, id: &str, status: IssueStatus) -> Result<Issue> {
        let mut issue = self.get_issue(id).await?;
        issue.set_status(status)?;
        self.store.update_issue(&issue).await?;
        Ok(issue)
    }

    /// Create the issue branch, mark the issue in progress and send its prompt
    ///
    /// Delivery is best effort; `sent` reports whether a tab accepted it.
    pub async fn start_issue(&self, id: &str, auto_send: bool) -> Result<StartOutcome> {
        let mut issue = self.get_issue(id).await?;

        if !issue.status.can_transition_to(IssueStatus::InProgress) {
            return Err(Error::InvalidTransition {
                entity: IssueStatus::ENTITY,
                from: issue.status.to_string(),
                to: IssueStatus::InProgress.to_string(),
            });
        }

        let platform = issue
            .assigned_platform
            .ok_or_else(|| Error::Config(format!("Issue {} has no assigned platform", id)))?;

        let branch = branch_name(&issue.id, platform);
        self.vcs.create_branch(&issue.repo_id, &branch, &self.target_branch)?;
        self.vcs.checkout(&issue.repo_id, &branch)?;

        issue.branch_name = Some(branch.clone());
        issue.set_status(IssueStatus::InProgress)?;
        self.store.update_issue(&issue).await?;

        let sent = self.router.route(platform, &issue.description, auto_send).await;

        tracing::info!(issue_id = id, %platform, branch = %branch, sent, "Started issue");
        Ok(StartOutcome {
            branch_name: branch,
            sent,
        })
    }

    /// Write a platform's answer to the issue branch and commit it
    pub async fn commit_response(&self, id: &str, platform: Platform, content: &str) -> Result<CommitInfo> {
        let issue = self.get_issue(id).await?;
        let branch = issue
            .branch_name
            .as_deref()
            .ok_or_else(|| Error::Config(format!("Issue {} has no branch", id)))?;

        self.vcs.checkout(&issue.repo_id, branch)?;
        self.vcs.ensure_dir(&issue.repo_id, &format!("outputs/{}", platform))?;
        self.vcs
            .write_file(&issue.repo_id, &response_path(platform, &issue.id), content)?;

        let commit = self
            .vcs
            .commit_all(&issue.repo_id, &format!("[{}] {}", platform, issue.title))?;

        tracing::info!(issue_id = id, %platform, commit = %commit.hash, "Committed response");
        Ok(commit)
    }

    /// Every dependency exists and is closed
    pub async fn dependencies_resolved(&self, id: &str) -> Result<bool> {
        let issue = self.get_issue(id).await?;
        for dep in &issue.depends_on {
            match self.store.get_issue(dep).await? {
                Some(found) if found.status == IssueStatus::Closed => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    /// First in-progress issue in a repo assigned to `platform`
    pub async fn find_active_for_platform(&self, repo_id: &str, platform: Platform) -> Result<Option<Issue>> {
        Ok(self
            .store
            .list_issues(repo_id, Some(IssueStatus::InProgress))
            .await?
            .into_iter()
            .find(|issue| issue.is_assigned_to(platform)))
    }
}
