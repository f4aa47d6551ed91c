//! Pull request lifecycle operations

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::prompt::ReviewPrompt;
use super::types::{PrStatus, PullRequest, ReviewAction};
use crate::adapter::PromptRouter;
use crate::issues::IssueStatus;
use crate::lifecycle::Lifecycle;
use crate::platform::Platform;
use crate::store::Store;
use crate::vcs::VersionControl;
use crate::{Error, Result};

/// Opens, reviews and merges pull requests
#[derive(Clone)]
pub struct PrManager {
    store: Arc<dyn Store>,
    vcs: Arc<dyn VersionControl>,
    router: PromptRouter,
    target_branch: String,
}

impl PrManager {
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

    /// Open a pull request for an in-progress issue and move the issue to review
    pub async fn create_pr(&self, issue_id: &str) -> Result<PullRequest> {
        let mut issue = self
            .store
            .get_issue(issue_id)
            .await?
            .ok_or_else(|| Error::IssueNotFound(issue_id.to_string()))?;

        let source_branch = issue
            .branch_name
            .clone()
            .ok_or_else(|| Error::Config(format!("Issue {} has no branch", issue_id)))?;

        if !issue.status.can_transition_to(IssueStatus::Review) {
            return Err(Error::InvalidTransition {
                entity: IssueStatus::ENTITY,
                from: issue.status.to_string(),
                to: IssueStatus::Review.to_string(),
            });
        }

        if let Some(active) = self.active_pr_for_issue(issue_id).await? {
            return Err(Error::Config(format!(
                "Issue {} already has active pull request {}",
                issue_id, active.id
            )));
        }

        let pr = PullRequest {
            id: Uuid::new_v4().simple().to_string(),
            repo_id: issue.repo_id.clone(),
            issue_id: issue.id.clone(),
            source_branch,
            target_branch: self.target_branch.clone(),
            title: issue.title.clone(),
            status: PrStatus::Open,
            reviewer_platform: issue.reviewer_platform,
            review_comment: None,
            created_at: Utc::now(),
            merged_at: None,
        };
        self.store.insert_pr(&pr).await?;

        issue.set_status(IssueStatus::Review)?;
        self.store.update_issue(&issue).await?;

        tracing::info!(pr_id = %pr.id, issue_id, source = %pr.source_branch, "Opened pull request");
        Ok(pr)
    }

    pub async fn get_pr(&self, id: &str) -> Result<PullRequest> {
        self.find_pr(id)
            .await?
            .ok_or_else(|| Error::PrNotFound(id.to_string()))
    }

    pub async fn find_pr(&self, id: &str) -> Result<Option<PullRequest>> {
        self.store.get_pr(id).await
    }

    pub async fn list_prs(&self, repo_id: &str, status: Option<PrStatus>) -> Result<Vec<PullRequest>> {
        self.store.list_prs(repo_id, status).await
    }

    /// The issue's pull request that is neither merged nor rejected
    pub async fn active_pr_for_issue(&self, issue_id: &str) -> Result<Option<PullRequest>> {
        Ok(self
            .store
            .list_prs_for_issue(issue_id)
            .await?
            .into_iter()
            .find(|pr| pr.status.is_active()))
    }

    /// Unified diff of the pull request's changes against its target
    pub async fn get_diff(&self, pr_id: &str) -> Result<String> {
        let pr = self.get_pr(pr_id).await?;
        self.vcs
            .branch_diff(&pr.repo_id, &pr.target_branch, &pr.source_branch)
    }

    /// Send a review prompt to `reviewer`
    ///
    /// Returns `Ok(false)` and leaves the pull request untouched when the
    /// reviewer has no tab or the prompt could not be delivered.
    pub async fn request_review(&self, pr_id: &str, reviewer: Platform) -> Result<bool> {
        let mut pr = self.get_pr(pr_id).await?;
        if pr.status != PrStatus::Open {
            return Err(Error::InvalidTransition {
                entity: PrStatus::ENTITY,
                from: pr.status.to_string(),
                to: PrStatus::Reviewing.to_string(),
            });
        }

        let diff = self.get_diff(pr_id).await?;
        let description = self
            .store
            .get_issue(&pr.issue_id)
            .await?
            .map(|issue| issue.description)
            .unwrap_or_default();

        let prompt = ReviewPrompt::new()
            .title(pr.title.as_str())
            .description(description)
            .diff(diff)
            .render();

        if !self.router.route(reviewer, &prompt, false).await {
            tracing::warn!(pr_id, %reviewer, "Review request not delivered");
            return Ok(false);
        }

        pr.set_status(PrStatus::Reviewing)?;
        pr.reviewer_platform = Some(reviewer);
        self.store.update_pr(&pr).await?;

        tracing::info!(pr_id, %reviewer, "Review requested");
        Ok(true)
    }

    /// Record a verdict; never merges
    pub async fn submit_review(
        &self,
        pr_id: &str,
        action: ReviewAction,
        comment: Option<String>,
    ) -> Result<PullRequest> {
        let mut pr = self.get_pr(pr_id).await?;
        pr.set_status(action.resulting_status())?;
        if comment.is_some() {
            pr.review_comment = comment;
        }
        self.store.update_pr(&pr).await?;

        tracing::info!(pr_id, %action, "Review submitted");
        Ok(pr)
    }

    /// Merge an approved pull request and close its issue
    pub async fn merge_pr(&self, pr_id: &str) -> Result<PullRequest> {
        let mut pr = self.get_pr(pr_id).await?;
        if !pr.status.can_transition_to(PrStatus::Merged) {
            return Err(Error::InvalidTransition {
                entity: PrStatus::ENTITY,
                from: pr.status.to_string(),
                to: PrStatus::Merged.to_string(),
            });
        }

        let mut issue = self
            .store
            .get_issue(&pr.issue_id)
            .await?
            .ok_or_else(|| Error::IssueNotFound(pr.issue_id.clone()))?;

        self.vcs
            .merge(&pr.repo_id, &pr.source_branch, &pr.target_branch)?;

        pr.set_status(PrStatus::Merged)?;
        self.store.update_pr(&pr).await?;

        issue.set_status(IssueStatus::Closed)?;
        self.store.update_issue(&issue).await?;

        tracing::info!(pr_id, issue_id = %issue.id, "Merged pull request");
        Ok(pr)
    }
}
