//! Workflow engine: drives issues from creation to merge
//!
//! A run is a batch of issues in one repo. Issues whose dependencies are
//! closed are started; each platform answer is committed to the issue
//! branch and turned into a pull request that is either sent for review or
//! merged straight away. Every merge re-evaluates readiness until all run
//! issues are complete.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::schedule::{ready_issues, unknown_dependencies};
use super::state::WorkflowState;
use crate::adapter::{PromptRouter, TabMessenger};
use crate::issues::{Issue, IssueManager, IssueStatus, NewIssue};
use crate::platform::{Platform, SendMode};
use crate::pulls::{PrManager, PullRequest, ReviewAction};
use crate::repos::RepoManager;
use crate::store::Store;
use crate::tabs::{TabId, TabRegistry, TabStatus};
use crate::vcs::VersionControl;
use crate::Result;

/// Review comment recorded when an issue has no reviewer
pub const AUTO_APPROVE_COMMENT: &str = "Auto-approved (no reviewer)";

/// What happened to a platform response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResponseOutcome {
    /// Pull request opened; the run waits for a review verdict
    AwaitingReview { pr_id: String, review_requested: bool },
    /// Pull request approved automatically and merged
    Merged { pr_id: String },
}

/// Coordinates issue and pull-request lifecycles for one run at a time
pub struct WorkflowEngine {
    store: Arc<dyn Store>,
    tabs: Arc<TabRegistry>,
    repos: RepoManager,
    issues: IssueManager,
    prs: PrManager,
    /// Held for the whole of each mutating call
    state: Mutex<WorkflowState>,
}

impl WorkflowEngine {
    pub fn new(
        store: Arc<dyn Store>,
        vcs: Arc<dyn VersionControl>,
        tabs: Arc<TabRegistry>,
        messenger: Arc<dyn TabMessenger>,
        target_branch: impl Into<String>,
    ) -> Self {
        let target_branch = target_branch.into();
        let router = PromptRouter::new(tabs.clone(), messenger);

        Self {
            repos: RepoManager::new(store.clone(), vcs.clone()),
            issues: IssueManager::new(store.clone(), vcs.clone(), router.clone(), target_branch.clone()),
            prs: PrManager::new(store.clone(), vcs, router, target_branch),
            store,
            tabs,
            state: Mutex::new(WorkflowState::default()),
        }
    }

    pub fn repos(&self) -> &RepoManager {
        &self.repos
    }

    pub fn issues(&self) -> &IssueManager {
        &self.issues
    }

    pub fn prs(&self) -> &PrManager {
        &self.prs
    }

    pub fn tabs(&self) -> &Arc<TabRegistry> {
        &self.tabs
    }

    /// Snapshot of the current run
    pub async fn state(&self) -> WorkflowState {
        self.state.lock().await.clone()
    }

    /// Create the run's issues and start every one that is ready
    ///
    /// Replaces any previous run. Returns the created ids in definition order.
    pub async fn start(&self, repo_id: &str, defs: Vec<NewIssue>, send_mode: SendMode) -> Result<Vec<String>> {
        let mut state = self.state.lock().await;

        self.repos.get_repo(repo_id).await?;
        let created = self.issues.create_issues(repo_id, defs).await?;
        let ids: Vec<String> = created.iter().map(|issue| issue.id.clone()).collect();

        let known: HashMap<&str, IssueStatus> =
            created.iter().map(|issue| (issue.id.as_str(), issue.status)).collect();
        for (issue_id, dep) in unknown_dependencies(&created, |id| known.get(id).copied()) {
            if self.store.get_issue(&dep).await?.is_none() {
                tracing::warn!(issue_id = %issue_id, dependency = %dep, "Dependency does not exist; issue will not start");
            }
        }

        *state = WorkflowState::running(repo_id, send_mode, ids.clone());
        tracing::info!(repo_id, issues = ids.len(), %send_mode, "Workflow run started");

        self.start_ready_issues(&state).await;
        Ok(ids)
    }

    /// Handle a completed answer from a tab
    ///
    /// Does nothing unless a run is in progress and the tab's platform has an
    /// in-progress issue in the run's repo.
    pub async fn handle_response(&self, tab_id: TabId, content: &str) -> Result<Option<ResponseOutcome>> {
        let mut state = self.state.lock().await;
        if !state.is_running() {
            tracing::debug!(tab_id, "No run in progress, ignoring response");
            return Ok(None);
        }

        let Some(platform) = self.tabs.platform_for_tab(tab_id) else {
            tracing::warn!(tab_id, "Response from unknown tab");
            return Ok(None);
        };

        let result = self.process_response(&mut state, tab_id, platform, content).await;
        if let Err(e) = &result {
            tracing::warn!(tab_id, %platform, error = %e, "Failed to handle response");
            state.error = Some(e.to_string());
        }
        result
    }

    async fn process_response(
        &self,
        state: &mut WorkflowState,
        tab_id: TabId,
        platform: Platform,
        content: &str,
    ) -> Result<Option<ResponseOutcome>> {
        let Some(issue) = self
            .issues
            .find_active_for_platform(&state.repo_id, platform)
            .await?
        else {
            tracing::debug!(tab_id, %platform, "No in-progress issue for platform");
            return Ok(None);
        };

        self.issues.commit_response(&issue.id, platform, content).await?;
        self.tabs.update_status(tab_id, TabStatus::Connected);

        let pr = self.prs.create_pr(&issue.id).await?;

        if let Some(reviewer) = issue.reviewer_platform {
            let review_requested = self.prs.request_review(&pr.id, reviewer).await?;
            return Ok(Some(ResponseOutcome::AwaitingReview {
                pr_id: pr.id,
                review_requested,
            }));
        }

        self.prs
            .submit_review(&pr.id, ReviewAction::Approve, Some(AUTO_APPROVE_COMMENT.to_string()))
            .await?;
        self.prs.merge_pr(&pr.id).await?;
        self.complete_issue(state, &issue).await;

        Ok(Some(ResponseOutcome::Merged { pr_id: pr.id }))
    }

    /// Record a review verdict; approval merges and continues the run
    pub async fn handle_review_complete(
        &self,
        pr_id: &str,
        action: ReviewAction,
        comment: Option<String>,
    ) -> Result<PullRequest> {
        let mut state = self.state.lock().await;

        let result = self.process_review(&mut state, pr_id, action, comment).await;
        if let Err(e) = &result {
            tracing::warn!(pr_id, error = %e, "Failed to complete review");
            if state.is_running() {
                state.error = Some(e.to_string());
            }
        }
        result
    }

    async fn process_review(
        &self,
        state: &mut WorkflowState,
        pr_id: &str,
        action: ReviewAction,
        comment: Option<String>,
    ) -> Result<PullRequest> {
        let pr = self.prs.submit_review(pr_id, action, comment).await?;
        if action == ReviewAction::Reject {
            return Ok(pr);
        }

        let merged = self.prs.merge_pr(pr_id).await?;
        let issue = self.issues.get_issue(&merged.issue_id).await?;
        if state.is_running() && state.contains(&issue.id) {
            self.complete_issue(state, &issue).await;
        }
        Ok(merged)
    }

    async fn complete_issue(&self, state: &mut WorkflowState, issue: &Issue) {
        state.mark_complete(&issue.id);
        self.start_ready_issues(state).await;
    }

    /// Start every run issue whose dependencies are closed
    ///
    /// Never fails: lookup and start errors are logged and skipped.
    async fn start_ready_issues(&self, state: &WorkflowState) {
        if !state.is_running() {
            return;
        }

        let mut run = Vec::with_capacity(state.issue_ids.len());
        for id in &state.issue_ids {
            match self.store.get_issue(id).await {
                Ok(Some(issue)) => run.push(issue),
                Ok(None) => tracing::warn!(issue_id = %id, "Run issue missing from store"),
                Err(e) => {
                    tracing::warn!(error = %e, "Readiness check skipped");
                    return;
                }
            }
        }

        let mut statuses: HashMap<String, IssueStatus> =
            run.iter().map(|issue| (issue.id.clone(), issue.status)).collect();
        for dep in run.iter().flat_map(|issue| issue.depends_on.iter()) {
            if statuses.contains_key(dep) {
                continue;
            }
            match self.store.get_issue(dep).await {
                Ok(Some(found)) => {
                    statuses.insert(dep.clone(), found.status);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Readiness check skipped");
                    return;
                }
            }
        }

        let ready = ready_issues(&run, &state.completed_ids, |id| statuses.get(id).copied());
        let auto_send = state.send_mode.auto_submits();

        for id in ready {
            match self.issues.start_issue(&id, auto_send).await {
                Ok(outcome) => tracing::info!(
                    issue_id = %id,
                    branch = %outcome.branch_name,
                    sent = outcome.sent,
                    "Dependencies resolved, issue started"
                ),
                Err(e) => tracing::warn!(issue_id = %id, error = %e, "Failed to start ready issue"),
            }
        }
    }
}
