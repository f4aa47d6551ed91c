//! Inbound message types and their dispatcher
//!
//! Two message families reach the engine: [`ContentMessage`]s from platform
//! tabs and [`ApiRequest`]s from the control surface. Each is a closed enum
//! handled by [`Dispatcher`].

mod dispatch;

pub use dispatch::Dispatcher;

use serde::{Deserialize, Serialize};

use crate::adapter::PlatformResponse;
use crate::issues::{Issue, NewIssue, StartOutcome};
use crate::platform::{Platform, SendMode};
use crate::pulls::{PullRequest, ReviewAction};
use crate::repos::RepoMeta;
use crate::tabs::TabConnection;
use crate::vcs::RepoInfo;
use crate::workflow::{ResponseOutcome, WorkflowState};

/// Message sent by a platform tab about itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentMessage {
    /// Page loaded; platform is detected from the URL when omitted
    Ready {
        #[serde(default)]
        platform: Option<Platform>,
        url: String,
    },
    ResponseStarted {
        #[serde(default)]
        element_id: Option<String>,
    },
    ResponseComplete { response: PlatformResponse },
    /// Tab closed or navigated away
    Closed,
}

/// Request from the control surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ApiRequest {
    CreateRepo {
        name: String,
    },
    ListRepos,
    CreateIssue {
        repo_id: String,
        issue: NewIssue,
    },
    StartIssue {
        issue_id: String,
        /// Falls back to the configured send mode
        #[serde(default)]
        auto_send: Option<bool>,
    },
    CreatePr {
        issue_id: String,
    },
    RequestReview {
        pr_id: String,
        reviewer: Platform,
    },
    ReviewPr {
        pr_id: String,
        /// `action` is taken by the request tag
        #[serde(rename = "verdict")]
        action: ReviewAction,
        #[serde(default)]
        comment: Option<String>,
    },
    MergePr {
        pr_id: String,
    },
    GetDiff {
        pr_id: String,
    },
    /// Defaults to the current run's repo
    GetState {
        #[serde(default)]
        repo_id: Option<String>,
    },
    StartWorkflow {
        repo_id: String,
        issues: Vec<NewIssue>,
        #[serde(default)]
        send_mode: Option<SendMode>,
    },
}

/// Typed answer to an [`ApiRequest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ApiResponse {
    Repo(RepoMeta),
    Repos(Vec<RepoInfo>),
    Issue(Issue),
    IssueStarted(StartOutcome),
    PullRequest(PullRequest),
    ReviewRequested { sent: bool },
    Diff { diff: String },
    State(Box<AggregateState>),
    WorkflowStarted { issue_ids: Vec<String> },
}

/// Everything a control surface needs to render one repo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateState {
    pub workflow: WorkflowState,
    pub issues: Vec<Issue>,
    pub pull_requests: Vec<PullRequest>,
    pub tabs: Vec<TabConnection>,
}

/// Result of handling a [`ContentMessage`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentOutcome {
    Registered { platform: Platform },
    StatusUpdated,
    Response {
        #[serde(default)]
        outcome: Option<ResponseOutcome>,
    },
    Unregistered,
}
