//! Routing of inbound messages to the engine

use std::sync::Arc;

use super::{AggregateState, ApiRequest, ApiResponse, ContentMessage, ContentOutcome};
use crate::platform::{Platform, SendMode};
use crate::tabs::{TabId, TabStatus};
use crate::workflow::WorkflowEngine;
use crate::{Error, Result};

/// Handles tab and control-surface messages against one engine
#[derive(Clone)]
pub struct Dispatcher {
    engine: Arc<WorkflowEngine>,
    default_send_mode: SendMode,
}

impl Dispatcher {
    pub fn new(engine: Arc<WorkflowEngine>, default_send_mode: SendMode) -> Self {
        Self {
            engine,
            default_send_mode,
        }
    }

    pub fn engine(&self) -> &Arc<WorkflowEngine> {
        &self.engine
    }

    pub async fn handle_content(&self, tab_id: TabId, message: ContentMessage) -> Result<ContentOutcome> {
        let tabs = self.engine.tabs();

        match message {
            ContentMessage::Ready { platform, url } => {
                let platform = platform
                    .or_else(|| Platform::from_url(&url))
                    .ok_or_else(|| Error::Config(format!("No platform recognized for {}", url)))?;
                tabs.register(tab_id, platform, url);
                Ok(ContentOutcome::Registered { platform })
            }
            ContentMessage::ResponseStarted { element_id } => {
                tracing::debug!(tab_id, element_id = ?element_id, "Response streaming");
                tabs.update_status(tab_id, TabStatus::Busy);
                Ok(ContentOutcome::StatusUpdated)
            }
            ContentMessage::ResponseComplete { response } => {
                if tabs.platform_for_tab(tab_id) != Some(response.platform) {
                    tracing::warn!(
                        tab_id,
                        platform = %response.platform,
                        "Response platform does not match registered tab"
                    );
                }
                let outcome = self.engine.handle_response(tab_id, &response.content).await?;
                Ok(ContentOutcome::Response { outcome })
            }
            ContentMessage::Closed => {
                tabs.unregister(tab_id);
                Ok(ContentOutcome::Unregistered)
            }
        }
    }

    pub async fn handle_api(&self, request: ApiRequest) -> Result<ApiResponse> {
        let engine = &self.engine;

        match request {
            ApiRequest::CreateRepo { name } => Ok(ApiResponse::Repo(engine.repos().create_repo(&name).await?)),
            ApiRequest::ListRepos => Ok(ApiResponse::Repos(engine.repos().list_repo_info().await?)),
            ApiRequest::CreateIssue { repo_id, issue } => Ok(ApiResponse::Issue(
                engine.issues().create_issue(&repo_id, issue).await?,
            )),
            ApiRequest::StartIssue { issue_id, auto_send } => {
                let auto_send = auto_send.unwrap_or(self.default_send_mode.auto_submits());
                Ok(ApiResponse::IssueStarted(
                    engine.issues().start_issue(&issue_id, auto_send).await?,
                ))
            }
            ApiRequest::CreatePr { issue_id } => Ok(ApiResponse::PullRequest(engine.prs().create_pr(&issue_id).await?)),
            ApiRequest::RequestReview { pr_id, reviewer } => Ok(ApiResponse::ReviewRequested {
                sent: engine.prs().request_review(&pr_id, reviewer).await?,
            }),
            ApiRequest::ReviewPr { pr_id, action, comment } => Ok(ApiResponse::PullRequest(
                engine.handle_review_complete(&pr_id, action, comment).await?,
            )),
            ApiRequest::MergePr { pr_id } => Ok(ApiResponse::PullRequest(engine.prs().merge_pr(&pr_id).await?)),
            ApiRequest::GetDiff { pr_id } => Ok(ApiResponse::Diff {
                diff: engine.prs().get_diff(&pr_id).await?,
            }),
            ApiRequest::GetState { repo_id } => Ok(ApiResponse::State(Box::new(self.aggregate_state(repo_id).await?))),
            ApiRequest::StartWorkflow {
                repo_id,
                issues,
                send_mode,
            } => {
                let send_mode = send_mode.unwrap_or(self.default_send_mode);
                Ok(ApiResponse::WorkflowStarted {
                    issue_ids: engine.start(&repo_id, issues, send_mode).await?,
                })
            }
        }
    }

    /// Run snapshot plus one repo's issues, pull requests and live tabs
    pub async fn aggregate_state(&self, repo_id: Option<String>) -> Result<AggregateState> {
        let workflow = self.engine.state().await;
        let repo_id = repo_id.unwrap_or_else(|| workflow.repo_id.clone());

        let (issues, pull_requests) = if repo_id.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            (
                self.engine.issues().list_issues(&repo_id, None).await?,
                self.engine.prs().list_prs(&repo_id, None).await?,
            )
        };

        Ok(AggregateState {
            workflow,
            issues,
            pull_requests,
            tabs: self.engine.tabs().list_connected(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{PlatformResponse, TabCommand, TabMessenger, TabReply};
    use crate::config::GitConfig;
    use crate::issues::{IssueStatus, NewIssue};
    use crate::pulls::{PrStatus, ReviewAction};
    use crate::store::{MemoryStore, Store};
    use crate::tabs::TabRegistry;
    use crate::vcs::GitBackend;
    use crate::workflow::{ResponseOutcome, RunStatus};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct AcceptAll;

    #[async_trait]
    impl TabMessenger for AcceptAll {
        async fn send(&self, _tab_id: TabId, _command: TabCommand) -> Result<TabReply> {
            Ok(TabReply::Injected { success: true, sent: false })
        }
    }

    fn dispatcher(dir: &TempDir) -> Dispatcher {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let engine = WorkflowEngine::new(
            store,
            Arc::new(GitBackend::new(dir.path(), &GitConfig::default())),
            Arc::new(TabRegistry::new()),
            Arc::new(AcceptAll),
            "main",
        );
        Dispatcher::new(Arc::new(engine), SendMode::Manual)
    }

    async fn create_repo(d: &Dispatcher) -> String {
        match d.handle_api(ApiRequest::CreateRepo { name: "Docs".to_string() }).await.unwrap() {
            ApiResponse::Repo(meta) => meta.id,
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tab_lifecycle_messages() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir);

        let outcome = d
            .handle_content(
                4,
                ContentMessage::Ready {
                    platform: None,
                    url: "https://claude.ai/chat/1".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome, ContentOutcome::Registered { platform: Platform::Claude });

        d.handle_content(4, ContentMessage::ResponseStarted { element_id: None })
            .await
            .unwrap();
        assert_eq!(d.engine().tabs().get(4).unwrap().status, TabStatus::Busy);

        d.handle_content(4, ContentMessage::Closed).await.unwrap();
        assert!(d.engine().tabs().get(4).is_none());

        let unknown = d
            .handle_content(
                5,
                ContentMessage::Ready {
                    platform: None,
                    url: "https://example.com/".to_string(),
                },
            )
            .await;
        assert!(matches!(unknown, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_workflow_through_messages() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir);
        let repo_id = create_repo(&d).await;

        d.handle_content(
            1,
            ContentMessage::Ready {
                platform: Some(Platform::ChatGpt),
                url: "https://chatgpt.com/".to_string(),
            },
        )
        .await
        .unwrap();

        let started = d
            .handle_api(ApiRequest::StartWorkflow {
                repo_id: repo_id.clone(),
                issues: vec![NewIssue::new("Intro", "Write it")
                    .with_id("I1")
                    .assigned_to(Platform::ChatGpt)
                    .reviewed_by(Platform::Claude)],
                send_mode: None,
            })
            .await
            .unwrap();
        assert_eq!(started, ApiResponse::WorkflowStarted { issue_ids: vec!["I1".to_string()] });

        let outcome = d
            .handle_content(
                1,
                ContentMessage::ResponseComplete {
                    response: PlatformResponse::new(Platform::ChatGpt, "Intro text\n"),
                },
            )
            .await
            .unwrap();
        let ContentOutcome::Response {
            outcome: Some(ResponseOutcome::AwaitingReview { pr_id, review_requested }),
        } = outcome
        else {
            panic!("expected a pull request awaiting review");
        };
        assert!(!review_requested);

        let ApiResponse::Diff { diff } = d.handle_api(ApiRequest::GetDiff { pr_id: pr_id.clone() }).await.unwrap() else {
            panic!("expected a diff");
        };
        assert!(diff.contains("+Intro text"));

        let reviewed = d
            .handle_api(ApiRequest::ReviewPr {
                pr_id,
                action: ReviewAction::Approve,
                comment: None,
            })
            .await
            .unwrap();
        assert!(matches!(reviewed, ApiResponse::PullRequest(pr) if pr.status == PrStatus::Merged));

        let ApiResponse::State(state) = d.handle_api(ApiRequest::GetState { repo_id: None }).await.unwrap() else {
            panic!("expected state");
        };
        assert_eq!(state.workflow.status, RunStatus::Completed);
        assert_eq!(state.issues[0].status, IssueStatus::Closed);
        assert_eq!(state.pull_requests.len(), 1);
        assert_eq!(state.tabs.len(), 1);
    }

    #[tokio::test]
    async fn test_manual_issue_operations() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir);
        let repo_id = create_repo(&d).await;

        d.handle_api(ApiRequest::CreateIssue {
            repo_id: repo_id.clone(),
            issue: NewIssue::new("Solo", "Do it").with_id("S1").assigned_to(Platform::Gemini),
        })
        .await
        .unwrap();

        let started = d
            .handle_api(ApiRequest::StartIssue {
                issue_id: "S1".to_string(),
                auto_send: None,
            })
            .await
            .unwrap();
        let ApiResponse::IssueStarted(outcome) = started else {
            panic!("expected start outcome");
        };
        assert_eq!(outcome.branch_name, "issue/S1-gemini");
        assert!(!outcome.sent);

        let ApiResponse::Repos(repos) = d.handle_api(ApiRequest::ListRepos).await.unwrap() else {
            panic!("expected repos");
        };
        assert_eq!(repos[0].current_branch, "issue/S1-gemini");

        let state = d.aggregate_state(Some(repo_id)).await.unwrap();
        assert_eq!(state.workflow.status, RunStatus::Idle);
        assert_eq!(state.issues.len(), 1);

        let missing = d.handle_api(ApiRequest::MergePr { pr_id: "nope".to_string() }).await;
        assert!(matches!(missing, Err(Error::PrNotFound(_))));
    }

    #[test]
    fn test_api_request_wire_format() {
        let request: ApiRequest = serde_json::from_str(
            r#"{"action":"start_workflow","repo_id":"ab12cd34","issues":[{"id":"I1","title":"T","assigned_platform":"claude"}]}"#,
        )
        .unwrap();
        match request {
            ApiRequest::StartWorkflow { repo_id, issues, send_mode } => {
                assert_eq!(repo_id, "ab12cd34");
                assert_eq!(issues[0].assigned_platform, Some(Platform::Claude));
                assert!(send_mode.is_none());
            }
            other => panic!("unexpected request {:?}", other),
        }

        let review: ApiRequest = serde_json::from_str(
            r#"{"action":"review_pr","pr_id":"p1","verdict":"reject","comment":"Too short"}"#,
        )
        .unwrap();
        match review {
            ApiRequest::ReviewPr { pr_id, action, comment } => {
                assert_eq!(pr_id, "p1");
                assert_eq!(action, ReviewAction::Reject);
                assert_eq!(comment.as_deref(), Some("Too short"));
            }
            other => panic!("unexpected request {:?}", other),
        }

        let encoded = serde_json::to_value(ApiRequest::ReviewPr {
            pr_id: "p1".to_string(),
            action: ReviewAction::Approve,
            comment: None,
        })
        .unwrap();
        assert_eq!(encoded["action"], "review_pr");
        assert_eq!(encoded["verdict"], "approve");

        let response = serde_json::to_value(ApiResponse::Diff { diff: "+x".to_string() }).unwrap();
        assert_eq!(response["type"], "diff");
        assert_eq!(response["data"]["diff"], "+x");
    }
}
