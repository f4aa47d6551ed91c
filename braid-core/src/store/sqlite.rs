//! [`Store`] backed by the SQLite database

use async_trait::async_trait;
use braid_db::{Database, IssueRecord, PullRequestRecord, RepoRecord};

use super::Store;
use crate::issues::{Issue, IssueStatus};
use crate::platform::Platform;
use crate::pulls::{PrStatus, PullRequest};
use crate::repos::RepoMeta;
use crate::{Error, Result};

fn parse<T: std::str::FromStr<Err = String>>(value: &str) -> Result<T> {
    value.parse().map_err(Error::Store)
}

fn parse_platform(value: Option<&str>) -> Result<Option<Platform>> {
    value.map(parse).transpose()
}

fn repo_record(repo: &RepoMeta) -> RepoRecord {
    RepoRecord {
        id: repo.id.clone(),
        name: repo.name.clone(),
        created_at: repo.created_at,
    }
}

fn repo_meta(record: RepoRecord) -> RepoMeta {
    RepoMeta {
        id: record.id,
        name: record.name,
        created_at: record.created_at,
    }
}

fn issue_record(issue: &Issue) -> IssueRecord {
    IssueRecord {
        id: issue.id.clone(),
        repo_id: issue.repo_id.clone(),
        title: issue.title.clone(),
        description: issue.description.clone(),
        assigned_platform: issue.assigned_platform.map(|p| p.name().to_string()),
        reviewer_platform: issue.reviewer_platform.map(|p| p.name().to_string()),
        status: issue.status.as_str().to_string(),
        branch_name: issue.branch_name.clone(),
        depends_on: issue.depends_on.clone(),
        labels: issue.labels.clone(),
        created_at: issue.created_at,
        closed_at: issue.closed_at,
    }
}

fn issue_from_record(record: IssueRecord) -> Result<Issue> {
    Ok(Issue {
        assigned_platform: parse_platform(record.assigned_platform.as_deref())?,
        reviewer_platform: parse_platform(record.reviewer_platform.as_deref())?,
        status: parse(&record.status)?,
        id: record.id,
        repo_id: record.repo_id,
        title: record.title,
        description: record.description,
        branch_name: record.branch_name,
        depends_on: record.depends_on,
        labels: record.labels,
        created_at: record.created_at,
        closed_at: record.closed_at,
    })
}

fn pr_record(pr: &PullRequest) -> PullRequestRecord {
    PullRequestRecord {
        id: pr.id.clone(),
        repo_id: pr.repo_id.clone(),
        issue_id: pr.issue_id.clone(),
        source_branch: pr.source_branch.clone(),
        target_branch: pr.target_branch.clone(),
        title: pr.title.clone(),
        status: pr.status.as_str().to_string(),
        reviewer_platform: pr.reviewer_platform.map(|p| p.name().to_string()),
        review_comment: pr.review_comment.clone(),
        created_at: pr.created_at,
        merged_at: pr.merged_at,
    }
}

fn pr_from_record(record: PullRequestRecord) -> Result<PullRequest> {
    Ok(PullRequest {
        status: parse(&record.status)?,
        reviewer_platform: parse_platform(record.reviewer_platform.as_deref())?,
        id: record.id,
        repo_id: record.repo_id,
        issue_id: record.issue_id,
        source_branch: record.source_branch,
        target_branch: record.target_branch,
        title: record.title,
        review_comment: record.review_comment,
        created_at: record.created_at,
        merged_at: record.merged_at,
    })
}

/// Maps a duplicate-key failure to the same error the in-memory store reports
fn on_insert(kind: &'static str, id: &str) -> impl FnOnce(braid_db::Error) -> Error {
    let id = id.to_string();
    move |err| match err {
        braid_db::Error::Conflict(_) => Error::Config(format!("{} {} already exists", kind, id)),
        other => other.into(),
    }
}

#[async_trait]
impl Store for Database {
    async fn insert_repo(&self, repo: &RepoMeta) -> Result<()> {
        self.repos()
            .insert(&repo_record(repo))
            .await
            .map_err(on_insert("Repository", &repo.id))
    }

    async fn get_repo(&self, id: &str) -> Result<Option<RepoMeta>> {
        Ok(self.repos().get(id).await?.map(repo_meta))
    }

    async fn list_repos(&self) -> Result<Vec<RepoMeta>> {
        Ok(self.repos().list().await?.into_iter().map(repo_meta).collect())
    }

    async fn insert_issue(&self, issue: &Issue) -> Result<()> {
        self.issues()
            .insert(&issue_record(issue))
            .await
            .map_err(on_insert("Issue", &issue.id))
    }

    async fn get_issue(&self, id: &str) -> Result<Option<Issue>> {
        self.issues().get(id).await?.map(issue_from_record).transpose()
    }

    async fn update_issue(&self, issue: &Issue) -> Result<()> {
        self.issues()
            .update(&issue_record(issue))
            .await
            .map_err(|err| match err {
                braid_db::Error::NotFound(_) => Error::IssueNotFound(issue.id.clone()),
                other => other.into(),
            })
    }

    async fn list_issues(&self, repo_id: &str, status: Option<IssueStatus>) -> Result<Vec<Issue>> {
        self.issues()
            .list(repo_id, status.map(|s| s.as_str()))
            .await?
            .into_iter()
            .map(issue_from_record)
            .collect()
    }

    async fn insert_pr(&self, pr: &PullRequest) -> Result<()> {
        self.pull_requests()
            .insert(&pr_record(pr))
            .await
            .map_err(on_insert("Pull request", &pr.id))
    }

    async fn get_pr(&self, id: &str) -> Result<Option<PullRequest>> {
        self.pull_requests().get(id).await?.map(pr_from_record).transpose()
    }

    async fn update_pr(&self, pr: &PullRequest) -> Result<()> {
        self.pull_requests()
            .update(&pr_record(pr))
            .await
            .map_err(|err| match err {
                braid_db::Error::NotFound(_) => Error::PrNotFound(pr.id.clone()),
                other => other.into(),
            })
    }

    async fn list_prs(&self, repo_id: &str, status: Option<PrStatus>) -> Result<Vec<PullRequest>> {
        self.pull_requests()
            .list(repo_id, status.map(|s| s.as_str()))
            .await?
            .into_iter()
            .map(pr_from_record)
            .collect()
    }

    async fn list_prs_for_issue(&self, issue_id: &str) -> Result<Vec<PullRequest>> {
        self.pull_requests()
            .list_for_issue(issue_id)
            .await?
            .into_iter()
            .map(pr_from_record)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::NewIssue;
    use chrono::Utc;

    async fn store_with_repo() -> Database {
        let db = Database::in_memory().await.unwrap();
        db.insert_repo(&RepoMeta {
            id: "ab12cd34".to_string(),
            name: "Notes".to_string(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();
        db
    }

    fn pull_request(id: &str, issue: &Issue) -> PullRequest {
        PullRequest {
            id: id.to_string(),
            repo_id: issue.repo_id.clone(),
            issue_id: issue.id.clone(),
            source_branch: "issue/I1-claude".to_string(),
            target_branch: "main".to_string(),
            title: issue.title.clone(),
            status: PrStatus::Open,
            reviewer_platform: None,
            review_comment: None,
            created_at: Utc::now(),
            merged_at: None,
        }
    }

    #[tokio::test]
    async fn test_issue_round_trip_keeps_typed_fields() {
        let db = store_with_repo().await;
        let mut issue = Issue::from_new(
            "ab12cd34",
            NewIssue::new("Draft", "Write the draft")
                .with_id("I1")
                .assigned_to(Platform::Claude)
                .reviewed_by(Platform::Gemini)
                .depends_on(["I0"])
                .with_labels(["docs"]),
        )
        .unwrap();
        db.insert_issue(&issue).await.unwrap();
        assert_eq!(db.get_issue("I1").await.unwrap().unwrap(), issue);

        issue.set_status(IssueStatus::InProgress).unwrap();
        issue.branch_name = Some("issue/I1-claude".to_string());
        db.update_issue(&issue).await.unwrap();

        let in_progress = db.list_issues("ab12cd34", Some(IssueStatus::InProgress)).await.unwrap();
        assert_eq!(in_progress, vec![issue.clone()]);
        assert!(db.list_issues("ab12cd34", Some(IssueStatus::Open)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_errors_match_memory_store() {
        let db = store_with_repo().await;
        let issue = Issue::from_new("ab12cd34", NewIssue::new("Draft", "").with_id("I1")).unwrap();
        db.insert_issue(&issue).await.unwrap();

        assert!(matches!(db.insert_issue(&issue).await, Err(Error::Config(_))));

        let ghost = Issue::from_new("ab12cd34", NewIssue::new("Ghost", "").with_id("I9")).unwrap();
        assert!(matches!(db.update_issue(&ghost).await, Err(Error::IssueNotFound(id)) if id == "I9"));

        let pr = pull_request("p1", &issue);
        assert!(matches!(db.update_pr(&pr).await, Err(Error::PrNotFound(_))));
    }

    #[tokio::test]
    async fn test_pull_request_round_trip() {
        let db = store_with_repo().await;
        let issue = Issue::from_new("ab12cd34", NewIssue::new("Draft", "").with_id("I1")).unwrap();
        db.insert_issue(&issue).await.unwrap();

        let mut pr = pull_request("p1", &issue);
        db.insert_pr(&pr).await.unwrap();

        pr.set_status(PrStatus::Reviewing).unwrap();
        pr.reviewer_platform = Some(Platform::ChatGpt);
        db.update_pr(&pr).await.unwrap();

        assert_eq!(db.get_pr("p1").await.unwrap().unwrap(), pr);
        assert_eq!(db.list_prs_for_issue("I1").await.unwrap(), vec![pr.clone()]);
        assert_eq!(db.list_prs("ab12cd34", Some(PrStatus::Reviewing)).await.unwrap().len(), 1);
        assert!(db.list_prs("ab12cd34", Some(PrStatus::Open)).await.unwrap().is_empty());
    }
}
