//! In-process store used by tests and short-lived runs

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::Store;
use crate::issues::{Issue, IssueStatus};
use crate::pulls::{PrStatus, PullRequest};
use crate::repos::RepoMeta;
use crate::{Error, Result};

#[derive(Debug, Default)]
struct Tables {
    repos: Vec<RepoMeta>,
    issues: Vec<Issue>,
    pull_requests: Vec<PullRequest>,
}

/// Store that keeps everything in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_repo(&self, repo: &RepoMeta) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.repos.iter().any(|r| r.id == repo.id) {
            return Err(Error::Config(format!("Repository {} already exists", repo.id)));
        }
        tables.repos.push(repo.clone());
        Ok(())
    }

    async fn get_repo(&self, id: &str) -> Result<Option<RepoMeta>> {
        let tables = self.tables.lock().await;
        Ok(tables.repos.iter().find(|r| r.id == id).cloned())
    }

    async fn list_repos(&self) -> Result<Vec<RepoMeta>> {
        Ok(self.tables.lock().await.repos.clone())
    }

    async fn insert_issue(&self, issue: &Issue) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.issues.iter().any(|i| i.id == issue.id) {
            return Err(Error::Config(format!("Issue {} already exists", issue.id)));
        }
        tables.issues.push(issue.clone());
        Ok(())
    }

    async fn get_issue(&self, id: &str) -> Result<Option<Issue>> {
        let tables = self.tables.lock().await;
        Ok(tables.issues.iter().find(|i| i.id == id).cloned())
    }

    async fn update_issue(&self, issue: &Issue) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let slot = tables
            .issues
            .iter_mut()
            .find(|i| i.id == issue.id)
            .ok_or_else(|| Error::IssueNotFound(issue.id.clone()))?;
        *slot = issue.clone();
        Ok(())
    }

    async fn list_issues(&self, repo_id: &str, status: Option<IssueStatus>) -> Result<Vec<Issue>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .issues
            .iter()
            .filter(|i| i.repo_id == repo_id)
            .filter(|i| status.is_none() || status == Some(i.status))
            .cloned()
            .collect())
    }

    async fn insert_pr(&self, pr: &PullRequest) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.pull_requests.iter().any(|p| p.id == pr.id) {
            return Err(Error::Config(format!("Pull request {} already exists", pr.id)));
        }
        tables.pull_requests.push(pr.clone());
        Ok(())
    }

    async fn get_pr(&self, id: &str) -> Result<Option<PullRequest>> {
        let tables = self.tables.lock().await;
        Ok(tables.pull_requests.iter().find(|p| p.id == id).cloned())
    }

    async fn update_pr(&self, pr: &PullRequest) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let slot = tables
            .pull_requests
            .iter_mut()
            .find(|p| p.id == pr.id)
            .ok_or_else(|| Error::PrNotFound(pr.id.clone()))?;
        *slot = pr.clone();
        Ok(())
    }

    async fn list_prs(&self, repo_id: &str, status: Option<PrStatus>) -> Result<Vec<PullRequest>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .pull_requests
            .iter()
            .filter(|p| p.repo_id == repo_id)
            .filter(|p| status.is_none() || status == Some(p.status))
            .cloned()
            .collect())
    }

    async fn list_prs_for_issue(&self, issue_id: &str) -> Result<Vec<PullRequest>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .pull_requests
            .iter()
            .filter(|p| p.issue_id == issue_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::NewIssue;
    use chrono::Utc;

    fn repo(id: &str) -> RepoMeta {
        RepoMeta {
            id: id.to_string(),
            name: format!("repo {}", id),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_repo_insert_get_list() {
        let store = MemoryStore::new();
        store.insert_repo(&repo("aaaa0001")).await.unwrap();
        store.insert_repo(&repo("aaaa0002")).await.unwrap();

        assert!(store.insert_repo(&repo("aaaa0001")).await.is_err());
        assert_eq!(store.get_repo("aaaa0002").await.unwrap().unwrap().name, "repo aaaa0002");
        assert!(store.get_repo("missing").await.unwrap().is_none());

        let ids: Vec<_> = store.list_repos().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["aaaa0001", "aaaa0002"]);
    }

    #[tokio::test]
    async fn test_issue_filters_and_updates() {
        let store = MemoryStore::new();
        let mut first = Issue::from_new("r1", NewIssue::new("First", "").with_id("I1")).unwrap();
        let second = Issue::from_new("r1", NewIssue::new("Second", "").with_id("I2")).unwrap();
        let other = Issue::from_new("r2", NewIssue::new("Other", "").with_id("I3")).unwrap();

        for issue in [&first, &second, &other] {
            store.insert_issue(issue).await.unwrap();
        }
        assert!(matches!(store.insert_issue(&first).await, Err(Error::Config(_))));

        first.set_status(IssueStatus::InProgress).unwrap();
        store.update_issue(&first).await.unwrap();

        let all = store.list_issues("r1", None).await.unwrap();
        assert_eq!(all.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(), vec!["I1", "I2"]);

        let open = store.list_issues("r1", Some(IssueStatus::Open)).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, "I2");

        let ghost = Issue::from_new("r1", NewIssue::new("Ghost", "").with_id("I9")).unwrap();
        assert!(matches!(
            store.update_issue(&ghost).await,
            Err(Error::IssueNotFound(id)) if id == "I9"
        ));
    }
}
