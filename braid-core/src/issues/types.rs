//! Issue records and their lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::lifecycle::Lifecycle;
use crate::platform::Platform;
use crate::{Error, Result};

/// Where an issue is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// Created, waiting for dependencies or a start
    #[default]
    Open,
    /// Reserved; no transition reaches it
    Assigned,
    /// Branch created and prompt routed to the assigned platform
    InProgress,
    /// Response committed and a pull request opened
    Review,
    /// Pull request merged
    Closed,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Open => "open",
            IssueStatus::Assigned => "assigned",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Review => "review",
            IssueStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "open" => Ok(IssueStatus::Open),
            "assigned" => Ok(IssueStatus::Assigned),
            "in_progress" => Ok(IssueStatus::InProgress),
            "review" => Ok(IssueStatus::Review),
            "closed" => Ok(IssueStatus::Closed),
            _ => Err(format!("Unknown issue status: {}", s)),
        }
    }
}

impl Lifecycle for IssueStatus {
    const ENTITY: &'static str = "issue";

    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (IssueStatus::Open, IssueStatus::InProgress)
                | (IssueStatus::InProgress, IssueStatus::Review)
                | (IssueStatus::Review, IssueStatus::Closed)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, IssueStatus::Closed)
    }
}

/// A unit of work routed to one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub repo_id: String,
    pub title: String,
    /// Sent verbatim as the prompt
    pub description: String,
    pub assigned_platform: Option<Platform>,
    pub reviewer_platform: Option<Platform>,
    pub status: IssueStatus,
    pub branch_name: Option<String>,
    pub depends_on: Vec<String>,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Definition of an issue to create
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewIssue {
    /// Caller-chosen identifier; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assigned_platform: Option<Platform>,
    #[serde(default)]
    pub reviewer_platform: Option<Platform>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl NewIssue {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn assigned_to(mut self, platform: Platform) -> Self {
        self.assigned_platform = Some(platform);
        self
    }

    pub fn reviewed_by(mut self, platform: Platform) -> Self {
        self.reviewer_platform = Some(platform);
        self
    }

    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }
}

/// Branch name for an issue's work, stable for the same inputs
pub fn branch_name(issue_id: &str, platform: Platform) -> String {
    format!("issue/{}-{}", issue_id, platform)
}

/// Issue ids end up in branch names and file paths
pub fn validate_issue_id(id: &str) -> Result<()> {
    // `..` is not allowed anywhere in a git ref name
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && !id.contains("..")
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid issue id '{}': use letters, digits, '-', '_' or '.'",
            id
        )))
    }
}

fn dedup_in_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

impl Issue {
    /// Build an `open` issue from its definition
    pub fn from_new(repo_id: &str, new: NewIssue) -> Result<Self> {
        if new.title.trim().is_empty() {
            return Err(Error::Config("Issue title must not be empty".to_string()));
        }

        let id = match new.id {
            Some(id) => {
                validate_issue_id(&id)?;
                id
            }
            None => Uuid::new_v4().simple().to_string(),
        };

        if new.depends_on.iter().any(|dep| dep == &id) {
            return Err(Error::Config(format!("Issue {} cannot depend on itself", id)));
        }

        Ok(Self {
            id,
            repo_id: repo_id.to_string(),
            title: new.title,
            description: new.description,
            assigned_platform: new.assigned_platform,
            reviewer_platform: new.reviewer_platform,
            status: IssueStatus::Open,
            branch_name: None,
            depends_on: dedup_in_order(new.depends_on),
            labels: dedup_in_order(new.labels),
            created_at: Utc::now(),
            closed_at: None,
        })
    }

    /// Move to `status`, stamping the close time when closing
    pub fn set_status(&mut self, status: IssueStatus) -> Result<()> {
        self.status.advance(status)?;
        if status == IssueStatus::Closed {
            self.closed_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn is_assigned_to(&self, platform: Platform) -> bool {
        self.assigned_platform == Some(platform)
    }
}
