//! Pull request records and their lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::lifecycle::Lifecycle;
use crate::platform::Platform;
use crate::Result;

/// Where a pull request is in review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PrStatus {
    #[default]
    Open,
    /// Review prompt delivered to a reviewer platform
    Reviewing,
    Approved,
    Rejected,
    Merged,
}

impl PrStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrStatus::Open => "open",
            PrStatus::Reviewing => "reviewing",
            PrStatus::Approved => "approved",
            PrStatus::Rejected => "rejected",
            PrStatus::Merged => "merged",
        }
    }

    /// Neither merged nor rejected
    pub fn is_active(&self) -> bool {
        !matches!(self, PrStatus::Merged | PrStatus::Rejected)
    }
}

impl fmt::Display for PrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PrStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "open" => Ok(PrStatus::Open),
            "reviewing" => Ok(PrStatus::Reviewing),
            "approved" => Ok(PrStatus::Approved),
            "rejected" => Ok(PrStatus::Rejected),
            "merged" => Ok(PrStatus::Merged),
            _ => Err(format!("Unknown pull request status: {}", s)),
        }
    }
}

impl Lifecycle for PrStatus {
    const ENTITY: &'static str = "pull request";

    fn can_transition_to(&self, next: Self) -> bool {
        use PrStatus::*;
        matches!(
            (self, next),
            (Open, Reviewing)
                | (Open, Approved)
                | (Open, Rejected)
                | (Reviewing, Approved)
                | (Reviewing, Rejected)
                | (Approved, Merged)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, PrStatus::Merged | PrStatus::Rejected)
    }
}

/// Reviewer verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    pub fn resulting_status(&self) -> PrStatus {
        match self {
            ReviewAction::Approve => PrStatus::Approved,
            ReviewAction::Reject => PrStatus::Rejected,
        }
    }
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewAction::Approve => write!(f, "approve"),
            ReviewAction::Reject => write!(f, "reject"),
        }
    }
}

impl std::str::FromStr for ReviewAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "approve" => Ok(ReviewAction::Approve),
            "reject" => Ok(ReviewAction::Reject),
            _ => Err(format!("Unknown review action: {}", s)),
        }
    }
}

/// Proposal to merge an issue branch into the target branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: String,
    pub repo_id: String,
    pub issue_id: String,
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    pub status: PrStatus,
    pub reviewer_platform: Option<Platform>,
    pub review_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    /// Move to `status`, stamping the merge time when merging
    pub fn set_status(&mut self, status: PrStatus) -> Result<()> {
        self.status.advance(status)?;
        if status == PrStatus::Merged {
            self.merged_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_paths() {
        let mut direct = PrStatus::Open;
        direct.advance(PrStatus::Approved).unwrap();
        direct.advance(PrStatus::Merged).unwrap();
        assert!(direct.is_terminal());

        let mut reviewed = PrStatus::Open;
        reviewed.advance(PrStatus::Reviewing).unwrap();
        reviewed.advance(PrStatus::Rejected).unwrap();
        assert!(reviewed.is_terminal());
        assert!(reviewed.advance(PrStatus::Approved).is_err());
    }

    #[test]
    fn test_merge_requires_approval() {
        for status in [PrStatus::Open, PrStatus::Reviewing, PrStatus::Rejected] {
            assert!(!status.can_transition_to(PrStatus::Merged));
        }
        assert!(PrStatus::Approved.can_transition_to(PrStatus::Merged));
    }

    #[test]
    fn test_active_statuses() {
        assert!(PrStatus::Open.is_active());
        assert!(PrStatus::Reviewing.is_active());
        assert!(PrStatus::Approved.is_active());
        assert!(!PrStatus::Rejected.is_active());
        assert!(!PrStatus::Merged.is_active());
    }

    #[test]
    fn test_review_action_parse_and_serde() {
        assert_eq!("APPROVE".parse::<ReviewAction>().unwrap(), ReviewAction::Approve);
        assert_eq!(ReviewAction::Reject.resulting_status(), PrStatus::Rejected);
        let action: ReviewAction = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(action, ReviewAction::Reject);
        assert!("maybe".parse::<ReviewAction>().is_err());
    }
}
