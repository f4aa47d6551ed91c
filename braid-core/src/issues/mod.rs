//! Issues: units of work assigned to a platform

mod manager;
mod types;

pub use manager::{response_path, IssueManager, StartOutcome};
pub use types::{branch_name, validate_issue_id, Issue, IssueStatus, NewIssue};
