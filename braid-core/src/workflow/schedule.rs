//! Dependency readiness
//!
//! An issue is ready when it is still open, has not completed in this run,
//! and every dependency refers to a closed issue. Dependencies that do not
//! exist are never closed, so their dependents wait forever; the same holds
//! for cycles.

use std::collections::BTreeSet;

use crate::issues::{Issue, IssueStatus};

/// Ids of run issues that may start now, in run order
pub fn ready_issues<F>(run: &[Issue], completed: &BTreeSet<String>, status_of: F) -> Vec<String>
where
    F: Fn(&str) -> Option<IssueStatus>,
{
    run.iter()
        .filter(|issue| issue.status == IssueStatus::Open && !completed.contains(&issue.id))
        .filter(|issue| {
            issue
                .depends_on
                .iter()
                .all(|dep| status_of(dep) == Some(IssueStatus::Closed))
        })
        .map(|issue| issue.id.clone())
        .collect()
}

/// `(issue, dependency)` pairs whose dependency does not exist
pub fn unknown_dependencies<F>(run: &[Issue], status_of: F) -> Vec<(String, String)>
where
    F: Fn(&str) -> Option<IssueStatus>,
{
    run.iter()
        .flat_map(|issue| {
            issue
                .depends_on
                .iter()
                .filter(|dep| status_of(dep).is_none())
                .map(|dep| (issue.id.clone(), dep.clone()))
                .collect::<Vec<_>>()
        })
        .collect()
}
