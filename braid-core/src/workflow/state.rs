//! Run state for the workflow engine

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::SendMode;

/// Overall status of the current run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// No run has been started
    #[default]
    Idle,
    Running,
    Completed,
    /// Reserved; failures are recorded in `error` without leaving `Running`
    Error,
}

/// Snapshot of a workflow run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub status: RunStatus,
    pub repo_id: String,
    pub send_mode: SendMode,
    /// Issues created for this run, in definition order
    pub issue_ids: Vec<String>,
    pub completed_ids: BTreeSet<String>,
    /// Last failure seen while handling a response or review
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

impl WorkflowState {
    /// A freshly started run
    pub fn running(repo_id: impl Into<String>, send_mode: SendMode, issue_ids: Vec<String>) -> Self {
        Self {
            status: RunStatus::Running,
            repo_id: repo_id.into(),
            send_mode,
            issue_ids,
            completed_ids: BTreeSet::new(),
            error: None,
            started_at: Some(Utc::now()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    pub fn contains(&self, issue_id: &str) -> bool {
        self.issue_ids.iter().any(|id| id == issue_id)
    }

    /// Every run issue has completed
    pub fn is_complete(&self) -> bool {
        self.issue_ids.iter().all(|id| self.completed_ids.contains(id))
    }

    /// Record a run issue as complete, finishing the run when it was the last
    ///
    /// Ids outside the run are ignored. Repeated calls are harmless.
    pub fn mark_complete(&mut self, issue_id: &str) {
        if !self.contains(issue_id) {
            return;
        }

        if self.completed_ids.insert(issue_id.to_string()) {
            tracing::info!(
                issue_id,
                completed = self.completed_ids.len(),
                total = self.issue_ids.len(),
                "Run issue complete"
            );
        }

        if self.is_running() && self.is_complete() {
            self.status = RunStatus::Completed;
            tracing::info!(repo_id = %self.repo_id, "Workflow run completed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> WorkflowState {
        WorkflowState::running("r1", SendMode::Auto, vec!["I1".to_string(), "I2".to_string()])
    }

    #[test]
    fn test_default_is_idle() {
        let state = WorkflowState::default();
        assert_eq!(state.status, RunStatus::Idle);
        assert!(state.started_at.is_none());
    }

    #[test]
    fn test_completes_when_every_issue_is_done() {
        let mut state = run();
        state.mark_complete("I2");
        assert!(state.is_running());
        state.mark_complete("I1");
        assert_eq!(state.status, RunStatus::Completed);
    }

    #[test]
    fn test_mark_complete_is_idempotent() {
        let mut state = run();
        state.mark_complete("I1");
        state.mark_complete("I1");
        assert_eq!(state.completed_ids.len(), 1);
        assert!(state.is_running());

        state.mark_complete("I2");
        let snapshot = state.clone();
        state.mark_complete("I2");
        assert_eq!(state, snapshot);
    }

    #[test]
    fn test_foreign_ids_are_ignored() {
        let mut state = run();
        state.mark_complete("other");
        assert!(state.completed_ids.is_empty());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RunStatus::Completed).unwrap(), "\"completed\"");
    }
}
