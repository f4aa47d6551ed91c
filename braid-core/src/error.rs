//! Error types for Braid

use thiserror::Error;

use crate::tabs::TabId;

/// Result type alias for Braid operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Braid operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML serialization error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// Issue lookup failed
    #[error("Issue {0} not found")]
    IssueNotFound(String),

    /// Pull request lookup failed
    #[error("Pull request {0} not found")]
    PrNotFound(String),

    /// Repository lookup failed
    #[error("Repository {0} not found")]
    RepoNotFound(String),

    /// Missing platform assignment, branch, or other required setting
    #[error("Configuration error: {0}")]
    Config(String),

    /// A lifecycle transition that the state machine does not allow
    #[error("Invalid {entity} transition from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// A message could not be delivered to a tab
    #[error("Delivery to tab {tab_id} failed: {reason}")]
    Delivery { tab_id: TabId, reason: String },

    /// Version-control backend error
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// Merge stopped on conflicting changes
    #[error("Merge conflict merging '{from_branch}' into '{into_branch}'")]
    MergeConflict {
        from_branch: String,
        into_branch: String,
    },

    /// Persistent store error
    #[error("Storage error: {0}")]
    Store(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error reports an unknown issue, pull request, or repo
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::IssueNotFound(_) | Error::PrNotFound(_) | Error::RepoNotFound(_)
        )
    }

    /// Whether this error came from the version-control backend
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Error::Git(_) | Error::MergeConflict { .. })
    }
}

#[cfg(feature = "database")]
impl From<braid_db::Error> for Error {
    fn from(err: braid_db::Error) -> Self {
        Error::Store(err.to_string())
    }
}
