//! Braid Core - workflow orchestration across chat platforms
//!
//! Issues are assigned to chat platforms driven through browser tabs. Each
//! platform's response is committed to an issue branch in a local git repo,
//! opened as a pull request, optionally reviewed by a second platform, and
//! merged. The [`WorkflowEngine`] schedules a batch of issues along their
//! dependency graph until every one is merged.

pub mod adapter;
pub mod config;
pub mod error;
pub mod issues;
pub mod lifecycle;
pub mod messages;
pub mod platform;
pub mod pulls;
pub mod repos;
pub mod store;
pub mod tabs;
pub mod vcs;
pub mod workflow;

pub use adapter::{PlatformResponse, PromptRouter, TabCommand, TabMessenger, TabReply};
pub use config::Config;
pub use error::{Error, Result};
pub use issues::{Issue, IssueManager, IssueStatus, NewIssue};
pub use lifecycle::Lifecycle;
pub use messages::{ApiRequest, ApiResponse, ContentMessage, Dispatcher};
pub use platform::{Platform, SendMode};
pub use pulls::{PrManager, PrStatus, PullRequest, ReviewAction};
pub use repos::{RepoManager, RepoMeta};
pub use store::{MemoryStore, Store};
pub use tabs::{TabId, TabRegistry, TabStatus};
pub use vcs::{GitBackend, VersionControl};
pub use workflow::{WorkflowEngine, WorkflowState};
