//! Repository modules for database operations

pub mod issues;
pub mod pull_requests;
pub mod repositories;

pub use issues::IssueRepository;
pub use pull_requests::PullRequestRepository;
pub use repositories::RepoRepository;
