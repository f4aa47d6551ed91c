//! CLI command implementations

pub mod issue;
pub mod pr;
pub mod repo;

pub use issue::IssueArgs;
pub use pr::PrArgs;
pub use repo::RepoArgs;

use std::sync::Arc;

use braid_core::{Config, GitBackend, RepoManager, Store};
use braid_db::Database;

/// Opened store and repos directory for one invocation
pub struct Workspace {
    pub store: Arc<dyn Store>,
    pub vcs: Arc<GitBackend>,
}

impl Workspace {
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let db = Database::new(config.database_path()).await?;
        tracing::debug!(database = %config.database_path().display(), "Opened store");

        Ok(Self {
            store: Arc::new(db),
            vcs: Arc::new(GitBackend::new(config.repos_dir(), &config.git)),
        })
    }

    pub fn repos(&self) -> RepoManager {
        RepoManager::new(self.store.clone(), self.vcs.clone())
    }
}
