//! Repository records and creation

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Store;
use crate::vcs::{RepoInfo, VersionControl};
use crate::{Error, Result};

/// Stored metadata for a repo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoMeta {
    /// 8 hex characters
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Creates repos and looks them up
#[derive(Clone)]
pub struct RepoManager {
    store: Arc<dyn Store>,
    vcs: Arc<dyn VersionControl>,
}

impl RepoManager {
    pub fn new(store: Arc<dyn Store>, vcs: Arc<dyn VersionControl>) -> Self {
        Self { store, vcs }
    }

    /// Initialize a working tree and record it
    pub async fn create_repo(&self, name: &str) -> Result<RepoMeta> {
        if name.trim().is_empty() {
            return Err(Error::Config("Repository name must not be empty".to_string()));
        }

        let meta = RepoMeta {
            id: Uuid::new_v4().simple().to_string()[..8].to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };

        self.vcs.init_repo(&meta.id, &meta.name)?;
        self.store.insert_repo(&meta).await?;

        tracing::info!(repo_id = %meta.id, name, "Created repository");
        Ok(meta)
    }

    pub async fn get_repo(&self, id: &str) -> Result<RepoMeta> {
        self.store
            .get_repo(id)
            .await?
            .ok_or_else(|| Error::RepoNotFound(id.to_string()))
    }

    pub async fn list_repos(&self) -> Result<Vec<RepoMeta>> {
        self.store.list_repos().await
    }

    /// Recorded repos with their working-tree state
    ///
    /// Repos whose working tree cannot be read are skipped.
    pub async fn list_repo_info(&self) -> Result<Vec<RepoInfo>> {
        let mut infos = Vec::new();
        for meta in self.store.list_repos().await? {
            match self.vcs.repo_info(&meta.id) {
                Ok(info) => infos.push(RepoInfo {
                    name: meta.name,
                    ..info
                }),
                Err(e) => tracing::warn!(repo_id = %meta.id, error = %e, "Skipping unreadable repository"),
            }
        }
        Ok(infos)
    }

    pub async fn repo_info(&self, id: &str) -> Result<RepoInfo> {
        let meta = self.get_repo(id).await?;
        let info = self.vcs.repo_info(id)?;
        Ok(RepoInfo {
            name: meta.name,
            ..info
        })
    }
}
