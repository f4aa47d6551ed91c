//! Database layer for Braid
//!
//! Provides persistence for repo metadata, issues and pull requests.

pub mod error;
pub mod models;
pub mod repos;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

pub use error::{Error, Result};
pub use models::{IssueRecord, PullRequestRecord, RepoRecord};
pub use repos::{IssueRepository, PullRequestRepository, RepoRepository};

/// Database connection pool
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) a database file and run migrations
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Io(format!("Failed to create database directory: {}", e)))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        tracing::debug!(path = %db_path.display(), "Opened database");
        Self::with_pool(pool).await
    }

    /// A private in-memory database
    pub async fn in_memory() -> Result<Self> {
        // Every connection to :memory: is its own database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Create tables and indexes that do not exist yet
    pub async fn migrate(&self) -> Result<()> {
        let migration_sql = include_str!("../migrations/001_initial_schema.sql");
        sqlx::raw_sql(migration_sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn repos(&self) -> RepoRepository<'_> {
        RepoRepository::new(&self.pool)
    }

    pub fn issues(&self) -> IssueRepository<'_> {
        IssueRepository::new(&self.pool)
    }

    pub fn pull_requests(&self) -> PullRequestRepository<'_> {
        PullRequestRepository::new(&self.pool)
    }
}
