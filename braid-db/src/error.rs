//! Error types for database operations

use thiserror::Error;

/// Database error types
#[derive(Error, Debug)]
pub enum Error {
    /// SQLx database error
    #[error("Database error: {0}")]
    Sqlx(sqlx::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Row with the given key already exists
    #[error("Already exists: {0}")]
    Conflict(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db)
                if db.is_unique_violation() || db.message().starts_with("UNIQUE constraint failed") =>
            {
                Error::Conflict(db.message().to_string())
            }
            _ => Error::Sqlx(err),
        }
    }
}

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, Error>;
