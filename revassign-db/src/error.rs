//! Error types for database operations

use thiserror::Error;

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx database error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value the domain model cannot represent
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, DbError>;

impl From<DbError> for revassign_core::Error {
    fn from(err: DbError) -> Self {
        revassign_core::Error::storage(err)
    }
}

/// Wrap a driver error as an engine storage error
pub(crate) fn storage(err: sqlx::Error) -> revassign_core::Error {
    DbError::from(err).into()
}

/// Whether the driver reported a primary key or unique conflict
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}
