//! Error types for moodlesync-core

use thiserror::Error;

/// Result type alias using moodlesync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the local mirror store
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),
}
