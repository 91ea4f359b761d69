//! Error types for wordshelf-core

use thiserror::Error;

/// Result type alias using wordshelf-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in wordshelf-core operations
///
/// Backend failures live in [`crate::sync::BackendError`] and only ever show
/// up in the sync status.
#[derive(Error, Debug)]
pub enum Error {
    /// Local store failure (disk full, corruption, constraint violation)
    #[error("Persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found (or only present as a tombstone)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
