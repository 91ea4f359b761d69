use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] wordshelf_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("{0} cannot be empty")]
    EmptyValue(&'static str),
    #[error("No book found for id/prefix: {0}")]
    BookNotFound(String),
    #[error("No word found for id/prefix: {0}")]
    WordNotFound(String),
    #[error("{0}")]
    AmbiguousId(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Sync is not configured. Run `wordshelf config set --backend-url <URL>` or set WORDSHELF_BACKEND_URL."
    )]
    SyncNotConfigured,
    #[error("Sync {0}")]
    SyncFailed(String),
    #[error("Refusing to wipe the local cache without --yes")]
    ResetNotConfirmed,
}
