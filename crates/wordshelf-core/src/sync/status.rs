//! Sync status published to the UI layer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a sync pass did not complete cleanly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SyncFailure {
    /// Not attempted: no connectivity
    Offline,
    /// Some queue items or a remote fetch failed; `synced` items did succeed
    Partial { synced: usize },
    /// The local store failed mid-pass
    Storage { message: String },
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => f.write_str("offline"),
            Self::Partial { synced } => write!(f, "partial ({synced} synced)"),
            Self::Storage { message } => write!(f, "storage error: {message}"),
        }
    }
}

/// Sync engine state machine
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    /// Every queued change was confirmed and the remote fetch succeeded
    Completed { synced: usize },
    Failed { failure: SyncFailure },
}

impl SyncStatus {
    pub const fn is_syncing(&self) -> bool {
        matches!(self, Self::Syncing)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Syncing => f.write_str("syncing"),
            Self::Completed { synced } => write!(f, "completed ({synced} synced)"),
            Self::Failed { failure } => write!(f, "failed: {failure}"),
        }
    }
}
