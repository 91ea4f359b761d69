//! Sync engine: replays the pending-change queue against the remote backend
//! and pulls remote deltas back into the local store.

mod backend;
pub mod conflict;
mod engine;
mod http;
mod memory;
mod status;

pub use backend::{BackendError, BackendResult, RemoteBackend, RemoteId};
pub use conflict::{resolve, Resolution};
pub use engine::{spawn_auto_sync, SyncAttempt, SyncEngine, SyncEngineConfig};
pub use http::HttpBackend;
pub use memory::{BackendCall, InMemoryBackend};
pub use status::{SyncFailure, SyncStatus};
