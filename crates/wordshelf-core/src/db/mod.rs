//! Local store for wordshelf
//!
//! Durable, queryable storage for the two entity collections and the
//! pending-change queue. No business logic lives here.

mod connection;
mod migrations;
mod pending_repository;
mod query;
mod record_store;
mod sync_log_repository;

pub use connection::Database;
pub use pending_repository::{PendingChangeRepository, SqlitePendingChangeRepository};
pub use query::{RecordQuery, SortOrder};
pub use record_store::{RecordStore, SqliteRecordStore, StoredEntity};
pub use sync_log_repository::{SqliteSyncLogRepository, SyncLogRepository};
