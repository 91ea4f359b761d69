//! Data models for wordshelf

mod book;
mod entity;
mod id;
mod pending_change;
mod record;
mod sync_conflict;
mod vocab_word;

pub use book::Book;
pub use entity::{Entity, EntityType, SyncedEntity};
pub use id::{BookId, ChangeId, OwnerId, WordId};
pub use pending_change::{ChangeAction, PendingChange};
pub use record::{LocalRecord, RecordLifecycle};
pub use sync_conflict::{ConflictWinner, SyncConflict};
pub use vocab_word::VocabWord;
