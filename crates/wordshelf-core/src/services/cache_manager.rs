//! Cache manager: the one read/write path for books and words.
//!
//! Every write lands locally and, when it has to reach the backend, enqueues
//! a [`PendingChange`] in the same transaction. Nothing here touches the
//! network.

use std::path::Path;
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::db::{
    Database, PendingChangeRepository, RecordQuery, RecordStore, SqlitePendingChangeRepository,
    SqliteRecordStore, SqliteSyncLogRepository, StoredEntity, SyncLogRepository,
};
use crate::error::{Error, Result};
use crate::models::{
    Book, BookId, ChangeAction, ChangeId, ConflictWinner, Entity, EntityType, LocalRecord,
    OwnerId, PendingChange, RecordLifecycle, SyncConflict, SyncedEntity, VocabWord, WordId,
};
use crate::sync::{resolve, Resolution};
use crate::util::{next_timestamp, now_millis};

const CONFLICT_STRATEGY: &str = "last_write_wins";

/// Thread-safe cache over the local store.
///
/// Cloning is cheap; clones share the connection and the pending-count
/// channel.
#[derive(Clone)]
pub struct CacheManager {
    db: Arc<Mutex<Database>>,
    pending_count: Arc<watch::Sender<usize>>,
}

impl CacheManager {
    /// Wrap an already opened database.
    pub fn new(db: Database) -> Result<Self> {
        let pending = SqlitePendingChangeRepository::new(db.connection()).count()?;
        let (pending_count, _) = watch::channel(pending);
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            pending_count: Arc::new(pending_count),
        })
    }

    /// Open (or create) the cache at the given filesystem path.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(Database::open(path)?)
    }

    /// Open an in-memory cache (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        Self::new(Database::open_in_memory()?)
    }

    async fn read<R>(&self, op: impl FnOnce(&Connection) -> Result<R>) -> Result<R> {
        let db = self.db.lock().await;
        op(db.connection())
    }

    /// Run `op` in one transaction, then publish the queue length.
    async fn write<R>(&self, op: impl FnOnce(&Connection) -> Result<R>) -> Result<R> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        let result = op(&tx)?;
        tx.commit()?;
        let pending = SqlitePendingChangeRepository::new(db.connection()).count()?;
        drop(db);

        self.pending_count.send_if_modified(|current| {
            let changed = *current != pending;
            *current = pending;
            changed
        });
        Ok(result)
    }

    // Reads

    /// Visible books of `owner_id`, newest first.
    pub async fn fetch_books(&self, owner_id: OwnerId) -> Result<Vec<Book>> {
        self.read(|conn| {
            find_entities(conn, &RecordQuery::visible().owned_by(owner_id))
        })
        .await
    }

    pub async fn fetch_book(&self, id: &BookId) -> Result<Option<Book>> {
        self.read(|conn| find_visible(conn, &id.as_str())).await
    }

    /// Visible words of one book, or of every book when `book_id` is `None`.
    pub async fn fetch_words(&self, book_id: Option<BookId>) -> Result<Vec<VocabWord>> {
        let query = match book_id {
            Some(book_id) => RecordQuery::visible().in_book(Some(book_id)),
            None => RecordQuery::visible(),
        };
        self.read(|conn| find_entities(conn, &query)).await
    }

    /// Visible words not tied to any book.
    pub async fn fetch_global_words(&self) -> Result<Vec<VocabWord>> {
        self.read(|conn| find_entities(conn, &RecordQuery::visible().in_book(None)))
            .await
    }

    pub async fn fetch_word(&self, id: &WordId) -> Result<Option<VocabWord>> {
        self.read(|conn| find_visible(conn, &id.as_str())).await
    }

    // Writes

    /// Store a book and return it as saved.
    ///
    /// With `needs_sync` the timestamp is bumped and a create/update is
    /// queued. Without it the record is taken as-is (remote state) and any
    /// queued change for it is dropped.
    pub async fn save_book(&self, book: Book, needs_sync: bool) -> Result<Book> {
        if needs_sync && book.title.trim().is_empty() {
            return Err(Error::InvalidInput("book title must not be empty".to_string()));
        }
        self.write(|conn| save_entity(conn, book, needs_sync)).await
    }

    /// Store a word and return it as saved. See [`Self::save_book`].
    pub async fn save_word(&self, word: VocabWord, needs_sync: bool) -> Result<VocabWord> {
        if needs_sync && word.word.trim().is_empty() {
            return Err(Error::InvalidInput("word must not be empty".to_string()));
        }
        self.write(|conn| save_entity(conn, word, needs_sync)).await
    }

    /// Soft delete (tombstone + queued delete) or, with `hard`, physical
    /// removal of the record and everything queued for it.
    pub async fn delete_book(&self, id: &BookId, hard: bool) -> Result<()> {
        let (key, uuid) = (id.as_str(), id.as_uuid());
        if hard {
            self.write(|conn| hard_delete::<Book>(conn, &key, uuid)).await
        } else {
            self.write(|conn| soft_delete::<Book>(conn, &key)).await
        }
    }

    /// See [`Self::delete_book`].
    pub async fn delete_word(&self, id: &WordId, hard: bool) -> Result<()> {
        let (key, uuid) = (id.as_str(), id.as_uuid());
        if hard {
            self.write(|conn| hard_delete::<VocabWord>(conn, &key, uuid))
                .await
        } else {
            self.write(|conn| soft_delete::<VocabWord>(conn, &key)).await
        }
    }

    /// Flip the mastered flag of a visible word and queue the update.
    pub async fn update_mastered_status(&self, id: &WordId, mastered: bool) -> Result<VocabWord> {
        let key = id.as_str();
        self.write(|conn| {
            let mut word: VocabWord = find_visible(conn, &key)?
                .ok_or_else(|| Error::NotFound(format!("word {key}")))?;
            word.mastered = mastered;
            save_entity(conn, word, true)
        })
        .await
    }

    /// Wipe every collection, the queue and the sync log.
    pub async fn clear_all(&self) -> Result<()> {
        self.db.lock().await.clear_all()?;
        self.pending_count.send_replace(0);
        Ok(())
    }

    // Queue

    pub async fn pending_count(&self) -> Result<usize> {
        self.read(|conn| SqlitePendingChangeRepository::new(conn).count())
            .await
    }

    /// Queued changes in replay order (oldest first).
    pub async fn pending_changes(&self) -> Result<Vec<PendingChange>> {
        self.read(|conn| SqlitePendingChangeRepository::new(conn).list())
            .await
    }

    /// Receiver that sees the queue length after every write.
    pub fn subscribe_pending_count(&self) -> watch::Receiver<usize> {
        self.pending_count.subscribe()
    }

    /// Whether a change is still waiting in the queue.
    pub async fn is_queued(&self, change_id: &ChangeId) -> Result<bool> {
        self.read(|conn| {
            Ok(SqlitePendingChangeRepository::new(conn)
                .get(change_id)?
                .is_some())
        })
        .await
    }

    /// Remove a change the backend accepted.
    ///
    /// Returns `false` when the change had already left the queue; the
    /// record is then left alone. Once nothing else is queued for the entity
    /// its record is clean again, and a confirmed tombstone becomes gone.
    pub async fn confirm_change(&self, change: &PendingChange) -> Result<bool> {
        let change_id = change.id;
        let entity_id = change.entity_id;
        let entity_type = change.entity_type;
        self.write(move |conn| {
            let pending = SqlitePendingChangeRepository::new(conn);
            if !pending.remove(&change_id)? {
                return Ok(false);
            }
            if pending.count_for_entity(entity_id)? > 0 {
                return Ok(true);
            }
            let key = entity_id.to_string();
            match entity_type {
                EntityType::Book => settle::<Book>(conn, &key)?,
                EntityType::VocabWord => settle::<VocabWord>(conn, &key)?,
            }
            Ok(true)
        })
        .await
    }

    /// Count a failed dispatch; the change stays queued.
    pub async fn record_failed_attempt(&self, change_id: &ChangeId) -> Result<Option<u32>> {
        self.write(|conn| SqlitePendingChangeRepository::new(conn).increment_retry(change_id))
            .await
    }

    // Engine-facing reads and reconciliation

    /// Book record by id, tombstones included.
    pub async fn raw_book(&self, id: &BookId) -> Result<Option<LocalRecord<Book>>> {
        self.read(|conn| SqliteRecordStore::new(conn).get(&id.as_str()))
            .await
    }

    /// Word record by id, tombstones included.
    pub async fn raw_word(&self, id: &WordId) -> Result<Option<LocalRecord<VocabWord>>> {
        self.read(|conn| SqliteRecordStore::new(conn).get(&id.as_str()))
            .await
    }

    /// Reconcile one incoming remote record with the local copy.
    ///
    /// Read, decision and write happen under one lock so a concurrent local
    /// edit cannot slip in between.
    pub async fn apply_remote(&self, remote: Entity) -> Result<Resolution> {
        self.write(|conn| match remote {
            Entity::Book(book) => absorb_remote(conn, book),
            Entity::Word(word) => absorb_remote(conn, word),
        })
        .await
    }

    /// Physically drop every confirmed tombstone.
    pub async fn sweep_tombstones(&self) -> Result<usize> {
        let swept = self
            .write(|conn| {
                let store = SqliteRecordStore::new(conn);
                Ok(store.sweep_gone::<VocabWord>()? + store.sweep_gone::<Book>()?)
            })
            .await?;
        if swept > 0 {
            tracing::debug!("Swept {swept} tombstones");
        }
        Ok(swept)
    }

    pub async fn last_sync_at(&self) -> Result<Option<i64>> {
        self.read(|conn| SqliteSyncLogRepository::new(conn).last_sync_at())
            .await
    }

    pub async fn set_last_sync_at(&self, timestamp_ms: i64) -> Result<()> {
        self.write(|conn| SqliteSyncLogRepository::new(conn).set_last_sync_at(timestamp_ms))
            .await
    }

    /// Most recent conflicts first.
    pub async fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        self.read(|conn| SqliteSyncLogRepository::new(conn).list_conflicts(limit))
            .await
    }
}

fn find_entities<T: StoredEntity>(conn: &Connection, query: &RecordQuery) -> Result<Vec<T>> {
    Ok(SqliteRecordStore::new(conn)
        .find::<T>(query)?
        .into_iter()
        .map(|record| record.entity)
        .collect())
}

fn find_visible<T: StoredEntity>(conn: &Connection, key: &str) -> Result<Option<T>> {
    Ok(SqliteRecordStore::new(conn)
        .get::<T>(key)?
        .filter(LocalRecord::is_visible)
        .map(|record| record.entity))
}

fn save_entity<T>(conn: &Connection, mut entity: T, needs_sync: bool) -> Result<T>
where
    T: StoredEntity + SyncedEntity,
{
    let store = SqliteRecordStore::new(conn);
    let pending = SqlitePendingChangeRepository::new(conn);

    if !needs_sync {
        store.upsert(&LocalRecord::active(entity.clone(), false))?;
        pending.remove_for_entity(entity.uuid())?;
        return Ok(entity);
    }

    let existing = store.get::<T>(&entity.key())?;
    // A queued or confirmed delete means the remote copy is going away, so
    // the record has to be created again
    let action = match existing.as_ref().map(|record| record.lifecycle) {
        Some(RecordLifecycle::Active) => ChangeAction::Update,
        Some(RecordLifecycle::PendingDelete | RecordLifecycle::Gone) | None => {
            ChangeAction::Create
        }
    };
    entity.set_updated_at(next_timestamp(
        existing.as_ref().map(|record| record.entity.updated_at()),
    ));

    store.upsert(&LocalRecord::active(entity.clone(), true))?;
    pending.enqueue(&PendingChange::upsert(&entity.clone().into(), action)?)?;
    tracing::debug!("Queued {action} for {} {}", T::ENTITY_TYPE, entity.key());
    Ok(entity)
}

fn soft_delete<T>(conn: &Connection, key: &str) -> Result<()>
where
    T: StoredEntity + SyncedEntity,
{
    let store = SqliteRecordStore::new(conn);
    let mut record = store
        .get::<T>(key)?
        .filter(LocalRecord::is_visible)
        .ok_or_else(|| Error::NotFound(format!("{} {key}", T::ENTITY_TYPE)))?;

    let updated_at = next_timestamp(Some(record.entity.updated_at()));
    record.entity.set_updated_at(updated_at);
    record.needs_sync = true;
    record.lifecycle = RecordLifecycle::PendingDelete;
    store.upsert(&record)?;

    SqlitePendingChangeRepository::new(conn)
        .enqueue(&PendingChange::delete(T::ENTITY_TYPE, record.entity.uuid()))?;
    tracing::debug!("Queued delete for {} {key}", T::ENTITY_TYPE);
    Ok(())
}

fn hard_delete<T: StoredEntity>(conn: &Connection, key: &str, uuid: Uuid) -> Result<()> {
    SqliteRecordStore::new(conn).delete::<T>(key)?;
    SqlitePendingChangeRepository::new(conn).remove_for_entity(uuid)?;
    Ok(())
}

fn settle<T: StoredEntity>(conn: &Connection, key: &str) -> Result<()> {
    let store = SqliteRecordStore::new(conn);
    let Some(record) = store.get::<T>(key)? else {
        return Ok(());
    };
    let lifecycle = match record.lifecycle {
        RecordLifecycle::PendingDelete => RecordLifecycle::Gone,
        other => other,
    };
    store.set_state::<T>(key, lifecycle, false)?;
    Ok(())
}

fn absorb_remote<T>(conn: &Connection, remote: T) -> Result<Resolution>
where
    T: StoredEntity + SyncedEntity,
{
    let key = remote.key();
    let local = SqliteRecordStore::new(conn).get::<T>(&key)?;

    // A delete the backend already confirmed is not undone by a stale copy
    if let Some(local) = local
        .as_ref()
        .filter(|record| record.lifecycle == RecordLifecycle::Gone)
    {
        if remote.updated_at() <= local.entity.updated_at() {
            return Ok(Resolution::KeepLocal);
        }
    }

    let resolution = resolve(
        local.as_ref().map(|record| record.needs_sync),
        local.as_ref().map_or(0, |record| record.entity.updated_at()),
        remote.updated_at(),
    );

    if let Some(local) = local.as_ref().filter(|record| record.needs_sync) {
        let winner = match resolution {
            Resolution::KeepLocal => ConflictWinner::Local,
            Resolution::TakeRemote => ConflictWinner::Remote,
        };
        SqliteSyncLogRepository::new(conn).record_conflict(&SyncConflict {
            id: 0,
            entity_type: T::ENTITY_TYPE.as_str().to_string(),
            entity_id: key.clone(),
            local_updated_at: local.entity.updated_at(),
            incoming_updated_at: remote.updated_at(),
            resolved_at: now_millis(),
            winner,
            strategy: CONFLICT_STRATEGY.to_string(),
        })?;
        tracing::warn!(
            "Conflict on {} {key}: {} version kept",
            T::ENTITY_TYPE,
            winner.as_str()
        );
    }

    if resolution == Resolution::TakeRemote {
        save_entity(conn, remote, false)?;
    }
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cache() -> CacheManager {
        CacheManager::open_in_memory().unwrap()
    }

    fn owner() -> OwnerId {
        OwnerId::new()
    }

    #[tokio::test]
    async fn save_book_queues_create_then_update() {
        let cache = cache();
        let book = cache
            .save_book(Book::new(owner(), "1984", "George Orwell"), true)
            .await
            .unwrap();
        let mut edited = book.clone();
        edited.title = "Nineteen Eighty-Four".to_string();
        let edited = cache.save_book(edited, true).await.unwrap();

        let changes = cache.pending_changes().await.unwrap();
        let actions: Vec<_> = changes.iter().map(|change| change.action).collect();
        assert_eq!(actions, vec![ChangeAction::Create, ChangeAction::Update]);
        assert!(edited.updated_at > book.updated_at);
        assert!(cache.raw_book(&book.id).await.unwrap().unwrap().needs_sync);
    }

    #[tokio::test]
    async fn save_without_sync_keeps_timestamp_and_queues_nothing() {
        let cache = cache();
        let mut book = Book::new(owner(), "Emma", "Jane Austen");
        book.updated_at = 42;
        let saved = cache.save_book(book.clone(), false).await.unwrap();

        assert_eq!(saved, book);
        assert_eq!(cache.pending_count().await.unwrap(), 0);
        assert!(!cache.raw_book(&book.id).await.unwrap().unwrap().needs_sync);
    }

    #[tokio::test]
    async fn save_rejects_blank_title() {
        let cache = cache();
        let result = cache.save_book(Book::new(owner(), "  ", "Anon"), true).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn fetch_books_is_scoped_and_newest_first() {
        let cache = cache();
        let me = owner();
        let mut first = Book::new(me, "First", "A");
        first.created_at = 1_000;
        let mut second = Book::new(me, "Second", "B");
        second.created_at = 2_000;
        cache.save_book(first, true).await.unwrap();
        cache.save_book(second, true).await.unwrap();
        cache
            .save_book(Book::new(owner(), "Other", "C"), true)
            .await
            .unwrap();

        let titles: Vec<_> = cache
            .fetch_books(me)
            .await
            .unwrap()
            .into_iter()
            .map(|book| book.title)
            .collect();
        assert_eq!(titles, vec!["Second".to_string(), "First".to_string()]);
    }

    #[tokio::test]
    async fn soft_delete_hides_record_until_confirmed() {
        let cache = cache();
        let me = owner();
        let book = cache
            .save_book(Book::new(me, "1984", "George Orwell"), false)
            .await
            .unwrap();

        cache.delete_book(&book.id, false).await.unwrap();

        assert!(cache.fetch_books(me).await.unwrap().is_empty());
        assert_eq!(cache.fetch_book(&book.id).await.unwrap(), None);
        let raw = cache.raw_book(&book.id).await.unwrap().unwrap();
        assert!(raw.marked_for_deletion());
        assert!(raw.needs_sync);

        let change = cache.pending_changes().await.unwrap().remove(0);
        assert_eq!(change.action, ChangeAction::Delete);
        assert!(cache.confirm_change(&change).await.unwrap());
        assert!(!cache.confirm_change(&change).await.unwrap());

        let raw = cache.raw_book(&book.id).await.unwrap().unwrap();
        assert_eq!(raw.lifecycle, RecordLifecycle::Gone);
        assert!(!raw.needs_sync);

        assert_eq!(cache.sweep_tombstones().await.unwrap(), 1);
        assert_eq!(cache.raw_book(&book.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn soft_deleted_word_is_hidden_from_every_read() {
        let cache = cache();
        let book = cache
            .save_book(Book::new(owner(), "Walden", "Henry David Thoreau"), false)
            .await
            .unwrap();
        let kept = cache
            .save_word(VocabWord::new(Some(book.id), "sauntering", "walking idly"), false)
            .await
            .unwrap();
        let word = cache
            .save_word(VocabWord::new(Some(book.id), "hermitage", "a secluded home"), false)
            .await
            .unwrap();

        cache.delete_word(&word.id, false).await.unwrap();

        let ids = |words: Vec<VocabWord>| words.into_iter().map(|w| w.id).collect::<Vec<_>>();
        assert_eq!(ids(cache.fetch_words(Some(book.id)).await.unwrap()), vec![kept.id]);
        assert_eq!(ids(cache.fetch_words(None).await.unwrap()), vec![kept.id]);
        assert_eq!(cache.fetch_word(&word.id).await.unwrap(), None);
        assert!(cache
            .raw_word(&word.id)
            .await
            .unwrap()
            .unwrap()
            .marked_for_deletion());
    }

    #[tokio::test]
    async fn resaving_a_pending_delete_queues_create() {
        let cache = cache();
        let book = cache
            .save_book(Book::new(owner(), "Emma", "Jane Austen"), false)
            .await
            .unwrap();
        cache.delete_book(&book.id, false).await.unwrap();

        let restored = cache.save_book(book.clone(), true).await.unwrap();

        let actions: Vec<_> = cache
            .pending_changes()
            .await
            .unwrap()
            .iter()
            .map(|change| change.action)
            .collect();
        assert_eq!(actions, vec![ChangeAction::Delete, ChangeAction::Create]);
        assert_eq!(cache.fetch_book(&book.id).await.unwrap(), Some(restored));
    }

    #[tokio::test]
    async fn soft_delete_of_missing_record_is_not_found() {
        let cache = cache();
        let result = cache.delete_word(&WordId::new(), false).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn hard_delete_leaves_no_trace() {
        let cache = cache();
        let word = cache
            .save_word(VocabWord::new(None, "ephemeral", "lasting a short time"), true)
            .await
            .unwrap();

        cache.delete_word(&word.id, true).await.unwrap();
        cache.delete_word(&word.id, true).await.unwrap();

        assert_eq!(cache.raw_word(&word.id).await.unwrap(), None);
        assert_eq!(cache.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_mastered_status_bumps_and_queues() {
        let cache = cache();
        let word = cache
            .save_word(VocabWord::new(None, "laconic", "using few words"), false)
            .await
            .unwrap();

        let updated = cache.update_mastered_status(&word.id, true).await.unwrap();

        assert!(updated.mastered);
        assert!(updated.updated_at > word.updated_at);
        let changes = cache.pending_changes().await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action, ChangeAction::Update);
        let payload = changes[0].entity().unwrap().unwrap();
        assert_eq!(payload, Entity::Word(updated));
    }

    #[tokio::test]
    async fn update_mastered_status_of_missing_word_is_not_found() {
        let cache = cache();
        let result = cache.update_mastered_status(&WordId::new(), true).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn round_trip_without_sync_preserves_fields() {
        let cache = cache();
        let book_id = BookId::new();
        let mut word = VocabWord::new(Some(book_id), "ephemeral", "lasting a short time");
        word.synonyms = vec!["fleeting".to_string(), "transient".to_string()];
        word.antonyms = vec!["permanent".to_string()];
        word.example_sentence = "Fame is ephemeral.".to_string();

        cache.save_word(word.clone(), false).await.unwrap();
        let fetched = cache.fetch_words(Some(book_id)).await.unwrap();

        assert_eq!(fetched, vec![word]);
    }

    #[tokio::test]
    async fn fetch_words_scopes_by_book() {
        let cache = cache();
        let book_id = BookId::new();
        cache
            .save_word(VocabWord::new(Some(book_id), "ephemeral", "short"), true)
            .await
            .unwrap();
        cache
            .save_word(VocabWord::new(None, "serendipity", "luck"), true)
            .await
            .unwrap();

        assert_eq!(cache.fetch_words(Some(book_id)).await.unwrap().len(), 1);
        assert_eq!(cache.fetch_words(None).await.unwrap().len(), 2);
        let global = cache.fetch_global_words().await.unwrap();
        assert_eq!(global.len(), 1);
        assert_eq!(global[0].word, "serendipity");
    }

    #[tokio::test]
    async fn confirm_keeps_record_dirty_while_changes_remain() {
        let cache = cache();
        let book = cache
            .save_book(Book::new(owner(), "Dune", "Frank Herbert"), true)
            .await
            .unwrap();
        cache.save_book(book.clone(), true).await.unwrap();

        let changes = cache.pending_changes().await.unwrap();
        cache.confirm_change(&changes[0]).await.unwrap();
        assert!(cache.raw_book(&book.id).await.unwrap().unwrap().needs_sync);

        cache.confirm_change(&changes[1]).await.unwrap();
        assert!(!cache.raw_book(&book.id).await.unwrap().unwrap().needs_sync);
        assert_eq!(cache.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn record_failed_attempt_increments_retry() {
        let cache = cache();
        cache
            .save_book(Book::new(owner(), "Dune", "Frank Herbert"), true)
            .await
            .unwrap();
        let change = cache.pending_changes().await.unwrap().remove(0);

        assert_eq!(cache.record_failed_attempt(&change.id).await.unwrap(), Some(1));
        assert_eq!(cache.record_failed_attempt(&change.id).await.unwrap(), Some(2));
        assert_eq!(cache.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn apply_remote_tie_keeps_local_and_logs_conflict() {
        let cache = cache();
        let local = cache
            .save_book(Book::new(owner(), "Local title", "A"), true)
            .await
            .unwrap();
        let mut remote = local.clone();
        remote.title = "Remote title".to_string();

        let resolution = cache.apply_remote(Entity::Book(remote)).await.unwrap();

        assert_eq!(resolution, Resolution::KeepLocal);
        assert_eq!(cache.fetch_book(&local.id).await.unwrap(), Some(local));
        assert_eq!(cache.pending_count().await.unwrap(), 1);
        let conflicts = cache.list_conflicts(10).await.unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].winner, ConflictWinner::Local);
    }

    #[tokio::test]
    async fn apply_remote_newer_replaces_dirty_local() {
        let cache = cache();
        let local = cache
            .save_book(Book::new(owner(), "Local title", "A"), true)
            .await
            .unwrap();
        let mut remote = local.clone();
        remote.title = "Remote title".to_string();
        remote.updated_at = local.updated_at + 1;

        let resolution = cache.apply_remote(Entity::Book(remote.clone())).await.unwrap();

        assert_eq!(resolution, Resolution::TakeRemote);
        assert_eq!(cache.fetch_book(&local.id).await.unwrap(), Some(remote));
        assert_eq!(cache.pending_count().await.unwrap(), 0);
        assert_eq!(
            cache.list_conflicts(10).await.unwrap()[0].winner,
            ConflictWinner::Remote
        );
    }

    #[tokio::test]
    async fn apply_remote_does_not_resurrect_confirmed_delete() {
        let cache = cache();
        let book = cache
            .save_book(Book::new(owner(), "Gone", "A"), false)
            .await
            .unwrap();
        cache.delete_book(&book.id, false).await.unwrap();
        let change = cache.pending_changes().await.unwrap().remove(0);
        cache.confirm_change(&change).await.unwrap();

        let resolution = cache.apply_remote(Entity::Book(book.clone())).await.unwrap();

        assert_eq!(resolution, Resolution::KeepLocal);
        assert_eq!(cache.fetch_book(&book.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn pending_count_is_published() {
        let cache = cache();
        let mut counts = cache.subscribe_pending_count();
        assert_eq!(*counts.borrow_and_update(), 0);

        cache
            .save_book(Book::new(owner(), "Dune", "Frank Herbert"), true)
            .await
            .unwrap();

        assert!(counts.has_changed().unwrap());
        assert_eq!(*counts.borrow_and_update(), 1);

        cache.clear_all().await.unwrap();
        assert_eq!(*counts.borrow(), 0);
    }

    #[tokio::test]
    async fn last_sync_round_trips() {
        let cache = cache();
        assert_eq!(cache.last_sync_at().await.unwrap(), None);
        cache.set_last_sync_at(1_700_000_000_000).await.unwrap();
        assert_eq!(cache.last_sync_at().await.unwrap(), Some(1_700_000_000_000));
    }
}
