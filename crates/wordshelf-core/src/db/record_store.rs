//! Record storage for the entity collections

#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)] // SQLite counts are i64

use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::query::RecordQuery;
use crate::error::Result;
use crate::models::{Book, LocalRecord, RecordLifecycle, VocabWord};

/// An entity that maps onto one table of the local store
pub trait StoredEntity: Sized {
    /// Table name
    const TABLE: &'static str;
    /// Entity columns in bind/read order; `id` must come first
    const COLUMNS: &'static [&'static str];

    /// Primary key as stored
    fn key(&self) -> String;

    /// Values for [`Self::COLUMNS`], same order
    fn to_values(&self) -> Result<Vec<Value>>;

    /// Read the entity from the first `COLUMNS.len()` columns of `row`
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Trait for collection storage operations
///
/// Each call is a single atomic statement; callers needing more than one
/// statement to land together pass a transaction as the connection.
pub trait RecordStore {
    /// Insert or replace by primary key
    fn upsert<T: StoredEntity>(&self, record: &LocalRecord<T>) -> Result<()>;

    /// Fetch by id, tombstones included
    fn get<T: StoredEntity>(&self, id: &str) -> Result<Option<LocalRecord<T>>>;

    /// Records matching the query, in the query's order
    fn find<T: StoredEntity>(&self, query: &RecordQuery) -> Result<Vec<LocalRecord<T>>>;

    /// Number of records matching the query
    fn count<T: StoredEntity>(&self, query: &RecordQuery) -> Result<usize>;

    /// Physically remove a record; returns whether it existed
    fn delete<T: StoredEntity>(&self, id: &str) -> Result<bool>;

    /// Update sync bookkeeping without touching the entity
    fn set_state<T: StoredEntity>(
        &self,
        id: &str,
        lifecycle: RecordLifecycle,
        needs_sync: bool,
    ) -> Result<bool>;

    /// Physically remove every record whose delete has been confirmed
    fn sweep_gone<T: StoredEntity>(&self) -> Result<usize>;
}

/// `SQLite` implementation of `RecordStore`
pub struct SqliteRecordStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteRecordStore<'a> {
    /// Create a new store with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn select_columns<T: StoredEntity>() -> String {
        format!("{}, needs_sync, lifecycle", T::COLUMNS.join(", "))
    }

    /// Parse a record from a database row
    fn parse_record<T: StoredEntity>(row: &Row<'_>) -> rusqlite::Result<LocalRecord<T>> {
        let base = T::COLUMNS.len();
        let entity = T::from_row(row)?;
        let needs_sync = row.get::<_, i32>(base)? != 0;
        let lifecycle: String = row.get(base + 1)?;
        let lifecycle = lifecycle
            .parse::<RecordLifecycle>()
            .map_err(|error| {
                rusqlite::Error::FromSqlConversionFailure(base + 1, Type::Text, Box::new(error))
            })?;
        Ok(LocalRecord {
            entity,
            needs_sync,
            lifecycle,
        })
    }
}

impl RecordStore for SqliteRecordStore<'_> {
    fn upsert<T: StoredEntity>(&self, record: &LocalRecord<T>) -> Result<()> {
        let columns = Self::select_columns::<T>();
        let placeholders = vec!["?"; T::COLUMNS.len() + 2].join(", ");
        let sql = format!(
            "INSERT OR REPLACE INTO {} ({columns}) VALUES ({placeholders})",
            T::TABLE
        );

        let mut values = record.entity.to_values()?;
        values.push(Value::Integer(i64::from(record.needs_sync)));
        values.push(Value::Text(record.lifecycle.as_str().to_string()));

        self.conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(())
    }

    fn get<T: StoredEntity>(&self, id: &str) -> Result<Option<LocalRecord<T>>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?",
            Self::select_columns::<T>(),
            T::TABLE
        );
        let record = self
            .conn
            .query_row(&sql, params![id], Self::parse_record::<T>)
            .optional()?;
        Ok(record)
    }

    fn find<T: StoredEntity>(&self, query: &RecordQuery) -> Result<Vec<LocalRecord<T>>> {
        let (where_clause, values) = query.where_clause();
        let sql = format!(
            "SELECT {} FROM {}{where_clause} ORDER BY {}",
            Self::select_columns::<T>(),
            T::TABLE,
            query.order_clause()
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(values.iter()), Self::parse_record::<T>)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn count<T: StoredEntity>(&self, query: &RecordQuery) -> Result<usize> {
        let (where_clause, values) = query.where_clause();
        let sql = format!("SELECT COUNT(*) FROM {}{where_clause}", T::TABLE);
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(count as usize)
    }

    fn delete<T: StoredEntity>(&self, id: &str) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", T::TABLE);
        let rows = self.conn.execute(&sql, params![id])?;
        Ok(rows > 0)
    }

    fn set_state<T: StoredEntity>(
        &self,
        id: &str,
        lifecycle: RecordLifecycle,
        needs_sync: bool,
    ) -> Result<bool> {
        let sql = format!(
            "UPDATE {} SET lifecycle = ?, needs_sync = ? WHERE id = ?",
            T::TABLE
        );
        let rows = self.conn.execute(
            &sql,
            params![lifecycle.as_str(), i32::from(needs_sync), id],
        )?;
        Ok(rows > 0)
    }

    fn sweep_gone<T: StoredEntity>(&self) -> Result<usize> {
        let sql = format!("DELETE FROM {} WHERE lifecycle = ?", T::TABLE);
        let rows = self
            .conn
            .execute(&sql, params![RecordLifecycle::Gone.as_str()])?;
        Ok(rows)
    }
}

fn optional_text(value: Option<String>) -> Value {
    value.map_or(Value::Null, Value::Text)
}

fn json_list(row: &Row<'_>, index: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(index)?;
    serde_json::from_str(&raw)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}

fn parse_uuid_column<T: std::str::FromStr<Err = uuid::Error>>(
    row: &Row<'_>,
    index: usize,
) -> rusqlite::Result<T> {
    let raw: String = row.get(index)?;
    raw.parse()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}

impl StoredEntity for Book {
    const TABLE: &'static str = "books";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "owner_id",
        "title",
        "author",
        "cover_image_url",
        "created_at",
        "updated_at",
    ];

    fn key(&self) -> String {
        self.id.as_str()
    }

    fn to_values(&self) -> Result<Vec<Value>> {
        Ok(vec![
            Value::Text(self.id.as_str()),
            Value::Text(self.owner_id.as_str()),
            Value::Text(self.title.clone()),
            Value::Text(self.author.clone()),
            optional_text(self.cover_image_url.clone()),
            Value::Integer(self.created_at),
            Value::Integer(self.updated_at),
        ])
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_uuid_column(row, 0)?,
            owner_id: parse_uuid_column(row, 1)?,
            title: row.get(2)?,
            author: row.get(3)?,
            cover_image_url: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

impl StoredEntity for VocabWord {
    const TABLE: &'static str = "vocab_words";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "book_id",
        "word",
        "definition",
        "synonyms",
        "antonyms",
        "example_sentence",
        "mastered",
        "created_at",
        "updated_at",
    ];

    fn key(&self) -> String {
        self.id.as_str()
    }

    fn to_values(&self) -> Result<Vec<Value>> {
        Ok(vec![
            Value::Text(self.id.as_str()),
            optional_text(self.book_id.map(|id| id.as_str())),
            Value::Text(self.word.clone()),
            Value::Text(self.definition.clone()),
            Value::Text(serde_json::to_string(&self.synonyms)?),
            Value::Text(serde_json::to_string(&self.antonyms)?),
            Value::Text(self.example_sentence.clone()),
            Value::Integer(i64::from(self.mastered)),
            Value::Integer(self.created_at),
            Value::Integer(self.updated_at),
        ])
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let book_id = row
            .get::<_, Option<String>>(1)?
            .map(|raw| {
                raw.parse().map_err(|error: uuid::Error| {
                    rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(error))
                })
            })
            .transpose()?;

        Ok(Self {
            id: parse_uuid_column(row, 0)?,
            book_id,
            word: row.get(2)?,
            definition: row.get(3)?,
            synonyms: json_list(row, 4)?,
            antonyms: json_list(row, 5)?,
            example_sentence: row.get(6)?,
            mastered: row.get::<_, i32>(7)? != 0,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, SortOrder};
    use crate::models::{BookId, OwnerId};
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn book_at(owner: OwnerId, title: &str, created_at: i64) -> Book {
        let mut book = Book::new(owner, title, "Anon");
        book.created_at = created_at;
        book.updated_at = created_at;
        book
    }

    #[test]
    fn test_upsert_and_get() {
        let db = setup();
        let store = SqliteRecordStore::new(db.connection());

        let book = Book::new(OwnerId::new(), "1984", "George Orwell").with_cover("https://c/1.png");
        store.upsert(&LocalRecord::active(book.clone(), true)).unwrap();

        let fetched = store.get::<Book>(&book.id.as_str()).unwrap().unwrap();
        assert_eq!(fetched, LocalRecord::active(book, true));
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let db = setup();
        let store = SqliteRecordStore::new(db.connection());

        let mut book = Book::new(OwnerId::new(), "Draft", "A");
        store.upsert(&LocalRecord::active(book.clone(), true)).unwrap();
        book.title = "Final".to_string();
        store.upsert(&LocalRecord::active(book.clone(), false)).unwrap();

        assert_eq!(store.count::<Book>(&RecordQuery::raw()).unwrap(), 1);
        let fetched = store.get::<Book>(&book.id.as_str()).unwrap().unwrap();
        assert_eq!(fetched.entity.title, "Final");
        assert!(!fetched.needs_sync);
    }

    #[test]
    fn test_find_sorted_and_filtered() {
        let db = setup();
        let store = SqliteRecordStore::new(db.connection());
        let owner = OwnerId::new();

        for (title, created_at) in [("old", 1), ("new", 3), ("mid", 2)] {
            store
                .upsert(&LocalRecord::active(book_at(owner, title, created_at), false))
                .unwrap();
        }
        store
            .upsert(&LocalRecord::active(book_at(OwnerId::new(), "other", 4), false))
            .unwrap();

        let newest_first = store
            .find::<Book>(&RecordQuery::visible().owned_by(owner))
            .unwrap();
        let titles: Vec<_> = newest_first.iter().map(|r| r.entity.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);

        let oldest_first = store
            .find::<Book>(
                &RecordQuery::visible()
                    .owned_by(owner)
                    .order_by(SortOrder::CreatedAsc),
            )
            .unwrap();
        assert_eq!(oldest_first[0].entity.title, "old");
    }

    #[test]
    fn test_tombstones_hidden_from_visible_queries_only() {
        let db = setup();
        let store = SqliteRecordStore::new(db.connection());

        let book = Book::new(OwnerId::new(), "Gone Girl", "Gillian Flynn");
        let id = book.id.as_str();
        store.upsert(&LocalRecord::active(book, false)).unwrap();
        store
            .set_state::<Book>(&id, RecordLifecycle::PendingDelete, true)
            .unwrap();

        assert_eq!(store.count::<Book>(&RecordQuery::visible()).unwrap(), 0);
        let raw = store.find::<Book>(&RecordQuery::raw()).unwrap();
        assert_eq!(raw.len(), 1);
        assert!(raw[0].marked_for_deletion());
    }

    #[test]
    fn test_word_roundtrip_with_lists() {
        let db = setup();
        let store = SqliteRecordStore::new(db.connection());

        let mut word = VocabWord::new(Some(BookId::new()), "ephemeral", "short-lived");
        word.synonyms = vec!["fleeting".into(), "transient".into()];
        word.antonyms = vec!["permanent".into()];
        word.example_sentence = "Fame is ephemeral.".into();
        word.mastered = true;
        store.upsert(&LocalRecord::active(word.clone(), false)).unwrap();

        let fetched = store.get::<VocabWord>(&word.id.as_str()).unwrap().unwrap();
        assert_eq!(fetched.entity, word);
    }

    #[test]
    fn test_global_and_book_scoped_words() {
        let db = setup();
        let store = SqliteRecordStore::new(db.connection());
        let book = BookId::new();

        store
            .upsert(&LocalRecord::active(VocabWord::new(Some(book), "a", "x"), false))
            .unwrap();
        store
            .upsert(&LocalRecord::active(VocabWord::new(None, "b", "y"), false))
            .unwrap();

        let scoped = store
            .find::<VocabWord>(&RecordQuery::visible().in_book(Some(book)))
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].entity.word, "a");

        let global = store
            .find::<VocabWord>(&RecordQuery::visible().in_book(None))
            .unwrap();
        assert_eq!(global.len(), 1);
        assert_eq!(global[0].entity.word, "b");
    }

    #[test]
    fn test_delete_and_sweep() {
        let db = setup();
        let store = SqliteRecordStore::new(db.connection());

        let kept = Book::new(OwnerId::new(), "Kept", "A");
        let swept = Book::new(OwnerId::new(), "Swept", "B");
        store.upsert(&LocalRecord::active(kept.clone(), false)).unwrap();
        store.upsert(&LocalRecord::active(swept.clone(), false)).unwrap();
        store
            .set_state::<Book>(&swept.id.as_str(), RecordLifecycle::Gone, false)
            .unwrap();

        assert_eq!(store.sweep_gone::<Book>().unwrap(), 1);
        assert!(store.get::<Book>(&swept.id.as_str()).unwrap().is_none());

        assert!(store.delete::<Book>(&kept.id.as_str()).unwrap());
        assert!(!store.delete::<Book>(&kept.id.as_str()).unwrap());
    }
}
