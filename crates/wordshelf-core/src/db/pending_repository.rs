//! Pending-change queue

#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss, clippy::cast_possible_truncation)]

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{ChangeId, PendingChange};

const SELECT_COLUMNS: &str =
    "id, entity_type, entity_id, action, payload, created_at, retry_count";

/// Trait for pending-change queue operations
pub trait PendingChangeRepository {
    /// Append a change to the end of the queue
    fn enqueue(&self, change: &PendingChange) -> Result<()>;

    /// All queued changes in replay order (oldest first)
    fn list(&self) -> Result<Vec<PendingChange>>;

    /// Fetch one queued change
    fn get(&self, id: &ChangeId) -> Result<Option<PendingChange>>;

    /// Remove a confirmed change; returns whether it was still queued
    fn remove(&self, id: &ChangeId) -> Result<bool>;

    /// Bump the retry counter of a failed change, returning the new count
    fn increment_retry(&self, id: &ChangeId) -> Result<Option<u32>>;

    /// Number of queued changes
    fn count(&self) -> Result<usize>;

    /// Number of queued changes for one entity
    fn count_for_entity(&self, entity_id: Uuid) -> Result<usize>;

    /// Drop every queued change for one entity
    fn remove_for_entity(&self, entity_id: Uuid) -> Result<usize>;
}

/// `SQLite` implementation of `PendingChangeRepository`
pub struct SqlitePendingChangeRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqlitePendingChangeRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a pending change from a database row
    fn parse_change(row: &Row<'_>) -> rusqlite::Result<PendingChange> {
        let conversion = |index: usize| {
            move |error: crate::Error| {
                rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
            }
        };
        let uuid_conversion = |index: usize| {
            move |error: uuid::Error| {
                rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
            }
        };

        let id: String = row.get(0)?;
        let entity_type: String = row.get(1)?;
        let entity_id: String = row.get(2)?;
        let action: String = row.get(3)?;

        Ok(PendingChange {
            id: id.parse().map_err(uuid_conversion(0))?,
            entity_type: entity_type.parse().map_err(conversion(1))?,
            entity_id: entity_id.parse().map_err(uuid_conversion(2))?,
            action: action.parse().map_err(conversion(3))?,
            payload: row.get(4)?,
            created_at: row.get(5)?,
            retry_count: row.get::<_, i64>(6)? as u32,
        })
    }
}

impl PendingChangeRepository for SqlitePendingChangeRepository<'_> {
    fn enqueue(&self, change: &PendingChange) -> Result<()> {
        self.conn.execute(
            "INSERT INTO pending_changes
                (id, entity_type, entity_id, action, payload, created_at, retry_count)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                change.id.as_str(),
                change.entity_type.as_str(),
                change.entity_id.to_string(),
                change.action.as_str(),
                change.payload,
                change.created_at,
                i64::from(change.retry_count)
            ],
        )?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<PendingChange>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM pending_changes ORDER BY created_at ASC, seq ASC"
        ))?;
        let changes = stmt
            .query_map([], Self::parse_change)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(changes)
    }

    fn get(&self, id: &ChangeId) -> Result<Option<PendingChange>> {
        let change = self
            .conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM pending_changes WHERE id = ?"),
                params![id.as_str()],
                Self::parse_change,
            )
            .optional()?;
        Ok(change)
    }

    fn remove(&self, id: &ChangeId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM pending_changes WHERE id = ?", params![id.as_str()])?;
        Ok(rows > 0)
    }

    fn increment_retry(&self, id: &ChangeId) -> Result<Option<u32>> {
        let count = self
            .conn
            .query_row(
                "UPDATE pending_changes SET retry_count = retry_count + 1
                 WHERE id = ? RETURNING retry_count",
                params![id.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(count.map(|count| count as u32))
    }

    fn count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM pending_changes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn count_for_entity(&self, entity_id: Uuid) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pending_changes WHERE entity_id = ?",
            params![entity_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn remove_for_entity(&self, entity_id: Uuid) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM pending_changes WHERE entity_id = ?",
            params![entity_id.to_string()],
        )?;
        Ok(rows)
    }
}
