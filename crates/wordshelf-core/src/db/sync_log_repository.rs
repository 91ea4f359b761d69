//! Sync bookkeeping: last successful sync and the conflict log

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::{ConflictWinner, SyncConflict};

const LAST_SYNC_KEY: &str = "last_sync_at";

/// Trait for sync bookkeeping storage
pub trait SyncLogRepository {
    /// Timestamp (Unix ms) of the last sync whose remote fetch succeeded
    fn last_sync_at(&self) -> Result<Option<i64>>;

    fn set_last_sync_at(&self, timestamp_ms: i64) -> Result<()>;

    /// Append a resolved conflict to the log
    fn record_conflict(&self, conflict: &SyncConflict) -> Result<()>;

    /// Most recent conflicts first
    fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>>;
}

/// `SQLite` implementation of `SyncLogRepository`
pub struct SqliteSyncLogRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSyncLogRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM sync_meta WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl SyncLogRepository for SqliteSyncLogRepository<'_> {
    fn last_sync_at(&self) -> Result<Option<i64>> {
        Ok(self
            .get_meta(LAST_SYNC_KEY)?
            .and_then(|value| value.parse().ok()))
    }

    fn set_last_sync_at(&self, timestamp_ms: i64) -> Result<()> {
        self.set_meta(LAST_SYNC_KEY, &timestamp_ms.to_string())
    }

    fn record_conflict(&self, conflict: &SyncConflict) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_conflicts
                (entity_type, entity_id, local_updated_at, incoming_updated_at,
                 resolved_at, winner, strategy)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                conflict.entity_type,
                conflict.entity_id,
                conflict.local_updated_at,
                conflict.incoming_updated_at,
                conflict.resolved_at,
                conflict.winner.as_str(),
                conflict.strategy
            ],
        )?;
        Ok(())
    }

    fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, entity_type, entity_id, local_updated_at, incoming_updated_at,
                    resolved_at, winner, strategy
             FROM sync_conflicts
             ORDER BY resolved_at DESC, id DESC
             LIMIT ?",
        )?;

        let conflicts = stmt
            .query_map(params![limit as i64], |row| {
                let winner: String = row.get(6)?;
                Ok(SyncConflict {
                    id: row.get(0)?,
                    entity_type: row.get(1)?,
                    entity_id: row.get(2)?,
                    local_updated_at: row.get(3)?,
                    incoming_updated_at: row.get(4)?,
                    resolved_at: row.get(5)?,
                    winner: winner.parse::<ConflictWinner>().map_err(|error| {
                        rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(error))
                    })?,
                    strategy: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(conflicts)
    }
}
