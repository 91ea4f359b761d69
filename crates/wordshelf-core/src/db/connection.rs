//! Database connection management

use crate::error::Result;
use rusqlite::{Connection, Transaction};
use std::path::Path;

use super::migrations;

/// Database wrapper for a `SQLite` connection
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let mut database = Self { conn };
        database.configure(true)?;
        database.migrate()?;
        Ok(database)
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut database = Self { conn };
        database.configure(false)?;
        database.migrate()?;
        Ok(database)
    }

    /// Configure `SQLite` for durability and concurrent readers
    fn configure(&self, on_disk: bool) -> Result<()> {
        if on_disk {
            // WAL lets reads proceed while a sync pass is writing
            self.conn
                .query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))?;
            self.conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        }
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(())
    }

    /// Run database migrations
    fn migrate(&mut self) -> Result<()> {
        migrations::run(&mut self.conn)
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction; dropped without commit it rolls back
    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    /// Wipe both collections, the pending queue and sync bookkeeping
    ///
    /// Only for an explicit cache reset, never during sync.
    pub fn clear_all(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM books;
             DELETE FROM vocab_words;
             DELETE FROM pending_changes;
             DELETE FROM sync_meta;
             DELETE FROM sync_conflicts;",
        )?;
        tx.commit()?;
        tracing::info!("Cleared local cache");
        Ok(())
    }
}
