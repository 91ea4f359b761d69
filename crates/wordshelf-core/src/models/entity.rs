//! Entity kinds exchanged with the backend

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{Book, VocabWord};
use crate::error::Error;

/// The two synced collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Book,
    VocabWord,
}

impl EntityType {
    /// Stable name used in the pending-change table and on the wire
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::VocabWord => "vocabWord",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "book" => Ok(Self::Book),
            "vocabWord" => Ok(Self::VocabWord),
            other => Err(Error::InvalidInput(format!("unknown entity type: {other}"))),
        }
    }
}

/// A full record of either collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entity {
    Book(Book),
    Word(VocabWord),
}

impl Entity {
    pub const fn entity_type(&self) -> EntityType {
        match self {
            Self::Book(_) => EntityType::Book,
            Self::Word(_) => EntityType::VocabWord,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Book(book) => book.id.as_uuid(),
            Self::Word(word) => word.id.as_uuid(),
        }
    }

    pub const fn updated_at(&self) -> i64 {
        match self {
            Self::Book(book) => book.updated_at,
            Self::Word(word) => word.updated_at,
        }
    }

    /// Serialize the bare record (no enum wrapper) for a pending-change payload
    pub fn to_payload(&self) -> serde_json::Result<String> {
        match self {
            Self::Book(book) => serde_json::to_string(book),
            Self::Word(word) => serde_json::to_string(word),
        }
    }

    /// Parse a pending-change payload of the given type
    pub fn from_payload(entity_type: EntityType, payload: &str) -> serde_json::Result<Self> {
        match entity_type {
            EntityType::Book => serde_json::from_str(payload).map(Self::Book),
            EntityType::VocabWord => serde_json::from_str(payload).map(Self::Word),
        }
    }
}

/// Common access to the sync-relevant fields of either collection
pub trait SyncedEntity: Clone + Into<Entity> {
    const ENTITY_TYPE: EntityType;

    fn uuid(&self) -> Uuid;

    fn updated_at(&self) -> i64;

    fn set_updated_at(&mut self, timestamp_ms: i64);
}

impl SyncedEntity for Book {
    const ENTITY_TYPE: EntityType = EntityType::Book;

    fn uuid(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn set_updated_at(&mut self, timestamp_ms: i64) {
        self.updated_at = timestamp_ms;
    }
}

impl SyncedEntity for VocabWord {
    const ENTITY_TYPE: EntityType = EntityType::VocabWord;

    fn uuid(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn set_updated_at(&mut self, timestamp_ms: i64) {
        self.updated_at = timestamp_ms;
    }
}

impl From<Book> for Entity {
    fn from(book: Book) -> Self {
        Self::Book(book)
    }
}

impl From<VocabWord> for Entity {
    fn from(word: VocabWord) -> Self {
        Self::Word(word)
    }
}
