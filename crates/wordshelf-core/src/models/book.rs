//! Book model

use serde::{Deserialize, Serialize};

use super::{BookId, OwnerId};
use crate::util::now_millis;

/// A book the user is reading and collecting words from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Unique identifier
    pub id: BookId,
    /// User owning the book
    pub owner_id: OwnerId,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms), the only input to conflict resolution
    pub updated_at: i64,
}

impl Book {
    /// Create a new book owned by `owner_id`
    #[must_use]
    pub fn new(owner_id: OwnerId, title: impl Into<String>, author: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: BookId::new(),
            owner_id,
            title: title.into(),
            author: author.into(),
            cover_image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach a cover image URL
    #[must_use]
    pub fn with_cover(mut self, url: impl Into<String>) -> Self {
        self.cover_image_url = Some(url.into());
        self
    }
}
