//! Vocabulary word model

use serde::{Deserialize, Serialize};

use super::{BookId, WordId};
use crate::util::now_millis;

/// A word collected by the user, optionally tied to a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabWord {
    /// Unique identifier
    pub id: WordId,
    /// Book the word was found in; `None` for a global word
    #[serde(default)]
    pub book_id: Option<BookId>,
    pub word: String,
    pub definition: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub antonyms: Vec<String>,
    #[serde(default)]
    pub example_sentence: String,
    #[serde(default)]
    pub mastered: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl VocabWord {
    /// Create a new, not yet mastered word
    #[must_use]
    pub fn new(
        book_id: Option<BookId>,
        word: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        let now = now_millis();
        Self {
            id: WordId::new(),
            book_id,
            word: word.into(),
            definition: definition.into(),
            synonyms: Vec::new(),
            antonyms: Vec::new(),
            example_sentence: String::new(),
            mastered: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this word is not tied to any book
    #[must_use]
    pub const fn is_global(&self) -> bool {
        self.book_id.is_none()
    }
}
