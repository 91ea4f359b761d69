use std::env;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use wordshelf_core::config::SyncSettings;
use wordshelf_core::models::{OwnerId, SyncConflict};
use wordshelf_core::{Book, BookId, CacheManager, PendingChange, VocabWord, WordId};

use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "config.json";
const SHORT_ID_LEN: usize = 13;

#[derive(Debug, Serialize)]
pub struct BookListItem {
    pub id: String,
    pub title: String,
    pub author: String,
    pub cover_image_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub relative_time: String,
}

#[derive(Debug, Serialize)]
pub struct WordListItem {
    pub id: String,
    pub book_id: Option<String>,
    pub word: String,
    pub definition: String,
    pub synonyms: Vec<String>,
    pub antonyms: Vec<String>,
    pub example_sentence: String,
    pub mastered: bool,
    pub updated_at: i64,
    pub relative_time: String,
}

#[derive(Debug, Serialize)]
pub struct SyncConflictItem {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: String,
    pub local_updated_at: i64,
    pub incoming_updated_at: i64,
    pub resolved_at: i64,
    pub resolved_at_iso: String,
    pub winner: String,
    pub strategy: String,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os("WORDSHELF_DB_PATH").map(PathBuf::from))
    {
        return Ok(path);
    }
    dirs::data_local_dir()
        .map(|dir| dir.join("wordshelf").join("wordshelf.db"))
        .ok_or_else(|| CliError::Config("could not resolve a data directory".to_string()))
}

pub fn resolve_config_path(cli_config_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_config_path {
        return Ok(path);
    }
    dirs::config_dir()
        .map(|dir| dir.join("wordshelf").join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("could not resolve a config directory".to_string()))
}

/// Stored settings with environment overrides applied, not yet validated.
pub fn load_settings(config_path: &Path) -> Result<SyncSettings, CliError> {
    let mut settings = SyncSettings::load_from_path(config_path)?;
    settings.apply_env_overrides()?;
    Ok(settings)
}

/// The configured owner, if any; never writes the config file.
pub fn configured_owner_id(config_path: &Path) -> Result<Option<OwnerId>, CliError> {
    Ok(load_settings(config_path)?.owner_id)
}

/// The configured owner, created and stored on first use.
pub fn ensure_owner_id(config_path: &Path) -> Result<OwnerId, CliError> {
    let settings = load_settings(config_path)?;
    if let Some(owner_id) = settings.owner_id {
        return Ok(owner_id);
    }

    let mut stored = SyncSettings::load_from_path(config_path)?;
    let owner_id = OwnerId::new();
    stored.owner_id = Some(owner_id);
    stored.save_to_path(config_path)?;
    tracing::info!("Created owner id {owner_id}");
    Ok(owner_id)
}

pub fn open_cache(db_path: &Path) -> Result<CacheManager, CliError> {
    Ok(CacheManager::open_path(db_path)?)
}

pub fn normalize_required(value: &str, label: &'static str) -> Result<String, CliError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyValue(label))
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

/// Pick the single id in `candidates` equal to or starting with `query`.
pub fn match_id_prefix<'a>(
    query: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Result<Option<&'a str>, CliError> {
    let query = query.to_ascii_lowercase();
    let matches = candidates
        .into_iter()
        .filter(|id| id.starts_with(&query))
        .collect::<Vec<_>>();

    if let Some(exact) = matches.iter().find(|id| **id == query) {
        return Ok(Some(*exact));
    }
    match matches.as_slice() {
        [] => Ok(None),
        [single] => Ok(Some(*single)),
        several => {
            let options = several
                .iter()
                .take(3)
                .map(|id| short_id(id))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub async fn resolve_book(
    cache: &CacheManager,
    owner_id: Option<OwnerId>,
    query: &str,
) -> Result<Book, CliError> {
    let query = normalize_required(query, "Book ID")?;
    if let Ok(id) = query.parse::<BookId>() {
        if let Some(book) = cache.fetch_book(&id).await? {
            return Ok(book);
        }
    }

    let books = match owner_id {
        Some(owner_id) => cache.fetch_books(owner_id).await?,
        None => Vec::new(),
    };
    let ids = books.iter().map(|book| book.id.as_str()).collect::<Vec<_>>();
    let matched = match_id_prefix(&query, ids.iter().map(String::as_str))?
        .ok_or_else(|| CliError::BookNotFound(query.clone()))?;
    books
        .into_iter()
        .find(|book| book.id.as_str() == matched)
        .ok_or(CliError::BookNotFound(query))
}

pub async fn resolve_word(cache: &CacheManager, query: &str) -> Result<VocabWord, CliError> {
    let query = normalize_required(query, "Word ID")?;
    if let Ok(id) = query.parse::<WordId>() {
        if let Some(word) = cache.fetch_word(&id).await? {
            return Ok(word);
        }
    }

    let words = cache.fetch_words(None).await?;
    let ids = words.iter().map(|word| word.id.as_str()).collect::<Vec<_>>();
    let matched = match_id_prefix(&query, ids.iter().map(String::as_str))?
        .ok_or_else(|| CliError::WordNotFound(query.clone()))?;
    words
        .into_iter()
        .find(|word| word.id.as_str() == matched)
        .ok_or(CliError::WordNotFound(query))
}

pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let mut truncated = collapsed
            .chars()
            .take(max_chars.saturating_sub(3))
            .collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_book_lines(books: &[Book]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    books
        .iter()
        .map(|book| {
            let id = short_id(&book.id.as_str());
            let title = truncate(&book.title, 32);
            let author = truncate(&book.author, 24);
            let relative_time = format_relative_time(book.updated_at, now_ms);
            format!("{id:<13}  {title:<32}  {author:<24}  {relative_time}")
        })
        .collect()
}

pub fn book_to_list_item(book: &Book) -> BookListItem {
    BookListItem {
        id: book.id.to_string(),
        title: book.title.clone(),
        author: book.author.clone(),
        cover_image_url: book.cover_image_url.clone(),
        created_at: book.created_at,
        updated_at: book.updated_at,
        relative_time: format_relative_time(book.updated_at, Utc::now().timestamp_millis()),
    }
}

pub fn format_word_lines(words: &[VocabWord]) -> Vec<String> {
    words
        .iter()
        .map(|word| {
            let id = short_id(&word.id.as_str());
            let mark = if word.mastered { "*" } else { " " };
            let term = truncate(&word.word, 20);
            let definition = truncate(&word.definition, 48);
            format!("{id:<13}  {mark} {term:<20}  {definition}")
        })
        .collect()
}

pub fn word_to_list_item(word: &VocabWord) -> WordListItem {
    WordListItem {
        id: word.id.to_string(),
        book_id: word.book_id.map(|id| id.to_string()),
        word: word.word.clone(),
        definition: word.definition.clone(),
        synonyms: word.synonyms.clone(),
        antonyms: word.antonyms.clone(),
        example_sentence: word.example_sentence.clone(),
        mastered: word.mastered,
        updated_at: word.updated_at,
        relative_time: format_relative_time(word.updated_at, Utc::now().timestamp_millis()),
    }
}

pub fn format_pending_lines(changes: &[PendingChange]) -> Vec<String> {
    changes
        .iter()
        .map(|change| {
            let entity_id = change.entity_id.to_string();
            let mut line = format!(
                "{}  {:<6}  {:<9}  {}",
                format_sync_timestamp(change.created_at),
                change.action.as_str(),
                change.entity_type.as_str(),
                short_id(&entity_id)
            );
            if change.retry_count > 0 {
                line.push_str(&format!("  retries={}", change.retry_count));
            }
            line
        })
        .collect()
}

pub fn sync_conflict_to_item(conflict: &SyncConflict) -> SyncConflictItem {
    SyncConflictItem {
        id: conflict.id,
        entity_type: conflict.entity_type.clone(),
        entity_id: conflict.entity_id.clone(),
        local_updated_at: conflict.local_updated_at,
        incoming_updated_at: conflict.incoming_updated_at,
        resolved_at: conflict.resolved_at,
        resolved_at_iso: format_sync_timestamp(conflict.resolved_at),
        winner: conflict.winner.as_str().to_string(),
        strategy: conflict.strategy.clone(),
    }
}

pub fn format_sync_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {:<9}  {}  kept={}  local={} incoming={}",
                format_sync_timestamp(conflict.resolved_at),
                conflict.entity_type,
                short_id(&conflict.entity_id),
                conflict.winner.as_str(),
                conflict.local_updated_at,
                conflict.incoming_updated_at
            )
        })
        .collect()
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
