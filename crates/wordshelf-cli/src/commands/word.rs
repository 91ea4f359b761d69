use std::path::Path;

use wordshelf_core::util::normalize_text_option;
use wordshelf_core::VocabWord;

use crate::cli::WordCommands;
use crate::commands::common::{
    configured_owner_id, format_word_lines, normalize_list, normalize_required, open_cache,
    resolve_book, resolve_word, word_to_list_item, WordListItem,
};
use crate::error::CliError;

/// Input for `word add`, as parsed from the command line.
pub struct NewWord {
    pub word: String,
    pub definition: String,
    pub book: Option<String>,
    pub synonyms: Vec<String>,
    pub antonyms: Vec<String>,
    pub example: Option<String>,
}

pub async fn run_word(
    command: WordCommands,
    db_path: &Path,
    config_path: &Path,
) -> Result<(), CliError> {
    match command {
        WordCommands::Add {
            word,
            definition,
            book,
            synonyms,
            antonyms,
            example,
        } => {
            let input = NewWord {
                word,
                definition,
                book,
                synonyms,
                antonyms,
                example,
            };
            run_word_add(input, db_path, config_path).await
        }
        WordCommands::List { book, global, json } => {
            run_word_list(book.as_deref(), global, json, db_path, config_path).await
        }
        WordCommands::Master { id, unset } => run_word_master(&id, !unset, db_path).await,
        WordCommands::Delete { id } => run_word_delete(&id, db_path).await,
    }
}

async fn run_word_add(input: NewWord, db_path: &Path, config_path: &Path) -> Result<(), CliError> {
    let cache = open_cache(db_path)?;
    let book_id = match input.book.as_deref() {
        Some(query) => {
            let owner_id = configured_owner_id(config_path)?;
            Some(resolve_book(&cache, owner_id, query).await?.id)
        }
        None => None,
    };

    let word = build_word(input, book_id)?;
    let word = cache.save_word(word, true).await?;
    println!("{}", word.id);
    Ok(())
}

pub fn build_word(
    input: NewWord,
    book_id: Option<wordshelf_core::BookId>,
) -> Result<VocabWord, CliError> {
    let term = normalize_required(&input.word, "Word")?;
    let definition = normalize_required(&input.definition, "Definition")?;

    let mut word = VocabWord::new(book_id, term, definition);
    word.synonyms = normalize_list(&input.synonyms);
    word.antonyms = normalize_list(&input.antonyms);
    word.example_sentence = normalize_text_option(input.example).unwrap_or_default();
    Ok(word)
}

async fn run_word_list(
    book: Option<&str>,
    global: bool,
    as_json: bool,
    db_path: &Path,
    config_path: &Path,
) -> Result<(), CliError> {
    let cache = open_cache(db_path)?;
    let words = if global {
        cache.fetch_global_words().await?
    } else if let Some(query) = book {
        let owner_id = configured_owner_id(config_path)?;
        let book = resolve_book(&cache, owner_id, query).await?;
        cache.fetch_words(Some(book.id)).await?
    } else {
        cache.fetch_words(None).await?
    };

    if as_json {
        let json_items = words
            .iter()
            .map(word_to_list_item)
            .collect::<Vec<WordListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_word_lines(&words) {
            println!("{line}");
        }
    }

    Ok(())
}

async fn run_word_master(id: &str, mastered: bool, db_path: &Path) -> Result<(), CliError> {
    let cache = open_cache(db_path)?;
    let word = resolve_word(&cache, id).await?;
    let word = cache.update_mastered_status(&word.id, mastered).await?;

    let state = if word.mastered { "mastered" } else { "learning" };
    println!("{} {state}", word.id);
    Ok(())
}

async fn run_word_delete(id: &str, db_path: &Path) -> Result<(), CliError> {
    let cache = open_cache(db_path)?;
    let word = resolve_word(&cache, id).await?;

    cache.delete_word(&word.id, false).await?;
    println!("{}", word.id);
    Ok(())
}
