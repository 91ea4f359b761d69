use std::path::Path;

use wordshelf_core::util::{is_http_url, normalize_text_option};
use wordshelf_core::Book;

use crate::cli::BookCommands;
use crate::commands::common::{
    book_to_list_item, configured_owner_id, ensure_owner_id, format_book_lines,
    normalize_required, open_cache, resolve_book, BookListItem,
};
use crate::error::CliError;

pub async fn run_book(
    command: BookCommands,
    db_path: &Path,
    config_path: &Path,
) -> Result<(), CliError> {
    match command {
        BookCommands::Add {
            title,
            author,
            cover,
        } => run_book_add(&title.join(" "), &author, cover, db_path, config_path).await,
        BookCommands::List { json } => run_book_list(json, db_path, config_path).await,
        BookCommands::Delete { id } => run_book_delete(&id, db_path, config_path).await,
    }
}

async fn run_book_add(
    title: &str,
    author: &str,
    cover: Option<String>,
    db_path: &Path,
    config_path: &Path,
) -> Result<(), CliError> {
    let title = normalize_required(title, "Book title")?;
    let author = normalize_required(author, "Author")?;
    let cover = normalize_cover_url(cover)?;

    let owner_id = ensure_owner_id(config_path)?;
    let cache = open_cache(db_path)?;
    let mut book = Book::new(owner_id, title, author);
    if let Some(url) = cover {
        book = book.with_cover(url);
    }
    let book = cache.save_book(book, true).await?;

    println!("{}", book.id);
    Ok(())
}

async fn run_book_list(as_json: bool, db_path: &Path, config_path: &Path) -> Result<(), CliError> {
    let books = match configured_owner_id(config_path)? {
        Some(owner_id) => open_cache(db_path)?.fetch_books(owner_id).await?,
        None => Vec::new(),
    };

    if as_json {
        let json_items = books
            .iter()
            .map(book_to_list_item)
            .collect::<Vec<BookListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_book_lines(&books) {
            println!("{line}");
        }
    }

    Ok(())
}

async fn run_book_delete(id: &str, db_path: &Path, config_path: &Path) -> Result<(), CliError> {
    let owner_id = configured_owner_id(config_path)?;
    let cache = open_cache(db_path)?;
    let book = resolve_book(&cache, owner_id, id).await?;

    cache.delete_book(&book.id, false).await?;
    println!("{}", book.id);
    Ok(())
}

pub fn normalize_cover_url(cover: Option<String>) -> Result<Option<String>, CliError> {
    match normalize_text_option(cover) {
        Some(url) if !is_http_url(&url) => Err(CliError::Config(
            "cover URL must start with http:// or https://".to_string(),
        )),
        other => Ok(other),
    }
}
