use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "wordshelf")]
#[command(about = "Collect the words you meet while reading, offline first")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the settings file
    #[arg(long, global = true, value_name = "PATH")]
    pub config_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage books
    Book {
        #[command(subcommand)]
        command: BookCommands,
    },
    /// Manage vocabulary words
    Word {
        #[command(subcommand)]
        command: WordCommands,
    },
    /// Show pending changes and the last sync
    Status {
        /// List every queued change
        #[arg(short, long)]
        verbose: bool,
    },
    /// Push queued changes and pull remote ones
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Show or change sync settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Wipe the local cache, including unsynced changes
    Reset {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum BookCommands {
    /// Add a book
    #[command(alias = "new")]
    Add {
        /// Book title
        title: Vec<String>,
        /// Book author
        #[arg(short, long)]
        author: String,
        /// Cover image URL
        #[arg(long, value_name = "URL")]
        cover: Option<String>,
    },
    /// List books, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a book (synced on next sync)
    Delete {
        /// Book ID or unique ID prefix
        id: String,
    },
}

#[derive(Subcommand)]
pub enum WordCommands {
    /// Add a word, optionally to a book
    #[command(alias = "new")]
    Add {
        /// The word itself
        word: String,
        /// What it means
        #[arg(short, long)]
        definition: String,
        /// Book ID or unique ID prefix (global word when omitted)
        #[arg(short, long, value_name = "ID")]
        book: Option<String>,
        /// Synonym (repeatable)
        #[arg(long = "synonym", value_name = "WORD")]
        synonyms: Vec<String>,
        /// Antonym (repeatable)
        #[arg(long = "antonym", value_name = "WORD")]
        antonyms: Vec<String>,
        /// Example sentence
        #[arg(short, long)]
        example: Option<String>,
    },
    /// List words, newest first
    List {
        /// Only words of this book
        #[arg(short, long, value_name = "ID", conflicts_with = "global")]
        book: Option<String>,
        /// Only words not tied to a book
        #[arg(long)]
        global: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a word as mastered
    Master {
        /// Word ID or unique ID prefix
        id: String,
        /// Clear the mastered flag instead
        #[arg(long)]
        unset: bool,
    },
    /// Delete a word (synced on next sync)
    Delete {
        /// Word ID or unique ID prefix
        id: String,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// List recently resolved sync conflicts
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective settings (token redacted)
    Show,
    /// Update stored settings
    Set {
        /// Backend base URL
        #[arg(long, value_name = "URL")]
        backend_url: Option<String>,
        /// Bearer token for the backend
        #[arg(long, value_name = "TOKEN")]
        auth_token: Option<String>,
        /// Owner ID used for new books
        #[arg(long, value_name = "UUID")]
        owner_id: Option<String>,
        /// Per-request timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout_secs: Option<u64>,
    },
}
