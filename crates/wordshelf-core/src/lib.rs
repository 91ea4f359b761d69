//! wordshelf-core - Core library for wordshelf
//!
//! This crate contains the models, the local SQLite store, the cache manager,
//! the connectivity monitor and the sync engine shared by every wordshelf
//! interface. All local writes return without touching the network; the sync
//! engine replays the pending-change queue when connectivity returns.

pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Book, BookId, ChangeId, EntityType, PendingChange, VocabWord, WordId};
pub use services::CacheManager;
