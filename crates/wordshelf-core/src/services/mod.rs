//! Service layer shared by every wordshelf interface.

mod cache_manager;

pub use cache_manager::CacheManager;
