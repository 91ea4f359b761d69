pub mod book;
pub mod common;
pub mod completions;
pub mod config;
pub mod reset;
pub mod status;
pub mod sync;
pub mod word;
