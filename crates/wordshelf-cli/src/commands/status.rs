use std::path::Path;

use crate::commands::common::{format_pending_lines, format_sync_timestamp, open_cache};
use crate::error::CliError;

pub async fn run_status(verbose: bool, db_path: &Path) -> Result<(), CliError> {
    let cache = open_cache(db_path)?;
    let pending = cache.pending_count().await?;
    let last_sync = cache.last_sync_at().await?;

    println!("{}", format_pending_summary(pending));
    println!("{}", format_last_sync(last_sync));

    if verbose && pending > 0 {
        println!();
        for line in format_pending_lines(&cache.pending_changes().await?) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn format_pending_summary(pending: usize) -> String {
    match pending {
        0 => "All changes synced".to_string(),
        1 => "1 change pending".to_string(),
        count => format!("{count} changes pending"),
    }
}

pub fn format_last_sync(last_sync_ms: Option<i64>) -> String {
    last_sync_ms.map_or_else(
        || "Never synced".to_string(),
        |timestamp| format!("Last synced {}", format_sync_timestamp(timestamp)),
    )
}
