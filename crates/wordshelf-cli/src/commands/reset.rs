use std::path::Path;

use crate::commands::common::open_cache;
use crate::error::CliError;

pub async fn run_reset(confirmed: bool, db_path: &Path) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::ResetNotConfirmed);
    }

    let cache = open_cache(db_path)?;
    let pending = cache.pending_count().await?;
    cache.clear_all().await?;

    if pending > 0 {
        tracing::warn!("Discarded {pending} unsynced changes");
    }
    println!("Local cache cleared");
    Ok(())
}
