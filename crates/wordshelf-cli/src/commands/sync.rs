use std::path::Path;
use std::sync::Arc;

use wordshelf_core::config::SyncSettings;
use wordshelf_core::connectivity::ManualConnectivity;
use wordshelf_core::sync::{HttpBackend, SyncAttempt, SyncEngine, SyncEngineConfig, SyncStatus};

use crate::commands::common::{
    format_sync_conflict_lines, load_settings, open_cache, sync_conflict_to_item, SyncConflictItem,
};
use crate::error::CliError;

pub async fn run_sync(db_path: &Path, config_path: &Path) -> Result<(), CliError> {
    let settings = load_settings(config_path)?;
    settings.validate()?;
    let backend = http_backend(&settings)?;

    let cache = open_cache(db_path)?;
    // No platform reachability signal in a terminal
    let engine = SyncEngine::new(
        cache,
        Arc::new(backend),
        Arc::new(ManualConnectivity::new(true)),
        SyncEngineConfig::from(&settings),
    );

    match engine.sync_all().await {
        SyncAttempt::Finished(status) => report_status(&status),
        SyncAttempt::AlreadyRunning | SyncAttempt::Cancelled => Ok(()),
    }
}

pub fn http_backend(settings: &SyncSettings) -> Result<HttpBackend, CliError> {
    let Some(url) = settings.backend_url.clone() else {
        return Err(CliError::SyncNotConfigured);
    };
    Ok(HttpBackend::new(
        url,
        settings.auth_token.clone(),
        settings.request_timeout(),
    )?)
}

fn report_status(status: &SyncStatus) -> Result<(), CliError> {
    match status {
        SyncStatus::Completed { synced } => {
            println!("Sync completed ({synced} changes pushed)");
            Ok(())
        }
        SyncStatus::Failed { failure } => Err(CliError::SyncFailed(failure.to_string())),
        SyncStatus::Idle | SyncStatus::Syncing => Ok(()),
    }
}

pub async fn run_sync_conflicts(
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let conflicts = open_cache(db_path)?.list_conflicts(limit).await?;

    if as_json {
        let json_items = conflicts
            .iter()
            .map(sync_conflict_to_item)
            .collect::<Vec<SyncConflictItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No sync conflicts recorded.");
        return Ok(());
    }

    for line in format_sync_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}
