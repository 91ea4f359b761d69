use std::path::Path;

use wordshelf_core::config::SyncSettings;
use wordshelf_core::models::OwnerId;
use wordshelf_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::commands::common::load_settings;
use crate::error::CliError;

/// Values passed to `config set`; `None` leaves the stored value alone.
#[derive(Debug, Default)]
pub struct SettingsUpdate {
    pub backend_url: Option<String>,
    pub auth_token: Option<String>,
    pub owner_id: Option<String>,
    pub timeout_secs: Option<u64>,
}

pub fn run_config(command: ConfigCommands, config_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_config_show(config_path),
        ConfigCommands::Set {
            backend_url,
            auth_token,
            owner_id,
            timeout_secs,
        } => {
            let update = SettingsUpdate {
                backend_url,
                auth_token,
                owner_id,
                timeout_secs,
            };
            run_config_set(update, config_path)
        }
    }
}

fn run_config_show(config_path: &Path) -> Result<(), CliError> {
    let settings = load_settings(config_path)?;
    println!("config: {}", config_path.display());
    for line in format_settings_lines(&settings) {
        println!("{line}");
    }
    if let Err(error) = settings.validate() {
        println!("warning: {error}");
    }
    Ok(())
}

fn run_config_set(update: SettingsUpdate, config_path: &Path) -> Result<(), CliError> {
    let mut settings = SyncSettings::load_from_path(config_path)?;
    apply_update(&mut settings, update)?;
    settings.validate()?;
    settings.save_to_path(config_path)?;
    println!("{}", config_path.display());
    Ok(())
}

pub fn apply_update(settings: &mut SyncSettings, update: SettingsUpdate) -> Result<(), CliError> {
    if let Some(url) = normalize_text_option(update.backend_url) {
        settings.backend_url = Some(url.trim_end_matches('/').to_string());
    }
    if let Some(token) = normalize_text_option(update.auth_token) {
        settings.auth_token = Some(token);
    }
    if let Some(raw) = normalize_text_option(update.owner_id) {
        let owner_id = raw
            .parse::<OwnerId>()
            .map_err(|error| CliError::Config(format!("invalid owner id: {error}")))?;
        settings.owner_id = Some(owner_id);
    }
    if let Some(timeout_secs) = update.timeout_secs {
        settings.request_timeout_secs = timeout_secs;
    }
    Ok(())
}

pub fn format_settings_lines(settings: &SyncSettings) -> Vec<String> {
    let unset = || "(not set)".to_string();
    vec![
        format!(
            "backend_url: {}",
            settings.backend_url.clone().unwrap_or_else(unset)
        ),
        format!(
            "auth_token: {}",
            settings
                .auth_token
                .as_ref()
                .map_or_else(unset, |_| "[REDACTED]".to_string())
        ),
        format!("request_timeout_secs: {}", settings.request_timeout_secs),
        format!(
            "owner_id: {}",
            settings
                .owner_id
                .map_or_else(unset, |owner_id| owner_id.to_string())
        ),
    ]
}
