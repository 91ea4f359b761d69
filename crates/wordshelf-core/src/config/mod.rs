//! Sync settings shared by every client.
//!
//! Persisted as JSON; every field can be overridden from the environment.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::OwnerId;
use crate::util::{is_http_url, normalize_text_option};

pub const ENV_BACKEND_URL: &str = "WORDSHELF_BACKEND_URL";
pub const ENV_AUTH_TOKEN: &str = "WORDSHELF_AUTH_TOKEN";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "WORDSHELF_REQUEST_TIMEOUT_SECS";
pub const ENV_OWNER_ID: &str = "WORDSHELF_OWNER_ID";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Where and how to reach the backend, and whose data this cache holds.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyncSettings {
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub owner_id: Option<OwnerId>,
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            backend_url: None,
            auth_token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            owner_id: None,
        }
    }
}

impl std::fmt::Debug for SyncSettings {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SyncSettings")
            .field("backend_url", &self.backend_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("owner_id", &self.owner_id)
            .finish()
    }
}

impl SyncSettings {
    /// Load settings from `path`; a missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let mut settings: Self = serde_json::from_str(&raw).map_err(|error| {
            Error::Config(format!("failed to parse {}: {error}", path.display()))
        })?;
        settings.normalize();
        Ok(settings)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        std::fs::write(path, serde_json::to_string_pretty(&normalized)?)?;
        Ok(())
    }

    /// Apply `WORDSHELF_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = normalize_text_option(lookup(ENV_BACKEND_URL)) {
            self.backend_url = Some(url);
        }
        if let Some(token) = normalize_text_option(lookup(ENV_AUTH_TOKEN)) {
            self.auth_token = Some(token);
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_REQUEST_TIMEOUT_SECS)) {
            self.request_timeout_secs = raw.parse().map_err(|_| {
                Error::Config(format!("{ENV_REQUEST_TIMEOUT_SECS} must be a whole number"))
            })?;
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_OWNER_ID)) {
            let owner_id = raw
                .parse()
                .map_err(|error| Error::Config(format!("{ENV_OWNER_ID}: {error}")))?;
            self.owner_id = Some(owner_id);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.backend_url {
            if !is_http_url(url) {
                return Err(Error::Config(
                    "backend_url must start with http:// or https://".to_string(),
                ));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub const fn is_backend_configured(&self) -> bool {
        self.backend_url.is_some()
    }

    fn normalize(&mut self) {
        self.backend_url = normalize_text_option(self.backend_url.take());
        self.auth_token = normalize_text_option(self.auth_token.take());
    }
}
