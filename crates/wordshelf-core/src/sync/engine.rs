//! Sync engine state machine.
//!
//! One pass: drain the pending-change queue oldest first, fetch remote deltas
//! for both collections, reconcile them last-writer-wins, then publish the
//! outcome. At most one pass runs at a time.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::backend::{BackendError, RemoteBackend};
use super::status::{SyncFailure, SyncStatus};
use crate::config::SyncSettings;
use crate::connectivity::{Connectivity, ConnectivityEvent};
use crate::error::Result;
use crate::models::{ChangeAction, Entity, EntityType, PendingChange};
use crate::services::CacheManager;
use crate::util::now_millis;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Tunables for the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncEngineConfig {
    /// Upper bound for each backend call; hitting it counts as a failed item.
    pub request_timeout: Duration,
}

impl Default for SyncEngineConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl From<&SyncSettings> for SyncEngineConfig {
    fn from(settings: &SyncSettings) -> Self {
        Self {
            request_timeout: settings.request_timeout(),
        }
    }
}

/// What a call to [`SyncEngine::sync_all`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAttempt {
    /// Another pass was in flight; nothing changed.
    AlreadyRunning,
    /// The pass was cancelled and left the status alone.
    Cancelled,
    /// The pass ran (or was refused as offline) and published this status.
    Finished(SyncStatus),
}

enum PassOutcome {
    Done { synced: usize, has_errors: bool },
    Cancelled,
}

#[derive(Debug, Error)]
enum DispatchError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("unreadable payload: {0}")]
    Payload(String),
}

/// Reconciles the local cache with the remote backend.
pub struct SyncEngine {
    cache: CacheManager,
    backend: Arc<dyn RemoteBackend>,
    connectivity: Arc<dyn Connectivity>,
    config: SyncEngineConfig,
    syncing: AtomicBool,
    generation: AtomicU64,
    /// Held around each dispatch and its confirmation, so a pass started
    /// after a cancel waits for the cancelled pass's in-flight item
    in_flight: Mutex<()>,
    status: watch::Sender<SyncStatus>,
}

impl SyncEngine {
    pub fn new(
        cache: CacheManager,
        backend: Arc<dyn RemoteBackend>,
        connectivity: Arc<dyn Connectivity>,
        config: SyncEngineConfig,
    ) -> Self {
        let (status, _) = watch::channel(SyncStatus::Idle);
        Self {
            cache,
            backend,
            connectivity,
            config,
            syncing: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(()),
            status,
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// When remote deltas were last pulled in full.
    pub async fn last_sync_date(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .cache
            .last_sync_at()
            .await?
            .and_then(DateTime::from_timestamp_millis))
    }

    /// Run one sync pass.
    ///
    /// Returns immediately with [`SyncAttempt::AlreadyRunning`] if a pass is
    /// in flight, and with `Failed(Offline)` if there is no connectivity.
    pub async fn sync_all(&self) -> SyncAttempt {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Sync already in flight");
            return SyncAttempt::AlreadyRunning;
        }

        if !self.connectivity.is_connected() {
            let status = SyncStatus::Failed {
                failure: SyncFailure::Offline,
            };
            self.status.send_replace(status.clone());
            self.syncing.store(false, Ordering::Release);
            debug!("Sync skipped: offline");
            return SyncAttempt::Finished(status);
        }

        let generation = self.generation.load(Ordering::Acquire);
        self.status.send_replace(SyncStatus::Syncing);
        info!("Sync started");

        let status = match self.run_pass(generation).await {
            Ok(PassOutcome::Cancelled) => return SyncAttempt::Cancelled,
            Ok(PassOutcome::Done { synced, has_errors }) if has_errors => SyncStatus::Failed {
                failure: SyncFailure::Partial { synced },
            },
            Ok(PassOutcome::Done { synced, .. }) => SyncStatus::Completed { synced },
            Err(error) => {
                error!("Sync aborted by local store failure: {error}");
                SyncStatus::Failed {
                    failure: SyncFailure::Storage {
                        message: error.to_string(),
                    },
                }
            }
        };

        if self.is_cancelled(generation) {
            return SyncAttempt::Cancelled;
        }
        info!("Sync finished: {status}");
        self.status.send_replace(status.clone());
        self.syncing.store(false, Ordering::Release);
        SyncAttempt::Finished(status)
    }

    /// Reset to idle without interrupting the in-flight backend call.
    ///
    /// The running pass finishes the item it is on, takes no new ones and
    /// does not publish its outcome.
    pub fn cancel_sync(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.syncing.store(false, Ordering::Release);
        self.status.send_replace(SyncStatus::Idle);
        info!("Sync cancelled");
    }

    fn is_cancelled(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) != generation
    }

    async fn run_pass(&self, generation: u64) -> Result<PassOutcome> {
        let mut synced = 0;
        let mut has_errors = false;

        for change in self.cache.pending_changes().await? {
            let _in_flight = self.in_flight.lock().await;
            if self.is_cancelled(generation) {
                return Ok(PassOutcome::Cancelled);
            }
            // Another pass may have confirmed it while this one waited
            if !self.cache.is_queued(&change.id).await? {
                debug!(change_id = %change.id, "Change already confirmed");
                continue;
            }

            match self.dispatch(&change).await {
                Ok(()) => {
                    if self.cache.confirm_change(&change).await? {
                        synced += 1;
                    }
                }
                Err(dispatch_error) => {
                    let retries = self.cache.record_failed_attempt(&change.id).await?;
                    warn!(
                        change_id = %change.id,
                        entity = %change.entity_id,
                        action = %change.action,
                        retries = retries.unwrap_or_default(),
                        "Pending change failed: {dispatch_error}"
                    );
                    has_errors = true;
                }
            }
        }

        // Captured before fetching so edits landing remotely mid-fetch are
        // picked up next time
        let fetch_started = now_millis();
        let since = self.cache.last_sync_at().await?.unwrap_or(0);
        let mut fetch_ok = true;

        for entity_type in [EntityType::Book, EntityType::VocabWord] {
            if self.is_cancelled(generation) {
                return Ok(PassOutcome::Cancelled);
            }

            let fetched = tokio::time::timeout(
                self.config.request_timeout,
                self.backend.fetch_updated_since(entity_type, since),
            )
            .await
            .unwrap_or(Err(BackendError::Timeout));

            match fetched {
                Ok(records) => {
                    debug!("Fetched {} remote {entity_type} records", records.len());
                    for record in records {
                        self.cache.apply_remote(record).await?;
                    }
                }
                Err(fetch_error) => {
                    warn!("Fetching remote {entity_type} changes failed: {fetch_error}");
                    fetch_ok = false;
                }
            }
        }

        if fetch_ok {
            self.cache.set_last_sync_at(fetch_started).await?;
        } else {
            has_errors = true;
        }

        if !has_errors {
            self.cache.sweep_tombstones().await?;
        }

        Ok(PassOutcome::Done { synced, has_errors })
    }

    async fn dispatch(&self, change: &PendingChange) -> std::result::Result<(), DispatchError> {
        debug!(
            change_id = %change.id,
            entity = %change.entity_id,
            "Dispatching {} {}",
            change.action,
            change.entity_type
        );

        let call = async {
            match change.action {
                ChangeAction::Create => {
                    let record = payload(change)?;
                    let remote_id = self
                        .backend
                        .create_remote(change.entity_type, &record)
                        .await?;
                    if remote_id != change.entity_id.to_string() {
                        warn!(
                            entity = %change.entity_id,
                            "Backend assigned a different id: {remote_id}"
                        );
                    }
                }
                ChangeAction::Update => {
                    let record = payload(change)?;
                    self.backend
                        .update_remote(change.entity_type, change.entity_id, &record)
                        .await?;
                }
                ChangeAction::Delete => {
                    self.backend
                        .delete_remote(change.entity_type, change.entity_id)
                        .await?;
                }
            }
            Ok::<(), DispatchError>(())
        };

        tokio::time::timeout(self.config.request_timeout, call)
            .await
            .map_err(|_| DispatchError::Backend(BackendError::Timeout))?
    }
}

fn payload(change: &PendingChange) -> std::result::Result<Entity, DispatchError> {
    change
        .entity()
        .map_err(|error| DispatchError::Payload(error.to_string()))?
        .ok_or_else(|| DispatchError::Payload(format!("{} has no payload", change.action)))
}

/// Run [`SyncEngine::sync_all`] every time connectivity comes back.
///
/// The task ends when the event channel closes.
pub fn spawn_auto_sync(
    engine: Arc<SyncEngine>,
    mut events: broadcast::Receiver<ConnectivityEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ConnectivityEvent::BecameAvailable) => {
                    let attempt = engine.sync_all().await;
                    debug!(?attempt, "Connectivity-triggered sync");
                }
                Ok(ConnectivityEvent::BecameUnavailable) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Missed {skipped} connectivity events");
                    if engine.connectivity.is_connected() {
                        engine.sync_all().await;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("Auto-sync stopped");
    })
}
