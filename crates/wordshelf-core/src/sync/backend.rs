//! Remote backend contract consumed by the sync engine

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Entity, EntityType};

/// Identifier the backend assigned to a created record
pub type RemoteId = String;

/// Failures talking to the backend
///
/// Every variant is transient from the sync engine's point of view: the
/// queued change stays queued and its retry count goes up.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("Backend request timed out")]
    Timeout,
    #[error("Backend unreachable: {0}")]
    Unreachable(String),
    #[error("Backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Backend rejected credentials: {0}")]
    Auth(String),
    #[error("Backend rejected record: {0}")]
    Verification(String),
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// CRUD-style remote API
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn create_remote(
        &self,
        entity_type: EntityType,
        record: &Entity,
    ) -> BackendResult<RemoteId>;

    async fn update_remote(
        &self,
        entity_type: EntityType,
        id: Uuid,
        record: &Entity,
    ) -> BackendResult<()>;

    async fn delete_remote(&self, entity_type: EntityType, id: Uuid) -> BackendResult<()>;

    /// Records of `entity_type` whose `updated_at` is after `since_ms`
    async fn fetch_updated_since(
        &self,
        entity_type: EntityType,
        since_ms: i64,
    ) -> BackendResult<Vec<Entity>>;
}
