//! In-process backend
//!
//! Holds remote state in memory and can be told to fail. Used as the test
//! double for the sync engine and for offline demos.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::backend::{BackendError, BackendResult, RemoteBackend, RemoteId};
use crate::models::{Book, Entity, EntityType, VocabWord};

/// One call observed by the backend, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Create(EntityType, Uuid),
    Update(EntityType, Uuid),
    Delete(EntityType, Uuid),
    Fetch(EntityType, i64),
}

#[derive(Default)]
struct RemoteState {
    books: HashMap<Uuid, Book>,
    words: HashMap<Uuid, VocabWord>,
    calls: Vec<BackendCall>,
    failing_ids: HashSet<Uuid>,
    unreachable: bool,
    fail_fetch: bool,
    latency: Option<Duration>,
}

/// Backend keeping everything in memory
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<RemoteState>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every mutating call touching `id` fails until healed
    pub fn fail_entity(&self, id: Uuid) {
        self.state().failing_ids.insert(id);
    }

    pub fn heal_entity(&self, id: Uuid) {
        self.state().failing_ids.remove(&id);
    }

    /// Every call fails as if the host were down
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state().unreachable = unreachable;
    }

    /// Only delta fetches fail
    pub fn set_fetch_failure(&self, fail: bool) {
        self.state().fail_fetch = fail;
    }

    /// Delay applied before every call is handled
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state().latency = latency;
    }

    /// Seed or overwrite remote state directly, as another device would
    pub fn insert_remote(&self, entity: Entity) {
        let mut state = self.state();
        match entity {
            Entity::Book(book) => {
                state.books.insert(book.id.as_uuid(), book);
            }
            Entity::Word(word) => {
                state.words.insert(word.id.as_uuid(), word);
            }
        }
    }

    pub fn book(&self, id: Uuid) -> Option<Book> {
        self.state().books.get(&id).cloned()
    }

    pub fn word(&self, id: Uuid) -> Option<VocabWord> {
        self.state().words.get(&id).cloned()
    }

    pub fn book_count(&self) -> usize {
        self.state().books.len()
    }

    pub fn word_count(&self) -> usize {
        self.state().words.len()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state().calls.clone()
    }

    /// Mutating calls only, fetches filtered out
    pub fn mutation_calls(&self) -> Vec<BackendCall> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, BackendCall::Fetch(..)))
            .collect()
    }

    async fn simulate_latency(&self) {
        let latency = self.state().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn mutate(
        &self,
        call: BackendCall,
        id: Uuid,
        apply: impl FnOnce(&mut RemoteState),
    ) -> BackendResult<()> {
        let mut state = self.state();
        state.calls.push(call);
        if state.unreachable {
            return Err(BackendError::Unreachable("in-memory backend offline".into()));
        }
        if state.failing_ids.contains(&id) {
            return Err(BackendError::Status {
                status: 503,
                message: format!("injected failure for {id}"),
            });
        }
        apply(&mut state);
        Ok(())
    }
}

fn store(state: &mut RemoteState, record: &Entity) {
    match record {
        Entity::Book(book) => {
            state.books.insert(book.id.as_uuid(), book.clone());
        }
        Entity::Word(word) => {
            state.words.insert(word.id.as_uuid(), word.clone());
        }
    }
}

#[async_trait]
impl RemoteBackend for InMemoryBackend {
    async fn create_remote(
        &self,
        entity_type: EntityType,
        record: &Entity,
    ) -> BackendResult<RemoteId> {
        self.simulate_latency().await;
        let id = record.id();
        self.mutate(BackendCall::Create(entity_type, id), id, |state| {
            store(state, record);
        })?;
        Ok(id.to_string())
    }

    async fn update_remote(
        &self,
        entity_type: EntityType,
        id: Uuid,
        record: &Entity,
    ) -> BackendResult<()> {
        self.simulate_latency().await;
        self.mutate(BackendCall::Update(entity_type, id), id, |state| {
            store(state, record);
        })
    }

    async fn delete_remote(&self, entity_type: EntityType, id: Uuid) -> BackendResult<()> {
        self.simulate_latency().await;
        self.mutate(BackendCall::Delete(entity_type, id), id, |state| match entity_type {
            EntityType::Book => {
                state.books.remove(&id);
            }
            EntityType::VocabWord => {
                state.words.remove(&id);
            }
        })
    }

    async fn fetch_updated_since(
        &self,
        entity_type: EntityType,
        since_ms: i64,
    ) -> BackendResult<Vec<Entity>> {
        self.simulate_latency().await;
        let mut state = self.state();
        state.calls.push(BackendCall::Fetch(entity_type, since_ms));
        if state.unreachable {
            return Err(BackendError::Unreachable("in-memory backend offline".into()));
        }
        if state.fail_fetch {
            return Err(BackendError::Timeout);
        }

        let mut records: Vec<Entity> = match entity_type {
            EntityType::Book => state
                .books
                .values()
                .filter(|book| book.updated_at > since_ms)
                .cloned()
                .map(Entity::Book)
                .collect(),
            EntityType::VocabWord => state
                .words
                .values()
                .filter(|word| word.updated_at > since_ms)
                .cloned()
                .map(Entity::Word)
                .collect(),
        };
        records.sort_by_key(Entity::updated_at);
        Ok(records)
    }
}
