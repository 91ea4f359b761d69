//! Pending change model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{ChangeId, Entity, EntityType};
use crate::error::Error;
use crate::util::now_millis;

/// Kind of mutation a pending change replays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl ChangeAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!("unknown change action: {other}"))),
        }
    }
}

/// A local mutation waiting for remote confirmation
///
/// Changes are replayed oldest first and removed only once the backend
/// confirms them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange {
    pub id: ChangeId,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub action: ChangeAction,
    /// JSON snapshot of the record at mutation time; `None` for deletes
    pub payload: Option<String>,
    /// Enqueue timestamp (Unix ms)
    pub created_at: i64,
    pub retry_count: u32,
}

impl PendingChange {
    /// Record a create or update carrying a snapshot of `entity`
    pub fn upsert(entity: &Entity, action: ChangeAction) -> serde_json::Result<Self> {
        Ok(Self {
            id: ChangeId::new(),
            entity_type: entity.entity_type(),
            entity_id: entity.id(),
            action,
            payload: Some(entity.to_payload()?),
            created_at: now_millis(),
            retry_count: 0,
        })
    }

    /// Record a delete of `entity_id`
    #[must_use]
    pub fn delete(entity_type: EntityType, entity_id: Uuid) -> Self {
        Self {
            id: ChangeId::new(),
            entity_type,
            entity_id,
            action: ChangeAction::Delete,
            payload: None,
            created_at: now_millis(),
            retry_count: 0,
        }
    }

    /// Decode the payload snapshot, if any
    pub fn entity(&self) -> crate::Result<Option<Entity>> {
        self.payload
            .as_deref()
            .map(|payload| Entity::from_payload(self.entity_type, payload))
            .transpose()
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{VocabWord, WordId};

    #[test]
    fn test_upsert_change_carries_snapshot() {
        let word = VocabWord::new(None, "ephemeral", "short-lived");
        let change = PendingChange::upsert(&word.clone().into(), ChangeAction::Create).unwrap();
        assert_eq!(change.entity_type, EntityType::VocabWord);
        assert_eq!(change.entity_id, word.id.as_uuid());
        assert_eq!(change.retry_count, 0);
        assert_eq!(change.entity().unwrap(), Some(Entity::Word(word)));
    }

    #[test]
    fn test_delete_change_has_no_payload() {
        let id = WordId::new();
        let change = PendingChange::delete(EntityType::VocabWord, id.as_uuid());
        assert_eq!(change.action, ChangeAction::Delete);
        assert!(change.entity().unwrap().is_none());
    }

    #[test]
    fn test_action_parse() {
        assert_eq!("update".parse::<ChangeAction>().unwrap(), ChangeAction::Update);
        assert!("upsert".parse::<ChangeAction>().is_err());
    }
}
