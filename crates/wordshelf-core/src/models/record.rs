//! Local record wrapper shared by both collections

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// Two-phase delete state of a stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordLifecycle {
    #[default]
    Active,
    /// Soft-deleted locally, delete not yet confirmed by the backend
    PendingDelete,
    /// Delete confirmed; physically removed by the next tombstone sweep
    Gone,
}

impl RecordLifecycle {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::PendingDelete => "pending_delete",
            Self::Gone => "gone",
        }
    }

    /// The single visibility rule every read path goes through
    pub const fn is_visible(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl FromStr for RecordLifecycle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "pending_delete" => Ok(Self::PendingDelete),
            "gone" => Ok(Self::Gone),
            other => Err(Error::InvalidInput(format!("unknown lifecycle: {other}"))),
        }
    }
}

/// A stored entity plus its sync bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRecord<T> {
    pub entity: T,
    /// Local changes exist that the backend has not confirmed yet
    pub needs_sync: bool,
    pub lifecycle: RecordLifecycle,
}

impl<T> LocalRecord<T> {
    pub const fn active(entity: T, needs_sync: bool) -> Self {
        Self {
            entity,
            needs_sync,
            lifecycle: RecordLifecycle::Active,
        }
    }

    /// Soft-delete tombstone flag
    pub const fn marked_for_deletion(&self) -> bool {
        !matches!(self.lifecycle, RecordLifecycle::Active)
    }

    pub const fn is_visible(&self) -> bool {
        self.lifecycle.is_visible()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_active_records_are_visible() {
        assert!(RecordLifecycle::Active.is_visible());
        assert!(!RecordLifecycle::PendingDelete.is_visible());
        assert!(!RecordLifecycle::Gone.is_visible());
    }

    #[test]
    fn test_marked_for_deletion() {
        let mut record = LocalRecord::active("x", true);
        assert!(!record.marked_for_deletion());
        record.lifecycle = RecordLifecycle::PendingDelete;
        assert!(record.marked_for_deletion());
        assert!(!record.is_visible());
    }

    #[test]
    fn test_lifecycle_parse_roundtrip() {
        for lifecycle in [
            RecordLifecycle::Active,
            RecordLifecycle::PendingDelete,
            RecordLifecycle::Gone,
        ] {
            assert_eq!(lifecycle.as_str().parse::<RecordLifecycle>().unwrap(), lifecycle);
        }
    }
}
