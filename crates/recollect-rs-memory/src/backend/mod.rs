//! Persistence backends for memory records.

use crate::error::BackendError;
use crate::model::{MemoryRecord, RecordId};
use async_trait::async_trait;
use uuid::Uuid;

pub mod file;
pub mod memory;

/// A single atomic mutation of a session's stored window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowChange {
    /// Record to append, if any.
    pub insert: Option<MemoryRecord>,
    /// Records to remove.
    pub evict: Vec<RecordId>,
}

impl WindowChange {
    /// True when the change would not touch storage.
    pub fn is_empty(&self) -> bool {
        self.insert.is_none() && self.evict.is_empty()
    }
}

#[async_trait]
/// Storage collaborator used by `BoundedSemanticMemory`.
///
/// Implementations may be shared across sessions; records are partitioned by
/// session id. `apply` must be all-or-nothing.
pub trait MemoryBackend: Send + Sync {
    /// Load every stored record for a session, in any order.
    async fn load(&self, session_id: Uuid) -> Result<Vec<MemoryRecord>, BackendError>;

    /// Fetch a single record by id.
    async fn get(
        &self,
        session_id: Uuid,
        id: RecordId,
    ) -> Result<Option<MemoryRecord>, BackendError> {
        let records = self.load(session_id).await?;
        Ok(records.into_iter().find(|record| record.id == id))
    }

    /// Atomically append and evict records for a session.
    async fn apply(&self, session_id: Uuid, change: WindowChange) -> Result<(), BackendError>;

    /// Remove every record for a session.
    async fn clear(&self, session_id: Uuid) -> Result<(), BackendError>;
}

/// Apply a change to an in-memory record list.
pub(crate) fn apply_change(records: &mut Vec<MemoryRecord>, change: WindowChange) {
    if !change.evict.is_empty() {
        records.retain(|record| !change.evict.contains(&record.id));
    }
    if let Some(record) = change.insert {
        records.push(record);
    }
}
