//! In-process backend keeping records in a session map.

use super::{MemoryBackend, WindowChange, apply_change};
use crate::error::BackendError;
use crate::model::MemoryRecord;
use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// Volatile backend; records live as long as the backend does.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    sessions: RwLock<HashMap<Uuid, Vec<MemoryRecord>>>,
}

impl InMemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryBackend for InMemoryBackend {
    async fn load(&self, session_id: Uuid) -> Result<Vec<MemoryRecord>, BackendError> {
        Ok(self
            .sessions
            .read()
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn apply(&self, session_id: Uuid, change: WindowChange) -> Result<(), BackendError> {
        if change.is_empty() {
            return Ok(());
        }
        let evicted = change.evict.len();
        let mut sessions = self.sessions.write();
        let records = sessions.entry(session_id).or_default();
        apply_change(records, change);
        debug!(
            "applied window change (session_id={}, evicted={}, stored={})",
            session_id,
            evicted,
            records.len()
        );
        Ok(())
    }

    async fn clear(&self, session_id: Uuid) -> Result<(), BackendError> {
        self.sessions.write().remove(&session_id);
        Ok(())
    }
}
