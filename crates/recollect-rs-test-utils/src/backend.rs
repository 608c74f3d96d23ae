use async_trait::async_trait;
use parking_lot::Mutex;
use recollect_rs_memory::{
    BackendError, InMemoryBackend, MemoryBackend, MemoryRecord, WindowChange,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// In-memory backend that records every applied change and can be told to fail.
#[derive(Default)]
pub struct RecordingBackend {
    inner: InMemoryBackend,
    changes: Mutex<Vec<WindowChange>>,
    fail_writes: AtomicBool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `apply`/`clear` calls fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Changes accepted so far.
    pub fn changes(&self) -> Vec<WindowChange> {
        self.changes.lock().clone()
    }

    fn check_writable(&self) -> Result<(), BackendError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("write rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MemoryBackend for RecordingBackend {
    async fn load(&self, session_id: Uuid) -> Result<Vec<MemoryRecord>, BackendError> {
        self.inner.load(session_id).await
    }

    async fn apply(&self, session_id: Uuid, change: WindowChange) -> Result<(), BackendError> {
        self.check_writable()?;
        self.changes.lock().push(change.clone());
        self.inner.apply(session_id, change).await
    }

    async fn clear(&self, session_id: Uuid) -> Result<(), BackendError> {
        self.check_writable()?;
        self.inner.clear(session_id).await
    }
}

/// Backend that is never reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingBackend;

#[async_trait]
impl MemoryBackend for FailingBackend {
    async fn load(&self, _session_id: Uuid) -> Result<Vec<MemoryRecord>, BackendError> {
        Err(BackendError::Unavailable("connection refused".to_string()))
    }

    async fn apply(&self, _session_id: Uuid, _change: WindowChange) -> Result<(), BackendError> {
        Err(BackendError::Unavailable("connection refused".to_string()))
    }

    async fn clear(&self, _session_id: Uuid) -> Result<(), BackendError> {
        Err(BackendError::Unavailable("connection refused".to_string()))
    }
}

/// Backend whose writes take `delay` before reaching an in-memory store.
#[derive(Default)]
pub struct SlowBackend {
    inner: InMemoryBackend,
    delay: Duration,
}

impl SlowBackend {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryBackend::new(),
            delay,
        }
    }
}

#[async_trait]
impl MemoryBackend for SlowBackend {
    async fn load(&self, session_id: Uuid) -> Result<Vec<MemoryRecord>, BackendError> {
        self.inner.load(session_id).await
    }

    async fn apply(&self, session_id: Uuid, change: WindowChange) -> Result<(), BackendError> {
        tokio::time::sleep(self.delay).await;
        self.inner.apply(session_id, change).await
    }

    async fn clear(&self, session_id: Uuid) -> Result<(), BackendError> {
        tokio::time::sleep(self.delay).await;
        self.inner.clear(session_id).await
    }
}

/// Backend that commits each write and then, while stalling, sleeps for `delay`
/// before answering, so a caller's timeout fires after the change landed.
pub struct StallingBackend {
    inner: InMemoryBackend,
    delay: Duration,
    stalling: AtomicBool,
}

impl StallingBackend {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryBackend::new(),
            delay,
            stalling: AtomicBool::new(false),
        }
    }

    /// Start (or stop) stalling after commits.
    pub fn set_stalling(&self, stalling: bool) {
        self.stalling.store(stalling, Ordering::SeqCst);
    }
}

#[async_trait]
impl MemoryBackend for StallingBackend {
    async fn load(&self, session_id: Uuid) -> Result<Vec<MemoryRecord>, BackendError> {
        self.inner.load(session_id).await
    }

    async fn apply(&self, session_id: Uuid, change: WindowChange) -> Result<(), BackendError> {
        self.inner.apply(session_id, change).await?;
        if self.stalling.load(Ordering::SeqCst) {
            tokio::time::sleep(self.delay).await;
        }
        Ok(())
    }

    async fn clear(&self, session_id: Uuid) -> Result<(), BackendError> {
        self.inner.clear(session_id).await
    }
}
