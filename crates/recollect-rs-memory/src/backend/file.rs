//! File-backed backend storing JSONL records per session.

use super::{MemoryBackend, WindowChange, apply_change};
use crate::error::BackendError;
use crate::model::MemoryRecord;
use async_trait::async_trait;
use log::{debug, info};
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Durable backend writing one `<session_id>.jsonl` file per session.
#[derive(Debug)]
pub struct FileBackend {
    /// Root directory for memory records.
    root: PathBuf,
    /// Serializes file access within the process.
    io_lock: Mutex<()>,
}

impl FileBackend {
    /// Create a new file-backed backend under the given root.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, BackendError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        info!("initialized file memory backend (root={})", root.display());
        Ok(Self {
            root,
            io_lock: Mutex::new(()),
        })
    }

    /// Root directory holding session files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the session JSONL file.
    fn session_path(&self, session_id: Uuid) -> PathBuf {
        self.root.join(format!("{session_id}.jsonl"))
    }

    /// Path to the temporary session file.
    fn temp_path(&self, session_id: Uuid) -> PathBuf {
        self.root.join(format!("{session_id}.jsonl.tmp"))
    }

    /// Load all records for a session.
    fn load_records(&self, session_id: Uuid) -> Result<Vec<MemoryRecord>, BackendError> {
        let path = self.session_path(session_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = OpenOptions::new().read(true).open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: MemoryRecord = serde_json::from_str(&line)?;
            records.push(record);
        }
        Ok(records)
    }

    /// Rewrite a session's records atomically.
    fn write_records(&self, session_id: Uuid, records: &[MemoryRecord]) -> Result<(), BackendError> {
        let path = self.session_path(session_id);
        let temp_path = self.temp_path(session_id);
        {
            let mut file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&temp_path)?;
            for record in records {
                let line = serde_json::to_string(record)?;
                writeln!(file, "{line}")?;
            }
            file.sync_all()?;
        }
        std::fs::rename(temp_path, path)?;
        Ok(())
    }
}

#[async_trait]
impl MemoryBackend for FileBackend {
    async fn load(&self, session_id: Uuid) -> Result<Vec<MemoryRecord>, BackendError> {
        let _guard = self.io_lock.lock();
        let records = self.load_records(session_id)?;
        debug!(
            "loaded memory records (session_id={}, count={})",
            session_id,
            records.len()
        );
        Ok(records)
    }

    /// Apply a change by rewriting the session file through a temp file.
    async fn apply(&self, session_id: Uuid, change: WindowChange) -> Result<(), BackendError> {
        if change.is_empty() {
            return Ok(());
        }
        let _guard = self.io_lock.lock();
        let mut records = self.load_records(session_id)?;
        let evicted = change.evict.len();
        apply_change(&mut records, change);
        self.write_records(session_id, &records)?;
        debug!(
            "persisted window change (session_id={}, evicted={}, stored={})",
            session_id,
            evicted,
            records.len()
        );
        Ok(())
    }

    async fn clear(&self, session_id: Uuid) -> Result<(), BackendError> {
        let _guard = self.io_lock.lock();
        let path = self.session_path(session_id);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        info!("cleared memory records (session_id={})", session_id);
        Ok(())
    }
}
