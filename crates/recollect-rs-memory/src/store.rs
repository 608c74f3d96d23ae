//! Bounded, similarity-ranked conversational memory.
//!
//! The store keeps the most recent `max_history` records of one session in
//! process, mirrors every change to a [`MemoryBackend`], and answers queries by
//! ranking the retained window with a [`Similarity`] collaborator. Retrieval is
//! two-stage: the recency window bounds the candidates, similarity orders them.

use crate::backend::{MemoryBackend, WindowChange};
use crate::error::{BackendError, MemoryError};
use crate::model::{MemoryRecord, RecordId, Role};
use crate::policy::{CapturePolicy, CompiledCapturePolicy};
use crate::similarity::Similarity;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::cmp::Ordering;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Default retention window size.
pub const DEFAULT_MAX_HISTORY: usize = 10;
/// Default collaborator round-trip timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Construction options for [`BoundedSemanticMemory`].
#[derive(Debug, Clone)]
pub struct MemoryOptions {
    /// Maximum number of retained records. Must be at least 1.
    pub max_history: usize,
    /// Timeout applied to every backend or similarity round trip.
    pub timeout: Option<Duration>,
    /// Sanitization applied to content before insertion.
    pub capture: CapturePolicy,
}

impl Default for MemoryOptions {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            timeout: Some(DEFAULT_TIMEOUT),
            capture: CapturePolicy::default(),
        }
    }
}

impl MemoryOptions {
    /// Options with the given cap and defaults elsewhere.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }
}

/// Per-query recall options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecallOptions {
    /// Drop candidates scoring below this value.
    pub min_score: Option<f32>,
}

/// Retained window, ordered oldest first.
#[derive(Debug, Default)]
struct Window {
    records: Vec<MemoryRecord>,
    next_seq: u64,
    last_timestamp: Option<DateTime<Utc>>,
    /// Ids of inserts whose backend write failed, timed out or was cancelled.
    /// The backend may still hold them, so the next committed change evicts them.
    unconfirmed: Vec<RecordId>,
}

impl Window {
    fn hydrate(mut records: Vec<MemoryRecord>) -> Self {
        records.sort_by_key(MemoryRecord::recency);
        let next_seq = records.iter().map(|record| record.seq + 1).max().unwrap_or(0);
        let last_timestamp = records.last().map(|record| record.created_at);
        Self {
            records,
            next_seq,
            last_timestamp,
            unconfirmed: Vec::new(),
        }
    }

    /// Timestamp for the next record, clamped so it never moves backwards.
    fn next_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        }
    }

    /// Number of oldest records to drop so that `incoming` more fit under `cap`.
    fn overflow(&self, incoming: usize, cap: usize) -> usize {
        (self.records.len() + incoming).saturating_sub(cap)
    }

    fn oldest_ids(&self, count: usize) -> Vec<RecordId> {
        self.records
            .iter()
            .take(count)
            .map(|record| record.id)
            .collect()
    }

    /// Ids to evict from the backend: the `count` oldest plus any unconfirmed inserts.
    fn eviction(&self, count: usize) -> Vec<RecordId> {
        let mut evict = self.oldest_ids(count);
        evict.extend(self.unconfirmed.iter().copied());
        evict
    }

    /// The newest `cap` records.
    fn newest(&self, cap: usize) -> &[MemoryRecord] {
        let start = self.records.len().saturating_sub(cap);
        &self.records[start..]
    }
}

/// Capped window of recent conversational records with similarity recall.
pub struct BoundedSemanticMemory {
    session_id: Uuid,
    backend: Arc<dyn MemoryBackend>,
    similarity: Arc<dyn Similarity>,
    max_history: usize,
    timeout: Option<Duration>,
    capture: CompiledCapturePolicy,
    window: RwLock<Window>,
}

impl std::fmt::Debug for BoundedSemanticMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedSemanticMemory")
            .field("session_id", &self.session_id)
            .field("max_history", &self.max_history)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl BoundedSemanticMemory {
    /// Create an empty memory for a fresh session.
    pub fn new(
        backend: Arc<dyn MemoryBackend>,
        similarity: Arc<dyn Similarity>,
        options: MemoryOptions,
    ) -> Result<Self, MemoryError> {
        Self::build(Uuid::new_v4(), backend, similarity, options, Window::default())
    }

    /// Open the memory of an existing session, hydrating the window from the backend.
    ///
    /// A session stored under a larger cap is trimmed to the newest
    /// `max_history` records; the overflow is evicted from the backend in one
    /// change before the store is returned.
    pub async fn open(
        session_id: Uuid,
        backend: Arc<dyn MemoryBackend>,
        similarity: Arc<dyn Similarity>,
        options: MemoryOptions,
    ) -> Result<Self, MemoryError> {
        check_max_history(options.max_history)?;
        let records = with_timeout(options.timeout, "load", backend.load(session_id))
            .await
            .map_err(MemoryError::StorageUnavailable)?;
        let records = records
            .into_iter()
            .filter(|record| record.session_id == session_id)
            .collect();
        let mut window = Window::hydrate(records);

        let overflow = window.overflow(0, options.max_history);
        if overflow > 0 {
            let change = WindowChange {
                insert: None,
                evict: window.oldest_ids(overflow),
            };
            with_timeout(options.timeout, "evict", backend.apply(session_id, change))
                .await
                .map_err(MemoryError::StorageUnavailable)?;
            window.records.drain(..overflow);
        }
        info!(
            "opened memory session (session_id={}, retained={}, evicted={}, max_history={})",
            session_id,
            window.records.len(),
            overflow,
            options.max_history
        );
        Self::build(session_id, backend, similarity, options, window)
    }

    fn build(
        session_id: Uuid,
        backend: Arc<dyn MemoryBackend>,
        similarity: Arc<dyn Similarity>,
        options: MemoryOptions,
        window: Window,
    ) -> Result<Self, MemoryError> {
        check_max_history(options.max_history)?;
        let capture = CompiledCapturePolicy::compile(&options.capture)?;
        Ok(Self {
            session_id,
            backend,
            similarity,
            max_history: options.max_history,
            timeout: options.timeout,
            capture,
            window: RwLock::new(window),
        })
    }

    /// Session this memory belongs to.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Retention cap.
    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Number of retained records.
    pub async fn len(&self) -> usize {
        self.window.read().await.records.len()
    }

    /// True when no records are retained.
    pub async fn is_empty(&self) -> bool {
        self.window.read().await.records.is_empty()
    }

    /// Snapshot of the retained window, oldest first.
    pub async fn retained(&self) -> Vec<MemoryRecord> {
        self.window.read().await.records.clone()
    }

    /// Store a conversational turn and evict the oldest records past the cap.
    ///
    /// The insert and its eviction reach the backend as one change; the
    /// window is only updated once the backend has accepted it. A write that
    /// fails, times out or is cancelled still consumes its sequence number,
    /// and its id is evicted by the next committed change.
    pub async fn insert(&self, content: &str, role: Role) -> Result<RecordId, MemoryError> {
        if content.trim().is_empty() {
            return Err(MemoryError::InvalidArgument(
                "content must not be empty".to_string(),
            ));
        }
        if role.as_str().trim().is_empty() {
            return Err(MemoryError::InvalidArgument(
                "role tag must not be empty".to_string(),
            ));
        }
        let content = self.capture.apply(content);
        if content.trim().is_empty() {
            return Err(MemoryError::InvalidArgument(
                "content is empty after capture policy".to_string(),
            ));
        }

        let mut window = self.window.write().await;
        let record = MemoryRecord {
            id: Uuid::new_v4(),
            session_id: self.session_id,
            role,
            content,
            created_at: window.next_timestamp(Utc::now()),
            seq: window.next_seq,
        };
        let overflow = window.overflow(1, self.max_history);
        let change = WindowChange {
            insert: Some(record.clone()),
            evict: window.eviction(overflow),
        };
        let flushed = window.unconfirmed.len();
        window.unconfirmed.push(record.id);
        window.next_seq = record.seq + 1;
        window.last_timestamp = Some(record.created_at);

        if let Err(reason) = with_timeout(
            self.timeout,
            "insert",
            self.backend.apply(self.session_id, change),
        )
        .await
        {
            warn!(
                "memory insert not confirmed (session_id={}, record_id={}, reason={})",
                self.session_id, record.id, reason
            );
            return Err(MemoryError::StorageUnavailable(reason));
        }

        let id = record.id;
        window.unconfirmed.clear();
        window.records.drain(..overflow);
        debug!(
            "inserted memory record (session_id={}, role={}, content_len={}, evicted={}, flushed={})",
            self.session_id,
            record.role,
            record.content.len(),
            overflow,
            flushed
        );
        window.records.push(record);
        Ok(id)
    }

    /// Evict the oldest records until the window fits the cap.
    ///
    /// Unconfirmed inserts are evicted from the backend in the same change.
    /// Returns every evicted id; a no-op when within capacity and nothing is
    /// unconfirmed.
    pub async fn evict_if_over_capacity(&self) -> Result<Vec<RecordId>, MemoryError> {
        let mut window = self.window.write().await;
        let overflow = window.overflow(0, self.max_history);
        let evict = window.eviction(overflow);
        if evict.is_empty() {
            return Ok(Vec::new());
        }
        let change = WindowChange {
            insert: None,
            evict: evict.clone(),
        };
        with_timeout(
            self.timeout,
            "evict",
            self.backend.apply(self.session_id, change),
        )
        .await
        .map_err(MemoryError::StorageUnavailable)?;
        window.records.drain(..overflow);
        window.unconfirmed.clear();
        info!(
            "evicted memory records (session_id={}, evicted={}, retained={})",
            self.session_id,
            evict.len(),
            window.records.len()
        );
        Ok(evict)
    }

    /// Remove every record of the session.
    pub async fn clear(&self) -> Result<(), MemoryError> {
        let mut window = self.window.write().await;
        with_timeout(self.timeout, "clear", self.backend.clear(self.session_id))
            .await
            .map_err(MemoryError::StorageUnavailable)?;
        let removed = window.records.len();
        window.records.clear();
        window.unconfirmed.clear();
        info!(
            "cleared memory session (session_id={}, removed={})",
            self.session_id, removed
        );
        Ok(())
    }

    /// Return up to `k` retained records most similar to `text`.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.query_with_options(text, k, RecallOptions::default())
            .await
    }

    /// Return up to `k` retained records most similar to `text`, filtered by `options`.
    ///
    /// Ordered by score, then newer timestamp, then later insertion.
    pub async fn query_with_options(
        &self,
        text: &str,
        k: usize,
        options: RecallOptions,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let candidates = self.window.read().await.newest(self.max_history).to_vec();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = candidates
            .iter()
            .map(|record| record.content.as_str())
            .collect();
        let scores = with_timeout(
            self.timeout,
            "similarity",
            self.similarity.score(text, &texts),
        )
        .await
        .map_err(MemoryError::RetrievalUnavailable)?;
        if scores.len() != candidates.len() {
            return Err(MemoryError::RetrievalUnavailable(format!(
                "similarity returned {} scores for {} candidates",
                scores.len(),
                candidates.len()
            )));
        }

        let mut ranked: Vec<(f32, MemoryRecord)> = scores
            .into_iter()
            .map(normalize_score)
            .zip(candidates)
            .collect();
        if let Some(min_score) = options.min_score {
            ranked.retain(|(score, _)| *score >= min_score);
        }
        ranked.sort_by(|(score_a, a), (score_b, b)| rank(*score_a, a, *score_b, b));
        ranked.truncate(k);
        debug!(
            "recalled memory records (session_id={}, k={}, returned={})",
            self.session_id,
            k,
            ranked.len()
        );
        Ok(ranked.into_iter().map(|(_, record)| record).collect())
    }
}

/// NaN ranks below every score; `-0.0` ties with `0.0`.
fn normalize_score(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else if score == 0.0 {
        0.0
    } else {
        score
    }
}

fn check_max_history(max_history: usize) -> Result<(), MemoryError> {
    if max_history == 0 {
        return Err(MemoryError::InvalidArgument(
            "max_history must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Descending score, then descending recency.
fn rank(score_a: f32, a: &MemoryRecord, score_b: f32, b: &MemoryRecord) -> Ordering {
    score_b
        .total_cmp(&score_a)
        .then_with(|| b.recency().cmp(&a.recency()))
}

/// Run a collaborator call under an optional timeout, describing any failure.
async fn with_timeout<T>(
    timeout: Option<Duration>,
    operation: &str,
    call: impl Future<Output = Result<T, BackendError>>,
) -> Result<T, String> {
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => {
                return Err(format!(
                    "{operation} timed out after {}ms",
                    limit.as_millis()
                ));
            }
        },
        None => call.await,
    };
    result.map_err(|err| format!("{operation} failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::{BoundedSemanticMemory, MemoryOptions, RecallOptions, Window};
    use crate::backend::memory::InMemoryBackend;
    use crate::error::MemoryError;
    use crate::model::{MemoryRecord, Role};
    use crate::policy::CapturePolicy;
    use crate::similarity::LexicalSimilarity;
    use chrono::{Duration as ChronoDuration, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use uuid::Uuid;

    fn memory(max_history: usize) -> BoundedSemanticMemory {
        BoundedSemanticMemory::new(
            Arc::new(InMemoryBackend::new()),
            Arc::new(LexicalSimilarity),
            MemoryOptions {
                capture: CapturePolicy::passthrough(),
                ..MemoryOptions::with_max_history(max_history)
            },
        )
        .expect("memory")
    }

    fn contents(records: &[MemoryRecord]) -> Vec<String> {
        records.iter().map(|record| record.content.clone()).collect()
    }

    #[tokio::test]
    async fn cap_scenario_evicts_oldest() {
        let memory = memory(2);
        memory.insert("hello", Role::User).await.expect("insert");
        memory
            .insert("hi there", Role::Assistant)
            .await
            .expect("insert");
        memory.insert("how are you", Role::User).await.expect("insert");

        assert_eq!(
            contents(&memory.retained().await),
            vec!["hi there".to_string(), "how are you".to_string()]
        );
        let results = memory.query("hello", 5).await.expect("query");
        assert!(results.iter().all(|record| record.content != "hello"));
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn empty_store_query_returns_nothing() {
        let memory = memory(3);
        assert!(memory.query("anything", 5).await.expect("query").is_empty());
        assert!(memory.is_empty().await);
    }

    #[tokio::test]
    async fn zero_k_returns_nothing() {
        let memory = memory(3);
        memory.insert("hello", Role::User).await.expect("insert");
        assert!(memory.query("hello", 0).await.expect("query").is_empty());
    }

    #[tokio::test]
    async fn query_ranks_by_score_then_recency() {
        let memory = memory(10);
        memory.insert("I like tea", Role::User).await.expect("insert");
        memory.insert("unrelated", Role::Assistant).await.expect("insert");
        memory.insert("tea is great", Role::User).await.expect("insert");
        memory.insert("also unrelated", Role::Assistant).await.expect("insert");

        let results = memory.query("tea", 4).await.expect("query");
        // "I like tea" and "tea is great" tie on score; the newer comes first.
        assert_eq!(
            contents(&results),
            vec![
                "tea is great".to_string(),
                "I like tea".to_string(),
                "also unrelated".to_string(),
                "unrelated".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn min_score_filters_candidates() {
        let memory = memory(10);
        memory.insert("I like tea", Role::User).await.expect("insert");
        memory.insert("unrelated", Role::Assistant).await.expect("insert");

        let results = memory
            .query_with_options(
                "tea",
                5,
                RecallOptions {
                    min_score: Some(0.1),
                },
            )
            .await
            .expect("query");
        assert_eq!(contents(&results), vec!["I like tea".to_string()]);
    }

    #[tokio::test]
    async fn insert_rejects_blank_content_and_role() {
        let memory = memory(2);
        let err = memory.insert("   ", Role::User).await.unwrap_err();
        assert!(matches!(err, MemoryError::InvalidArgument(_)));
        let err = memory
            .insert("hello", Role::Other(" ".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::InvalidArgument(_)));
        assert!(memory.is_empty().await);
    }

    #[tokio::test]
    async fn zero_cap_is_rejected() {
        let err = BoundedSemanticMemory::new(
            Arc::new(InMemoryBackend::new()),
            Arc::new(LexicalSimilarity),
            MemoryOptions::with_max_history(0),
        )
        .unwrap_err();
        assert!(matches!(err, MemoryError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn capture_policy_applies_before_storage() {
        let memory = BoundedSemanticMemory::new(
            Arc::new(InMemoryBackend::new()),
            Arc::new(LexicalSimilarity),
            MemoryOptions {
                capture: CapturePolicy {
                    redact_patterns: vec![r"\d{4}-\d{4}".to_string()],
                    detect_secrets: false,
                    ..CapturePolicy::default()
                },
                ..MemoryOptions::default()
            },
        )
        .expect("memory");
        memory
            .insert("card 1234-5678", Role::User)
            .await
            .expect("insert");
        assert_eq!(
            contents(&memory.retained().await),
            vec!["card [REDACTED]".to_string()]
        );
    }

    #[tokio::test]
    async fn ids_are_unique_and_sequence_increases() {
        let memory = memory(3);
        let mut ids = Vec::new();
        for turn in 0..6 {
            ids.push(
                memory
                    .insert(&format!("turn {turn}"), Role::User)
                    .await
                    .expect("insert"),
            );
        }
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());

        let retained = memory.retained().await;
        let seqs: Vec<u64> = retained.iter().map(|record| record.seq).collect();
        assert_eq!(seqs, vec![3, 4, 5]);
        assert!(
            retained
                .windows(2)
                .all(|pair| pair[0].created_at <= pair[1].created_at)
        );
    }

    #[test]
    fn timestamps_never_move_backwards() {
        let now = Utc::now();
        let window = Window {
            last_timestamp: Some(now),
            ..Window::default()
        };
        assert_eq!(window.next_timestamp(now - ChronoDuration::seconds(5)), now);
        let later = now + ChronoDuration::seconds(1);
        assert_eq!(window.next_timestamp(later), later);
    }

    #[test]
    fn hydrate_orders_by_timestamp_then_sequence() {
        let now = Utc::now();
        let session_id = Uuid::new_v4();
        let make = |seq: u64, offset: i64| MemoryRecord {
            id: Uuid::new_v4(),
            session_id,
            role: Role::User,
            content: format!("{seq}"),
            created_at: now + ChronoDuration::seconds(offset),
            seq,
        };
        let window = Window::hydrate(vec![make(2, 1), make(1, 0), make(0, 0)]);
        let seqs: Vec<u64> = window.records.iter().map(|record| record.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(window.next_seq, 3);
        assert_eq!(window.last_timestamp, Some(now + ChronoDuration::seconds(1)));
    }
}
