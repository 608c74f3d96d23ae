use async_trait::async_trait;
use recollect_rs_memory::{BackendError, Similarity};
use std::collections::HashMap;
use std::time::Duration;

/// Similarity returning preset scores per candidate text; unknown texts score 0.
#[derive(Debug, Clone, Default)]
pub struct FixedSimilarity {
    scores: HashMap<String, f32>,
}

impl FixedSimilarity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_score(mut self, content: impl Into<String>, score: f32) -> Self {
        self.scores.insert(content.into(), score);
        self
    }
}

#[async_trait]
impl Similarity for FixedSimilarity {
    async fn score(&self, _query: &str, candidates: &[&str]) -> Result<Vec<f32>, BackendError> {
        Ok(candidates
            .iter()
            .map(|candidate| self.scores.get(*candidate).copied().unwrap_or(0.0))
            .collect())
    }
}

/// Similarity collaborator that is never reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSimilarity;

#[async_trait]
impl Similarity for FailingSimilarity {
    async fn score(&self, _query: &str, _candidates: &[&str]) -> Result<Vec<f32>, BackendError> {
        Err(BackendError::Unavailable("embedding service down".to_string()))
    }
}

/// Similarity that answers with one score too few.
#[derive(Debug, Clone, Copy, Default)]
pub struct MiscountSimilarity;

#[async_trait]
impl Similarity for MiscountSimilarity {
    async fn score(&self, _query: &str, candidates: &[&str]) -> Result<Vec<f32>, BackendError> {
        Ok(vec![1.0; candidates.len().saturating_sub(1)])
    }
}

/// Similarity that sleeps for `delay` before scoring everything 0.
#[derive(Debug, Clone, Copy)]
pub struct SlowSimilarity {
    delay: Duration,
}

impl SlowSimilarity {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Similarity for SlowSimilarity {
    async fn score(&self, _query: &str, candidates: &[&str]) -> Result<Vec<f32>, BackendError> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![0.0; candidates.len()])
    }
}
