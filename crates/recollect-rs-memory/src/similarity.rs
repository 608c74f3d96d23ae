//! Similarity collaborators used to rank retained records against a query.

use crate::error::BackendError;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
/// Scores candidate texts against a query; higher is more relevant.
pub trait Similarity: Send + Sync {
    /// Score every candidate in one batch, returning one score per candidate.
    async fn score(&self, query: &str, candidates: &[&str]) -> Result<Vec<f32>, BackendError>;
}

#[async_trait]
/// Produces dense vectors for texts (e.g. a sentence-embedding model).
pub trait Embedder: Send + Sync {
    /// Embed every text in one batch, returning one vector per text.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, BackendError>;
}

/// Bag-of-words cosine similarity over lowercase alphanumeric tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalSimilarity;

impl LexicalSimilarity {
    fn term_counts(text: &str) -> HashMap<String, f32> {
        let mut counts = HashMap::new();
        for token in text
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            *counts.entry(token.to_lowercase()).or_insert(0.0) += 1.0;
        }
        counts
    }

    fn cosine_terms(a: &HashMap<String, f32>, b: &HashMap<String, f32>) -> f32 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let dot: f32 = a
            .iter()
            .filter_map(|(term, count)| b.get(term).map(|other| count * other))
            .sum();
        let norm_a = a.values().map(|v| v * v).sum::<f32>().sqrt();
        let norm_b = b.values().map(|v| v * v).sum::<f32>().sqrt();
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl Similarity for LexicalSimilarity {
    async fn score(&self, query: &str, candidates: &[&str]) -> Result<Vec<f32>, BackendError> {
        let query_terms = Self::term_counts(query);
        Ok(candidates
            .iter()
            .map(|candidate| Self::cosine_terms(&query_terms, &Self::term_counts(candidate)))
            .collect())
    }
}

/// Cosine similarity over vectors produced by an [`Embedder`].
#[derive(Debug, Clone)]
pub struct EmbeddingSimilarity<E> {
    embedder: E,
}

impl<E: Embedder> EmbeddingSimilarity<E> {
    /// Score candidates with embeddings from `embedder`.
    pub fn new(embedder: E) -> Self {
        Self { embedder }
    }
}

#[async_trait]
impl<E: Embedder> Similarity for EmbeddingSimilarity<E> {
    async fn score(&self, query: &str, candidates: &[&str]) -> Result<Vec<f32>, BackendError> {
        let mut texts = Vec::with_capacity(candidates.len() + 1);
        texts.push(query);
        texts.extend_from_slice(candidates);
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(BackendError::Invalid(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        let (query_vector, candidate_vectors) = vectors.split_at(1);
        let query_vector = &query_vector[0];
        candidate_vectors
            .iter()
            .map(|vector| cosine_similarity(query_vector, vector))
            .collect()
    }
}

/// Cosine similarity of two dense vectors of equal dimension.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, BackendError> {
    if a.len() != b.len() {
        return Err(BackendError::Invalid(format!(
            "dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a * norm_b))
}

#[cfg(test)]
mod tests {
    use super::{Embedder, EmbeddingSimilarity, LexicalSimilarity, Similarity, cosine_similarity};
    use crate::error::BackendError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    /// Embeds a text as counts of the letters `a`, `b` and `c`.
    struct LetterEmbedder;

    #[async_trait]
    impl Embedder for LetterEmbedder {
        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, BackendError> {
            Ok(texts
                .iter()
                .map(|text| {
                    ['a', 'b', 'c']
                        .iter()
                        .map(|letter| text.matches(*letter).count() as f32)
                        .collect()
                })
                .collect())
        }
    }

    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        async fn embed(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, BackendError> {
            Ok(vec![vec![1.0]])
        }
    }

    #[tokio::test]
    async fn lexical_prefers_shared_terms() {
        let scores = LexicalSimilarity
            .score("my favourite colour", &["What is your favourite colour?", "hello"])
            .await
            .expect("score");
        assert!(scores[0] > scores[1]);
        assert_eq!(scores[1], 0.0);
    }

    #[tokio::test]
    async fn lexical_is_case_insensitive() {
        let scores = LexicalSimilarity
            .score("Rust", &["rust"])
            .await
            .expect("score");
        assert!((scores[0] - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn embedding_similarity_ranks_by_cosine() {
        let similarity = EmbeddingSimilarity::new(LetterEmbedder);
        let scores = similarity
            .score("aa", &["a", "b", "ab"])
            .await
            .expect("score");
        assert!((scores[0] - 1.0).abs() < 1e-6);
        assert_eq!(scores[1], 0.0);
        assert!(scores[2] > 0.0 && scores[2] < 1.0);
    }

    #[tokio::test]
    async fn embedding_similarity_rejects_short_batches() {
        let similarity = EmbeddingSimilarity::new(ShortEmbedder);
        let err = similarity.score("q", &["x"]).await.unwrap_err();
        assert!(matches!(err, BackendError::Invalid(_)));
    }

    #[test]
    fn cosine_rejects_dimension_mismatch() {
        assert!(cosine_similarity(&[1.0, 0.0], &[1.0]).is_err());
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).expect("cosine"), 0.0);
    }
}
