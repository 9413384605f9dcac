//! A single stored cache entry.

use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub query_text: String,
    pub response_text: String,
    /// Unit L2-norm embedding; similarity against it is a plain dot product.
    pub embedding: Vec<f32>,
    pub hits: u64,
    pub avg_similarity: f64,
    pub created_at: u64,
    pub last_access_at: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
    pub tokens_saved: u64,
}

impl CacheEntry {
    pub fn new(
        query_text: String,
        response_text: String,
        embedding: Vec<f32>,
        input_tokens: u64,
        output_tokens: u64,
        cost: f64,
    ) -> Self {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        Self {
            query_text,
            response_text,
            embedding,
            hits: 0,
            avg_similarity: 0.0,
            created_at: now,
            last_access_at: now,
            input_tokens,
            output_tokens,
            cost,
            tokens_saved: 0,
        }
    }

    /// Cosine similarity via inner product; both vectors are assumed
    /// unit-norm. Falls back to 0.0 for mismatched dimensions rather than
    /// panicking, so a misconfigured embedding provider degrades to a miss.
    pub fn cosine_similarity(&self, other: &[f32]) -> f64 {
        if self.embedding.len() != other.len() {
            return 0.0;
        }
        self.embedding
            .iter()
            .zip(other)
            .map(|(a, b)| *a as f64 * *b as f64)
            .sum()
    }
}

/// L2-normalize a raw embedding vector in place. Embedding providers return
/// arbitrary-magnitude vectors; the cache requires unit norm so that cosine
/// similarity reduces to a dot product.
pub fn normalize(mut embedding: Vec<f32>) -> Vec<f32> {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in embedding.iter_mut() {
            *x /= norm;
        }
    }
    embedding
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_produces_unit_norm() {
        let v = normalize(vec![3.0, 4.0]);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn cosine_similarity_of_identical_unit_vectors_is_one() {
        let v = normalize(vec![1.0, 2.0, 3.0]);
        let entry = CacheEntry::new("q".into(), "r".into(), v.clone(), 1, 1, 0.0);
        assert!((entry.cosine_similarity(&v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn mismatched_dimension_similarity_is_zero() {
        let entry = CacheEntry::new("q".into(), "r".into(), vec![1.0, 0.0], 1, 1, 0.0);
        assert_eq!(entry.cosine_similarity(&[1.0, 0.0, 0.0]), 0.0);
    }
}
