//! Admission and value-scoring policy for cache entries.

use crate::config::CacheConfig;

#[derive(Debug, Clone, Copy)]
pub struct AdmissionPolicy {
    min_tokens: u64,
    max_tokens: u64,
    min_cost: f64,
    coverage_threshold: f64,
    weight_frequency: f64,
    weight_recency: f64,
    weight_similarity: f64,
    weight_tokens_saved: f64,
}

const MAX_AGE_SECONDS: f64 = 86_400.0;
const HITS_CAP: f64 = 10.0;
const TOKENS_SAVED_CAP: f64 = 10_000.0;

impl AdmissionPolicy {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            min_tokens: config.min_tokens_to_cache,
            max_tokens: config.max_tokens_to_cache,
            min_cost: config.min_cost_to_cache,
            coverage_threshold: config.similarity_coverage_threshold,
            weight_frequency: config.weight_frequency,
            weight_recency: config.weight_recency,
            weight_similarity: config.weight_similarity,
            weight_tokens_saved: config.weight_tokens_saved,
        }
    }

    /// Decide whether a freshly computed answer is worth storing.
    pub fn should_cache(
        &self,
        tokens_used: u64,
        estimated_cost: f64,
        best_similarity_score: Option<f64>,
    ) -> bool {
        if tokens_used < self.min_tokens {
            return false;
        }
        if tokens_used > self.max_tokens {
            return false;
        }
        if estimated_cost < self.min_cost {
            return false;
        }
        if let Some(similarity) = best_similarity_score {
            if similarity >= self.coverage_threshold {
                return false;
            }
        }
        true
    }

    /// Weighted value score in [0, 1] driving eviction order: higher
    /// survives. Each component is individually capped before weighting.
    pub fn value_score(&self, hits: u64, age_seconds: f64, avg_similarity: f64, tokens_saved: u64) -> f64 {
        let frequency = (hits as f64 / HITS_CAP).min(1.0);
        let recency = (1.0 - age_seconds / MAX_AGE_SECONDS).max(0.0);
        let similarity = avg_similarity;
        let tokens = (tokens_saved as f64 / TOKENS_SAVED_CAP).min(1.0);

        self.weight_frequency * frequency
            + self.weight_recency * recency
            + self.weight_similarity * similarity
            + self.weight_tokens_saved * tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AdmissionPolicy {
        AdmissionPolicy::new(&CacheConfig::default())
    }

    #[test]
    fn rejects_short_responses() {
        assert!(!policy().should_cache(5, 0.01, None));
    }

    #[test]
    fn rejects_overlong_responses() {
        assert!(!policy().should_cache(5_000, 0.01, None));
    }

    #[test]
    fn rejects_too_cheap_responses() {
        assert!(!policy().should_cache(50, 0.0, None));
    }

    #[test]
    fn rejects_near_duplicate_coverage() {
        assert!(!policy().should_cache(50, 0.01, Some(0.99)));
    }

    #[test]
    fn admits_a_well_formed_response() {
        assert!(policy().should_cache(50, 0.01, Some(0.5)));
        assert!(policy().should_cache(50, 0.01, None));
    }

    #[test]
    fn value_score_is_bounded_in_unit_interval() {
        let score = policy().value_score(1000, 0.0, 1.0, 1_000_000);
        assert!(score <= 1.0 + 1e-9);
        let floor = policy().value_score(0, 1_000_000.0, 0.0, 0);
        assert!(floor >= 0.0);
    }

    #[test]
    fn fresh_frequent_entry_outscores_stale_rare_one() {
        let fresh = policy().value_score(10, 0.0, 0.95, 5000);
        let stale = policy().value_score(0, 86_400.0 * 2.0, 0.80, 0);
        assert!(fresh > stale);
    }
}
