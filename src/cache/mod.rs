//! Adaptive semantic cache.
//!
//! A bounded, content-addressed store keyed by dense query embeddings.
//! Lookups use a flat inner-product index over unit-norm vectors (cosine
//! similarity reduces to a dot product once vectors are normalized).
//! Thresholds adapt per query-length bucket and are retuned by a
//! background [`optimizer`]; eviction is value-based rather than LRU.

pub mod entry;
pub mod optimizer;
pub mod policy;

use std::time::{Duration, SystemTime};

use crate::config::CacheConfig;
use crate::types::CacheMetrics;

pub use entry::CacheEntry;
pub use policy::AdmissionPolicy;

/// A single eviction log record.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EvictionRecord {
    pub timestamp_unix_secs: u64,
    pub query_prefix: String,
    pub response_prefix: String,
    pub hits: u64,
    pub age_hours: f64,
    pub value_score: f64,
    pub avg_similarity: f64,
    pub tokens_saved: u64,
    pub reason: &'static str,
}

/// Aggregated, read-only statistics over the current cache contents.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub avg_hits_per_entry: f64,
    pub avg_age_seconds: f64,
    pub top_queries: Vec<TopQuery>,
    pub value_distribution: ValueDistribution,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TopQuery {
    pub query: String,
    pub hits: u64,
    pub tokens_saved: u64,
    pub avg_similarity: f64,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ValueDistribution {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Result of a `lookup`: the candidate entry (if the bucket threshold was
/// met), the best observed similarity, and the threshold that was applied.
pub struct LookupResult<'a> {
    pub entry: Option<&'a CacheEntry>,
    pub similarity: f64,
    pub threshold_used: f64,
}

/// Dynamic thresholds, one per query-length bucket. Mutated only by the
/// optimizer.
#[derive(Debug, Clone, Copy)]
struct Thresholds {
    short: f64,
    medium: f64,
    long: f64,
}

pub struct SemanticCache {
    config: CacheConfig,
    policy: AdmissionPolicy,
    entries: Vec<CacheEntry>,
    thresholds: Thresholds,
    metrics: CacheMetrics,
    eviction_log: Vec<EvictionRecord>,
}

fn unix_secs_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

impl SemanticCache {
    pub fn new(config: CacheConfig) -> Self {
        let thresholds = Thresholds {
            short: config.threshold_short,
            medium: config.threshold_medium,
            long: config.threshold_long,
        };
        let policy = AdmissionPolicy::new(&config);
        Self {
            config,
            policy,
            entries: Vec::new(),
            thresholds,
            metrics: CacheMetrics::default(),
            eviction_log: Vec::new(),
        }
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    pub fn thresholds(&self) -> (f64, f64, f64) {
        (self.thresholds.short, self.thresholds.medium, self.thresholds.long)
    }

    fn bucket_threshold(&self, query_len: usize) -> f64 {
        if query_len < self.config.short_query_max_len {
            self.thresholds.short
        } else if query_len < self.config.medium_query_max_len {
            self.thresholds.medium
        } else {
            self.thresholds.long
        }
    }

    /// Find the nearest stored entry to `embedding` by inner product (the
    /// flat index: a linear scan, since embeddings are unit-norm and D is
    /// small relative to cache size). Returns `None` for an empty cache.
    fn nearest(&self, embedding: &[f32]) -> Option<(usize, f64)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (idx, entry.cosine_similarity(embedding)))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
    }

    /// Compute the caller-provided embedding's nearest neighbor and decide
    /// hit/miss against the adaptive threshold for `query`'s length.
    /// Embedding computation happens outside this call, per the
    /// non-suspending critical-section discipline.
    pub fn lookup(&mut self, query: &str, embedding: &[f32]) -> LookupResult<'_> {
        self.metrics.total_requests += 1;
        let threshold = self.bucket_threshold(query.len());

        let Some((idx, similarity)) = self.nearest(embedding) else {
            self.metrics.cache_misses += 1;
            return LookupResult { entry: None, similarity: 0.0, threshold_used: threshold };
        };

        if similarity >= threshold {
            self.metrics.cache_hits += 1;
            LookupResult { entry: Some(&self.entries[idx]), similarity, threshold_used: threshold }
        } else {
            self.metrics.cache_misses += 1;
            LookupResult { entry: None, similarity, threshold_used: threshold }
        }
    }

    /// Record a hit against the entry at `idx` (as returned by a prior
    /// `lookup`). The entry's running average similarity, hit count, and
    /// `last_access_at` are updated; global tokens/cost-saved counters
    /// advance too.
    pub fn record_hit(&mut self, idx: usize, similarity: f64, tokens_saved: u64, cost_saved: f64) {
        let entry = &mut self.entries[idx];
        entry.hits += 1;
        entry.last_access_at = unix_secs_now();
        entry.avg_similarity = (entry.avg_similarity * (entry.hits as f64 - 1.0) + similarity)
            / entry.hits as f64;
        entry.tokens_saved += tokens_saved;

        self.metrics.tokens_saved += tokens_saved;
        self.metrics.cost_saved += cost_saved;
    }

    /// Record token/cost spend for a cache-miss generation. Kept separate
    /// from `admit` since a miss's spend is tallied even when the policy
    /// declines to store the response.
    pub fn record_spend(&mut self, tokens_used: u64, cost: f64) {
        self.metrics.tokens_used += tokens_used;
        self.metrics.cost_total += cost;
    }

    /// Locate the index of the entry that was returned from `lookup`, by
    /// identity of its query text. The HTTP handler holds only the
    /// `LookupResult` borrow across an await point it can't keep, so hit
    /// recording re-resolves by query text instead of by borrowed index.
    pub fn index_of(&self, query_text: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.query_text == query_text)
    }

    pub fn entry(&self, idx: usize) -> &CacheEntry {
        &self.entries[idx]
    }

    /// Apply the admission policy, evicting first if the cache is full,
    /// and store the entry if admitted. Returns whether it was stored.
    #[allow(clippy::too_many_arguments)]
    pub fn admit(
        &mut self,
        query: &str,
        response: &str,
        embedding: Vec<f32>,
        input_tokens: u64,
        output_tokens: u64,
        cost: f64,
        best_existing_similarity: Option<f64>,
    ) -> bool {
        let total_tokens = input_tokens + output_tokens;
        if !self.policy.should_cache(total_tokens, cost, best_existing_similarity) {
            return false;
        }

        if self.entries.len() >= self.config.max_cache_size {
            self.evict();
        }

        self.entries.push(CacheEntry::new(
            query.to_string(),
            response.to_string(),
            embedding,
            input_tokens,
            output_tokens,
            cost,
        ));
        self.metrics.cache_size = self.entries.len();
        true
    }

    /// Value-based eviction: remove the lowest-scoring `ceil(p * size)`
    /// entries (at least one), rebuilding the index from survivors.
    fn evict(&mut self) {
        let now = unix_secs_now();
        let num_to_evict =
            ((self.entries.len() as f64 * self.config.eviction_percentage).ceil() as usize).max(1);

        let mut scored: Vec<(usize, f64)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let age_sec = now.saturating_sub(entry.created_at) as f64;
                (idx, self.policy.value_score(entry.hits, age_sec, entry.avg_similarity, entry.tokens_saved))
            })
            .collect();

        // Ascending by value, ties broken by older created_at (earlier index
        // in a push-ordered vec is older).
        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap()
                .then_with(|| self.entries[a.0].created_at.cmp(&self.entries[b.0].created_at))
        });

        let mut to_evict: Vec<usize> = scored.into_iter().take(num_to_evict).map(|(idx, _)| idx).collect();
        to_evict.sort_unstable_by(|a, b| b.cmp(a)); // remove from the back first

        for idx in &to_evict {
            let (query_prefix, query_60, response_prefix, hits, avg_similarity, tokens_saved, age_hours, value_score) = {
                let entry = &self.entries[*idx];
                let age_hours = now.saturating_sub(entry.created_at) as f64 / 3600.0;
                let value_score = self.policy.value_score(
                    entry.hits,
                    now.saturating_sub(entry.created_at) as f64,
                    entry.avg_similarity,
                    entry.tokens_saved,
                );
                (
                    entry.query_text.chars().take(100).collect::<String>(),
                    entry.query_text.chars().take(60).collect::<String>(),
                    entry.response_text.chars().take(100).collect::<String>(),
                    entry.hits,
                    entry.avg_similarity,
                    entry.tokens_saved,
                    age_hours,
                    value_score,
                )
            };
            self.push_eviction_record(EvictionRecord {
                timestamp_unix_secs: now,
                query_prefix,
                response_prefix,
                hits,
                age_hours,
                value_score,
                avg_similarity,
                tokens_saved,
                reason: "low value score",
            });
            tracing::warn!(
                query = %query_60,
                hits,
                age_hours,
                value_score,
                "evicting cache entry"
            );
        }

        for idx in to_evict {
            self.entries.remove(idx);
        }

        self.metrics.evictions += num_to_evict as u64;
        self.metrics.cache_size = self.entries.len();
        metrics::counter!(crate::telemetry::CACHE_EVICTIONS_TOTAL).increment(num_to_evict as u64);
    }

    fn push_eviction_record(&mut self, record: EvictionRecord) {
        if self.eviction_log.len() >= self.config.eviction_log_capacity {
            self.eviction_log.remove(0);
        }
        self.eviction_log.push(record);
    }

    pub fn eviction_history(&self, limit: usize) -> Vec<EvictionRecord> {
        let len = self.eviction_log.len();
        let start = len.saturating_sub(limit);
        self.eviction_log[start..].to_vec()
    }

    pub fn stats(&self) -> CacheStats {
        if self.entries.is_empty() {
            return CacheStats {
                total_entries: 0,
                avg_hits_per_entry: 0.0,
                avg_age_seconds: 0.0,
                top_queries: Vec::new(),
                value_distribution: ValueDistribution::default(),
            };
        }

        let now = unix_secs_now();
        let total_hits: u64 = self.entries.iter().map(|e| e.hits).sum();
        let total_age: u64 = self.entries.iter().map(|e| now.saturating_sub(e.created_at)).sum();

        let mut by_hits: Vec<&CacheEntry> = self.entries.iter().collect();
        by_hits.sort_by(|a, b| b.hits.cmp(&a.hits));
        let top_queries = by_hits
            .into_iter()
            .take(5)
            .map(|e| TopQuery {
                query: e.query_text.chars().take(100).collect(),
                hits: e.hits,
                tokens_saved: e.tokens_saved,
                avg_similarity: e.avg_similarity,
            })
            .collect();

        let values: Vec<f64> = self
            .entries
            .iter()
            .map(|e| {
                self.policy.value_score(
                    e.hits,
                    now.saturating_sub(e.created_at) as f64,
                    e.avg_similarity,
                    e.tokens_saved,
                )
            })
            .collect();
        let value_distribution = ValueDistribution {
            min: values.iter().cloned().fold(f64::INFINITY, f64::min),
            max: values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            avg: values.iter().sum::<f64>() / values.len() as f64,
        };

        CacheStats {
            total_entries: self.entries.len(),
            avg_hits_per_entry: total_hits as f64 / self.entries.len() as f64,
            avg_age_seconds: total_age as f64 / self.entries.len() as f64,
            top_queries,
            value_distribution,
        }
    }

    /// Drop all entries and reset counters, the eviction log, and the
    /// adaptive thresholds to their configured defaults.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.metrics = CacheMetrics::default();
        self.eviction_log.clear();
        self.thresholds = Thresholds {
            short: self.config.threshold_short,
            medium: self.config.threshold_medium,
            long: self.config.threshold_long,
        };
    }

    /// Relax or tighten all three thresholds by `step`, clamped to
    /// `[floor, ceiling]`. Used by the background optimizer.
    pub(crate) fn adjust_thresholds(&mut self, step: f64, floor: f64, ceiling: f64) -> [(f64, f64); 3] {
        let adjust = |value: f64| (value + step).clamp(floor, ceiling);
        let old = (self.thresholds.short, self.thresholds.medium, self.thresholds.long);
        self.thresholds.short = adjust(self.thresholds.short);
        self.thresholds.medium = adjust(self.thresholds.medium);
        self.thresholds.long = adjust(self.thresholds.long);
        [
            (old.0, self.thresholds.short),
            (old.1, self.thresholds.medium),
            (old.2, self.thresholds.long),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(mut v: Vec<f32>) -> Vec<f32> {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        for x in v.iter_mut() {
            *x /= norm;
        }
        v
    }

    #[test]
    fn exact_repeat_hits_with_short_bucket_threshold() {
        let mut cache = SemanticCache::new(CacheConfig::default());
        let embedding = unit(vec![1.0, 0.0, 0.0]);
        assert!(cache.admit(
            "What is the capital of France?",
            "Paris",
            embedding.clone(),
            5,
            3,
            1e-4,
            None,
        ));

        let result = cache.lookup("What is the capital of France?", &embedding);
        assert!(result.entry.is_some());
        assert!(result.similarity >= 0.92);
        assert_eq!(result.threshold_used, 0.92);
        let similarity = result.similarity;
        let idx = cache.index_of("What is the capital of France?").unwrap();
        cache.record_hit(idx, similarity, 8, 1e-4);
        assert_eq!(cache.entry(idx).hits, 1);
    }

    #[test]
    fn near_duplicate_is_suppressed_by_coverage_threshold() {
        let mut cache = SemanticCache::new(CacheConfig::default());
        let e1 = unit(vec![1.0, 0.0, 0.0]);
        assert!(cache.admit("Q1", "A1", e1, 20, 20, 1e-4, None));

        // similarity 0.985 >= default coverage_threshold 0.98.
        let stored = cache.admit("Q2", "A2", unit(vec![0.99, 0.1, 0.0]), 20, 20, 1e-4, Some(0.985));
        assert!(!stored);
        assert_eq!(cache.entries.len(), 1);
    }

    #[test]
    fn admission_rejects_too_few_tokens() {
        let mut cache = SemanticCache::new(CacheConfig::default());
        let stored = cache.admit("q", "a", unit(vec![1.0, 0.0]), 1, 1, 1e-4, None);
        assert!(!stored);
    }

    #[test]
    fn cache_size_never_exceeds_max_after_admission() {
        let mut config = CacheConfig::default();
        config.max_cache_size = 4;
        let mut cache = SemanticCache::new(config);
        for i in 0..20 {
            let angle = i as f32;
            let embedding = unit(vec![angle.cos(), angle.sin(), 0.01 * i as f32]);
            cache.admit(&format!("query {i}"), "resp", embedding, 50, 50, 0.01, None);
            assert!(cache.entries.len() <= 4);
        }
    }

    #[test]
    fn eviction_removes_ceil_of_percentage() {
        let mut config = CacheConfig::default();
        config.max_cache_size = 10;
        config.eviction_percentage = 0.10;
        let mut cache = SemanticCache::new(config);
        for i in 0..10 {
            let angle = i as f32;
            let embedding = unit(vec![angle.cos(), angle.sin()]);
            cache.admit(&format!("q{i}"), "r", embedding, 50, 50, 0.01, None);
        }
        assert_eq!(cache.entries.len(), 10);
        cache.admit("q-new", "r", unit(vec![0.7, 0.7]), 50, 50, 0.01, None);
        // 10% of 10 (pre-insertion size) => ceil(1.0) = 1 evicted, then 1 admitted.
        assert_eq!(cache.entries.len(), 10);
        assert_eq!(cache.metrics.evictions, 1);
    }

    #[test]
    fn clear_resets_size_and_hit_rate() {
        let mut cache = SemanticCache::new(CacheConfig::default());
        cache.admit("q", "a response long enough to pass admission checks here", unit(vec![1.0, 0.0]), 50, 50, 0.01, None);
        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(cache.metrics().hit_rate(), 0.0);
    }

    #[test]
    fn threshold_adjustment_stays_within_clamp_bounds() {
        let mut cache = SemanticCache::new(CacheConfig::default());
        for _ in 0..20 {
            cache.adjust_thresholds(-0.02, 0.70, 0.98);
        }
        let (s, m, l) = cache.thresholds();
        assert!(s >= 0.70 && m >= 0.70 && l >= 0.70);
    }
}
