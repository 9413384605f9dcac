//! Background self-tuning loop: watches hit rate, nudges the cache's
//! adaptive thresholds, and surfaces advisory efficiency recommendations.

use serde::Serialize;

use crate::cache::SemanticCache;
use crate::config::{OptimizerConfig, THRESHOLD_CEILING, THRESHOLD_FLOOR};

#[derive(Debug, Clone, Serialize)]
pub struct ThresholdAdjustment {
    pub bucket: &'static str,
    pub old: f64,
    pub new: f64,
    pub change: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub optimization_number: u64,
    pub current_hit_rate: f64,
    pub target_hit_rate: f64,
    pub threshold_adjustments: Vec<ThresholdAdjustment>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
struct HistoryEntry {
    optimization_number: u64,
    hit_rate: f64,
    cache_size: usize,
    total_requests: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationSummary {
    pub optimization_count: u64,
    pub last_optimization_time: Option<u64>,
    pub requests_since_last_optimization: u64,
    pub next_optimization_at: u64,
    pub current_thresholds: (f64, f64, f64),
    pub recent_history: Vec<serde_json::Value>,
}

pub struct CacheOptimizer {
    config: OptimizerConfig,
    optimization_count: u64,
    last_optimization_time: Option<u64>,
    history: Vec<HistoryEntry>,
}

impl CacheOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config, optimization_count: 0, last_optimization_time: None, history: Vec::new() }
    }

    /// Whether `optimize` should run this request, based on the total
    /// request count crossing a multiple of the configured interval.
    pub fn should_optimize(&self, total_requests: u64) -> bool {
        total_requests > 0 && total_requests % self.config.optimization_interval == 0
    }

    pub fn optimize(&mut self, cache: &mut SemanticCache, now_unix_secs: u64) -> OptimizationResult {
        self.optimization_count += 1;
        self.last_optimization_time = Some(now_unix_secs);

        let metrics = cache.metrics().clone();
        let hit_rate = metrics.hit_rate();

        let mut adjustments = Vec::new();
        let mut recommendations = Vec::new();

        if hit_rate < self.config.target_hit_rate - 0.05 {
            let deltas = cache.adjust_thresholds(
                -self.config.threshold_adjustment_step,
                THRESHOLD_FLOOR,
                THRESHOLD_CEILING,
            );
            push_adjustments(&mut adjustments, deltas, "relaxed");
            recommendations.push("thresholds relaxed to increase cache hit rate".to_string());
            metrics::counter!(crate::telemetry::OPTIMIZER_ADJUSTMENTS_TOTAL).increment(1);
        } else if hit_rate > self.config.target_hit_rate + 0.10 {
            let deltas = cache.adjust_thresholds(
                self.config.threshold_adjustment_step,
                THRESHOLD_FLOOR,
                THRESHOLD_CEILING,
            );
            push_adjustments(&mut adjustments, deltas, "tightened");
            recommendations.push("thresholds tightened to improve match quality".to_string());
            metrics::counter!(crate::telemetry::OPTIMIZER_ADJUSTMENTS_TOTAL).increment(1);
        } else {
            recommendations.push("hit rate within target range, no threshold adjustment".to_string());
        }

        analyze_efficiency(&metrics, &mut recommendations);

        self.history.push(HistoryEntry {
            optimization_number: self.optimization_count,
            hit_rate,
            cache_size: metrics.cache_size,
            total_requests: metrics.total_requests,
        });

        tracing::info!(
            optimization_number = self.optimization_count,
            hit_rate,
            adjustments = adjustments.len(),
            "optimization run complete"
        );

        OptimizationResult {
            optimization_number: self.optimization_count,
            current_hit_rate: hit_rate,
            target_hit_rate: self.config.target_hit_rate,
            threshold_adjustments: adjustments,
            recommendations,
        }
    }

    pub fn summary(&self, cache: &SemanticCache, total_requests: u64) -> OptimizationSummary {
        let requests_since_last = total_requests % self.config.optimization_interval;
        let remainder = self.config.optimization_interval - requests_since_last;
        let next_optimization_at = total_requests + remainder;

        let recent_history = self
            .history
            .iter()
            .rev()
            .take(5)
            .rev()
            .map(|h| serde_json::to_value(h).unwrap())
            .collect();

        OptimizationSummary {
            optimization_count: self.optimization_count,
            last_optimization_time: self.last_optimization_time,
            requests_since_last_optimization: requests_since_last,
            next_optimization_at,
            current_thresholds: cache.thresholds(),
            recent_history,
        }
    }
}

fn push_adjustments(out: &mut Vec<ThresholdAdjustment>, deltas: [(f64, f64); 3], change: &'static str) {
    let buckets = ["short", "medium", "long"];
    for (bucket, (old, new)) in buckets.iter().zip(deltas) {
        out.push(ThresholdAdjustment { bucket, old, new, change });
    }
}

fn analyze_efficiency(metrics: &crate::types::CacheMetrics, recommendations: &mut Vec<String>) {
    if metrics.evictions > 0 && metrics.cache_size > 0 {
        let eviction_rate = metrics.evictions as f64 / metrics.cache_size as f64;
        if eviction_rate > 0.5 {
            recommendations.push(format!(
                "high eviction rate ({:.1}%), consider increasing MAX_CACHE_SIZE",
                eviction_rate * 100.0
            ));
        }
    }
    if metrics.cost_saved > 0.0 {
        recommendations.push(format!(
            "cost reduction: {:.2}% (${:.6} saved)",
            metrics.cost_reduction_percent(),
            metrics.cost_saved
        ));
    }
    if metrics.cache_size > 0 {
        let avg_hits = metrics.cache_hits as f64 / metrics.cache_size as f64;
        if avg_hits < 1.5 {
            recommendations.push(format!(
                "low average hits per entry ({avg_hits:.2}), admission policy may be too lenient"
            ));
        }
    }
}
