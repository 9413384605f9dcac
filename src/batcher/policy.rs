//! Adaptive batching policy: per-model wait/size/token bounds, tuned by
//! catalog latency/cost tier and by the request's own latency tolerance.

use crate::catalog::{LatencyTier, ModelCatalog};
use crate::types::{Analysis, LatencyTolerance, OutputLength};

#[derive(Debug, Clone, Copy)]
pub struct AdaptiveBatchingConfig {
    pub base_wait_ms: i64,
    pub min_wait_ms: i64,
    pub max_wait_ms: i64,
    pub default_max_batch_size: usize,
    pub default_max_batch_tokens: u32,
}

impl Default for AdaptiveBatchingConfig {
    fn default() -> Self {
        Self {
            base_wait_ms: 80,
            min_wait_ms: 40,
            max_wait_ms: 120,
            default_max_batch_size: 8,
            default_max_batch_tokens: 3000,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchingPolicy {
    pub max_wait_ms: i64,
    pub max_batch_size: usize,
    pub max_batch_tokens: u32,
}

/// Scale a request's raw token count into its expected contribution toward
/// a batch's output budget. Short answers cost little beyond the prompt;
/// long ones multiply it.
fn output_length_factor(expected_output_length: OutputLength) -> f64 {
    match expected_output_length {
        OutputLength::Short => 0.2,
        OutputLength::Medium => 0.6,
        OutputLength::Long => 1.2,
    }
}

/// Effective token charge for one request: its raw token count inflated by
/// its output-length factor, rounded to the nearest token, never less than 1.
pub fn effective_tokens(token_count: u32, analysis: &Analysis) -> u32 {
    let factor = output_length_factor(analysis.expected_output_length);
    let scaled = token_count as f64 * (1.0 + factor);
    (scaled.round() as u32).max(1)
}

/// Wait bound adjusted by how latency-tolerant the request is, clamped to
/// the configured [min, max] band.
fn adaptive_wait_ms(cfg: &AdaptiveBatchingConfig, latency_tolerance: LatencyTolerance) -> i64 {
    let wait = match latency_tolerance {
        LatencyTolerance::Low => 50,
        LatencyTolerance::Medium => cfg.base_wait_ms,
        LatencyTolerance::High => 120,
    };
    wait.clamp(cfg.min_wait_ms, cfg.max_wait_ms)
}

/// Full batching policy for a model, combining catalog tuning with the
/// opening request's latency tolerance. A model absent from the catalog
/// falls back to the untuned defaults. Latency-tier and cost-tier rules
/// are applied as successive max/min refinements over shared size/token/
/// wait variables, so a model can be affected by both.
pub fn policy_for_model(
    catalog: &ModelCatalog,
    model_name: &str,
    analysis: &Analysis,
    cfg: &AdaptiveBatchingConfig,
) -> BatchingPolicy {
    let mut wait_ms = adaptive_wait_ms(cfg, analysis.latency_tolerance);
    let mut max_size = cfg.default_max_batch_size;
    let mut max_tokens = cfg.default_max_batch_tokens;

    if let Some(descriptor) = catalog.get(model_name) {
        // Fast models: allow larger batches, but keep wait small.
        if descriptor.latency_tier == LatencyTier::Low {
            max_size = max_size.max(12);
            max_tokens = max_tokens.max(4500);
            wait_ms = wait_ms.min(80);
        }

        // Slower models: keep batches smaller to reduce tail latency.
        if descriptor.latency_tier == LatencyTier::Medium {
            max_size = max_size.min(8);
            max_tokens = max_tokens.min(5000);
        }

        // Very cheap models: can batch more aggressively (size/tokens), but still interactive.
        if matches!(descriptor.cost_tier, crate::catalog::CostTier::VeryLow | crate::catalog::CostTier::Low) {
            max_tokens = max_tokens.max(5000);
        }

        // Expensive models: keep batches tighter.
        if descriptor.cost_tier == crate::catalog::CostTier::High {
            max_size = max_size.min(6);
            max_tokens = max_tokens.min(3500);
        }
    }

    BatchingPolicy { max_wait_ms: wait_ms, max_batch_size: max_size, max_batch_tokens: max_tokens }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ComplexityLevel, IntentType};

    fn analysis(latency: LatencyTolerance, output: OutputLength) -> Analysis {
        Analysis {
            intent_type: IntentType::General,
            complexity_level: ComplexityLevel::Medium,
            expected_output_length: output,
            latency_tolerance: latency,
            compliance_needed: false,
        }
    }

    #[test]
    fn effective_tokens_applies_output_length_factor() {
        assert_eq!(effective_tokens(100, &analysis(LatencyTolerance::Medium, OutputLength::Short)), 120);
        assert_eq!(effective_tokens(100, &analysis(LatencyTolerance::Medium, OutputLength::Medium)), 160);
        assert_eq!(effective_tokens(100, &analysis(LatencyTolerance::Medium, OutputLength::Long)), 220);
    }

    #[test]
    fn effective_tokens_never_rounds_to_zero() {
        assert_eq!(effective_tokens(0, &analysis(LatencyTolerance::Medium, OutputLength::Short)), 1);
    }

    #[test]
    fn wait_bound_stays_within_clamp() {
        let cfg = AdaptiveBatchingConfig::default();
        assert_eq!(adaptive_wait_ms(&cfg, LatencyTolerance::Low), 50);
        assert_eq!(adaptive_wait_ms(&cfg, LatencyTolerance::Medium), 80);
        assert_eq!(adaptive_wait_ms(&cfg, LatencyTolerance::High), 120);
    }

    #[test]
    fn unknown_model_falls_back_to_defaults() {
        let catalog = ModelCatalog::default();
        let cfg = AdaptiveBatchingConfig::default();
        let pol = policy_for_model(&catalog, "not-in-catalog", &analysis(LatencyTolerance::Medium, OutputLength::Medium), &cfg);
        assert_eq!(pol.max_batch_size, cfg.default_max_batch_size);
        assert_eq!(pol.max_batch_tokens, cfg.default_max_batch_tokens);
    }

    #[test]
    fn low_latency_tier_models_get_larger_batches() {
        let catalog = ModelCatalog::default();
        let cfg = AdaptiveBatchingConfig::default();
        let fast = policy_for_model(&catalog, "gpt-3.5-turbo", &analysis(LatencyTolerance::Medium, OutputLength::Medium), &cfg);
        let slow = policy_for_model(&catalog, "claude-3-opus", &analysis(LatencyTolerance::Medium, OutputLength::Medium), &cfg);
        assert!(fast.max_batch_size > slow.max_batch_size);
        assert_eq!(fast.max_batch_size, 12);
        assert_eq!(slow.max_batch_size, 6);
        // gpt-3.5-turbo is very-low cost tier, so its token budget is raised
        // to at least 5000 by the cost-tier rule on top of the low-latency
        // floor of 4500.
        assert_eq!(fast.max_batch_tokens, 5000);
        // claude-3-opus starts at the default 3000, unchanged by either the
        // medium-latency ceiling (5000) or the high-cost ceiling (3500).
        assert_eq!(slow.max_batch_tokens, 3000);
    }
}
