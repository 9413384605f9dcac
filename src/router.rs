//! Cost-first, capability-threshold model router.
//!
//! Picks the cheapest/fastest catalog model that meets a minimum capability
//! threshold for the request's intent and complexity, escalating only when
//! compliance or latency requirements demand it. Ties are broken
//! deterministically so the same request features always route to the same
//! model — no random jitter.

use serde::Serialize;

use crate::catalog::{CostTier, LatencyTier, ModelCatalog, ModelDescriptor};
use crate::types::{Analysis, ComplexityLevel, IntentType, LatencyTolerance};

/// Tunables for the selection rule. Defaults match the reference design.
#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    pub low_min_strength: f64,
    pub medium_min_strength: f64,
    pub high_min_strength: f64,
    pub compliance_bonus: f64,
    pub diversity_top_n: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            low_min_strength: 2.2,
            medium_min_strength: 2.8,
            high_min_strength: 4.0,
            compliance_bonus: 0.6,
            diversity_top_n: 5,
        }
    }
}

/// Diagnostic trail for a selection. Never consulted for control flow —
/// logging and the `/query` response's diagnostic field only.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionDebug {
    pub intent: String,
    pub complexity_level: String,
    pub latency_tolerance: String,
    pub compliance_needed: bool,
    pub required_strength: f64,
    pub candidates: usize,
    pub chosen_cost_tier: String,
    pub chosen_latency_tier: String,
    pub chosen_strength: f64,
}

pub struct ModelRouter {
    catalog: ModelCatalog,
    config: RouterConfig,
}

fn normalize_intent(intent: IntentType) -> &'static str {
    match intent {
        IntentType::Coding => "coding",
        IntentType::Reasoning => "reasoning",
        IntentType::Summarization => "summarization",
        IntentType::DataAnalysis => "reasoning",
        _ => "general",
    }
}

fn cost_rank(tier: CostTier) -> u8 {
    match tier {
        CostTier::VeryLow => 0,
        CostTier::Low => 1,
        CostTier::Medium => 2,
        CostTier::MediumHigh => 3,
        CostTier::High => 4,
    }
}

fn latency_rank(tier: LatencyTier) -> u8 {
    match tier {
        LatencyTier::Low => 0,
        LatencyTier::Medium => 1,
        LatencyTier::High => 2,
    }
}

fn provider_preference_boost(
    model: &ModelDescriptor,
    intent: &str,
    complexity: ComplexityLevel,
) -> f64 {
    let name = model.name;
    let provider = model.provider;
    let mut boost = 0.0;

    if intent == "reasoning" && provider == "deepseek" && name.contains("reasoner") {
        boost += 0.2;
    }
    if intent == "coding"
        && provider == "deepseek"
        && name.contains("chat")
        && matches!(complexity, ComplexityLevel::Low | ComplexityLevel::Medium)
    {
        boost += 0.15;
    }
    if intent == "summarization" && provider == "anthropic" && name.contains("haiku") {
        boost += 0.15;
    }
    if intent == "coding"
        && provider == "google"
        && name.contains("flash")
        && complexity != ComplexityLevel::High
    {
        boost += 0.1;
    }
    if provider == "xai"
        && name.contains("mini")
        && matches!(complexity, ComplexityLevel::Low | ComplexityLevel::Medium)
    {
        boost += 0.08;
    }
    boost
}

impl ModelRouter {
    pub fn new(catalog: ModelCatalog, config: RouterConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Select exactly one catalog model for this request's analysis.
    /// Never fails: the catalog is non-empty by construction.
    pub fn select(&self, analysis: &Analysis) -> (String, SelectionDebug) {
        let intent = normalize_intent(analysis.intent_type);
        let complexity = analysis.complexity_level;

        let mut required = match complexity {
            ComplexityLevel::Low => self.config.low_min_strength,
            ComplexityLevel::Medium => self.config.medium_min_strength,
            ComplexityLevel::High => self.config.high_min_strength,
        };
        if analysis.compliance_needed {
            required += self.config.compliance_bonus;
        }
        if analysis.latency_tolerance == LatencyTolerance::Low
            && matches!(complexity, ComplexityLevel::Medium | ComplexityLevel::High)
        {
            required += 0.2;
        }

        let models = self.catalog.models();
        let mut candidates: Vec<&ModelDescriptor> = models
            .iter()
            .filter(|m| m.strength.for_intent(intent) >= required)
            .collect();

        if candidates.is_empty() {
            let mut by_strength: Vec<&ModelDescriptor> = models.iter().collect();
            by_strength.sort_by(|a, b| {
                b.strength
                    .for_intent(intent)
                    .partial_cmp(&a.strength.for_intent(intent))
                    .unwrap()
            });
            candidates = by_strength.into_iter().take(5).collect();
        }

        let candidate_count = candidates.len();

        let mut ranked: Vec<&ModelDescriptor> = candidates;
        ranked.sort_by(|a, b| {
            let key_a = (
                cost_rank(a.cost_tier),
                latency_rank(a.latency_tier),
                -a.strength.for_intent(intent),
                -provider_preference_boost(a, intent, complexity),
            );
            let key_b = (
                cost_rank(b.cost_tier),
                latency_rank(b.latency_tier),
                -b.strength.for_intent(intent),
                -provider_preference_boost(b, intent, complexity),
            );
            key_a.partial_cmp(&key_b).unwrap()
        });

        let top_n = self.config.diversity_top_n.max(1);
        let top: Vec<&ModelDescriptor> = ranked.into_iter().take(top_n).collect();

        let key = format!(
            "{intent}|{:?}|{:?}|{}",
            complexity, analysis.latency_tolerance, analysis.compliance_needed as u8
        );
        let idx = key.bytes().map(|b| b as usize).sum::<usize>() % top.len();
        let chosen = top[idx];

        let debug = SelectionDebug {
            intent: intent.to_string(),
            complexity_level: format!("{complexity:?}").to_lowercase(),
            latency_tolerance: format!("{:?}", analysis.latency_tolerance).to_lowercase(),
            compliance_needed: analysis.compliance_needed,
            required_strength: (required * 100.0).round() / 100.0,
            candidates: candidate_count,
            chosen_cost_tier: format!("{:?}", chosen.cost_tier),
            chosen_latency_tier: format!("{:?}", chosen.latency_tier),
            chosen_strength: chosen.strength.for_intent(intent),
        };

        (chosen.name.to_string(), debug)
    }
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::new(ModelCatalog::default(), RouterConfig::default())
    }
}
