//! Static model catalog consulted by the router and the batcher's policy
//! tuning. Immutable after construction; no synchronization needed.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CostTier {
    VeryLow,
    Low,
    Medium,
    MediumHigh,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyTier {
    Low,
    Medium,
    High,
}

/// Per-intent capability strengths, on a 0.0-5.0 scale.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrengthMap {
    pub coding: f64,
    pub reasoning: f64,
    pub summarization: f64,
    pub general: f64,
}

impl StrengthMap {
    /// Strength for a normalized intent name, falling back to `general`,
    /// falling back to 0.0 if even `general` is unset.
    pub fn for_intent(&self, intent: &str) -> f64 {
        match intent {
            "coding" => self.coding,
            "reasoning" => self.reasoning,
            "summarization" => self.summarization,
            _ => self.general,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    pub name: &'static str,
    pub provider: &'static str,
    pub family: &'static str,
    pub cost_tier: CostTier,
    pub latency_tier: LatencyTier,
    pub context_window: u32,
    pub strength: StrengthMap,
}

/// The built-in reference catalog: fourteen models spanning five providers.
pub fn default_catalog() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor {
            name: "gpt-3.5-turbo",
            provider: "openai",
            family: "chat",
            cost_tier: CostTier::VeryLow,
            latency_tier: LatencyTier::Low,
            context_window: 16_000,
            strength: StrengthMap { coding: 2.0, reasoning: 2.0, summarization: 3.0, general: 3.0 },
        },
        ModelDescriptor {
            name: "gpt-4o-mini",
            provider: "openai",
            family: "chat",
            cost_tier: CostTier::Low,
            latency_tier: LatencyTier::Low,
            context_window: 131_072,
            strength: StrengthMap { coding: 3.0, reasoning: 3.0, summarization: 3.0, general: 3.0 },
        },
        ModelDescriptor {
            name: "gpt-4o",
            provider: "openai",
            family: "chat",
            cost_tier: CostTier::Medium,
            latency_tier: LatencyTier::Medium,
            context_window: 131_072,
            strength: StrengthMap { coding: 4.0, reasoning: 4.0, summarization: 4.0, general: 4.0 },
        },
        ModelDescriptor {
            name: "gpt-4.1",
            provider: "openai",
            family: "chat",
            cost_tier: CostTier::MediumHigh,
            latency_tier: LatencyTier::Medium,
            context_window: 200_000,
            strength: StrengthMap { coding: 5.0, reasoning: 5.0, summarization: 4.0, general: 5.0 },
        },
        ModelDescriptor {
            name: "claude-3-haiku",
            provider: "anthropic",
            family: "chat",
            cost_tier: CostTier::Low,
            latency_tier: LatencyTier::Low,
            context_window: 200_000,
            strength: StrengthMap { coding: 3.0, reasoning: 2.0, summarization: 3.0, general: 3.0 },
        },
        ModelDescriptor {
            name: "claude-3.5-sonnet",
            provider: "anthropic",
            family: "chat",
            cost_tier: CostTier::Medium,
            latency_tier: LatencyTier::Medium,
            context_window: 200_000,
            strength: StrengthMap { coding: 4.0, reasoning: 4.0, summarization: 4.0, general: 4.0 },
        },
        ModelDescriptor {
            name: "claude-3-opus",
            provider: "anthropic",
            family: "chat",
            cost_tier: CostTier::High,
            latency_tier: LatencyTier::Medium,
            context_window: 200_000,
            strength: StrengthMap { coding: 5.0, reasoning: 5.0, summarization: 5.0, general: 5.0 },
        },
        ModelDescriptor {
            name: "models/gemini-1.5-flash",
            provider: "google",
            family: "chat",
            cost_tier: CostTier::Low,
            latency_tier: LatencyTier::Low,
            context_window: 1_000_000,
            strength: StrengthMap { coding: 3.0, reasoning: 3.0, summarization: 3.0, general: 3.0 },
        },
        ModelDescriptor {
            name: "models/gemini-1.5-pro",
            provider: "google",
            family: "chat",
            cost_tier: CostTier::Medium,
            latency_tier: LatencyTier::Medium,
            context_window: 1_000_000,
            strength: StrengthMap { coding: 4.0, reasoning: 4.0, summarization: 4.0, general: 4.0 },
        },
        ModelDescriptor {
            name: "models/gemini-2.5-flash",
            provider: "google",
            family: "chat",
            cost_tier: CostTier::Low,
            latency_tier: LatencyTier::Low,
            context_window: 1_000_000,
            strength: StrengthMap { coding: 3.0, reasoning: 3.0, summarization: 3.0, general: 3.0 },
        },
        ModelDescriptor {
            name: "models/gemini-2.5-pro",
            provider: "google",
            family: "chat",
            cost_tier: CostTier::MediumHigh,
            latency_tier: LatencyTier::Medium,
            context_window: 2_000_000,
            strength: StrengthMap { coding: 4.0, reasoning: 5.0, summarization: 4.0, general: 4.0 },
        },
        ModelDescriptor {
            name: "deepseek-chat",
            provider: "deepseek",
            family: "chat",
            cost_tier: CostTier::VeryLow,
            latency_tier: LatencyTier::Low,
            context_window: 32_000,
            strength: StrengthMap { coding: 2.5, reasoning: 3.0, summarization: 2.5, general: 2.5 },
        },
        ModelDescriptor {
            name: "deepseek-reasoner",
            provider: "deepseek",
            family: "reasoning",
            cost_tier: CostTier::Medium,
            latency_tier: LatencyTier::Medium,
            context_window: 64_000,
            strength: StrengthMap { coding: 3.5, reasoning: 4.5, summarization: 3.0, general: 3.5 },
        },
        ModelDescriptor {
            name: "grok-2-mini",
            provider: "xai",
            family: "chat",
            cost_tier: CostTier::Low,
            latency_tier: LatencyTier::Low,
            context_window: 128_000,
            strength: StrengthMap { coding: 3.0, reasoning: 2.8, summarization: 3.0, general: 3.0 },
        },
        ModelDescriptor {
            name: "grok-2",
            provider: "xai",
            family: "chat",
            cost_tier: CostTier::Medium,
            latency_tier: LatencyTier::Medium,
            context_window: 128_000,
            strength: StrengthMap { coding: 3.8, reasoning: 3.8, summarization: 3.6, general: 3.7 },
        },
    ]
}

/// A catalog handle: the default set, or a caller-supplied one for testing.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<ModelDescriptor>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self { models: default_catalog() }
    }
}

impl ModelCatalog {
    pub fn new(models: Vec<ModelDescriptor>) -> Self {
        Self { models }
    }

    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn get(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_fourteen_models() {
        assert_eq!(default_catalog().len(), 14);
    }

    #[test]
    fn get_finds_model_by_name() {
        let catalog = ModelCatalog::default();
        assert!(catalog.get("gpt-4o").is_some());
        assert!(catalog.get("does-not-exist").is_none());
    }

    #[test]
    fn strength_falls_back_to_general() {
        let strength = StrengthMap { coding: 1.0, reasoning: 2.0, summarization: 3.0, general: 4.0 };
        assert_eq!(strength.for_intent("coding"), 1.0);
        assert_eq!(strength.for_intent("unknown"), 4.0);
    }
}
