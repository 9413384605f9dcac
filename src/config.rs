//! Gateway configuration: environment-driven with compiled-in defaults,
//! optionally overridden by a TOML file.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::{GatewayError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dim")]
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dimension: default_embedding_dim(),
        }
    }
}

fn default_embedding_model() -> String {
    "models/embedding-001".to_string()
}

fn default_embedding_dim() -> usize {
    768
}

/// Per-1M-token pricing, in dollars.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pricing {
    pub input_cost_per_1m: f64,
    pub output_cost_per_1m: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_pricing_table")]
    pub pricing: HashMap<String, Pricing>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            pricing: default_pricing_table(),
        }
    }
}

fn default_llm_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_pricing_table() -> HashMap<String, Pricing> {
    let mut table = HashMap::new();
    table.insert(
        default_llm_model(),
        Pricing { input_cost_per_1m: 0.075, output_cost_per_1m: 0.30 },
    );
    table
}

impl LlmConfig {
    /// Cost in dollars for the configured default model, falling back to
    /// the default pricing entry if `model` has no table row.
    pub fn calculate_cost(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        let pricing = self
            .pricing
            .get(model)
            .or_else(|| self.pricing.get(&self.model))
            .copied()
            .unwrap_or(Pricing { input_cost_per_1m: 0.075, output_cost_per_1m: 0.30 });
        (input_tokens as f64 / 1_000_000.0) * pricing.input_cost_per_1m
            + (output_tokens as f64 / 1_000_000.0) * pricing.output_cost_per_1m
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: usize,
    #[serde(default = "default_threshold_short")]
    pub threshold_short: f64,
    #[serde(default = "default_threshold_medium")]
    pub threshold_medium: f64,
    #[serde(default = "default_threshold_long")]
    pub threshold_long: f64,
    #[serde(default = "default_short_query_max_len")]
    pub short_query_max_len: usize,
    #[serde(default = "default_medium_query_max_len")]
    pub medium_query_max_len: usize,
    #[serde(default = "default_min_tokens_to_cache")]
    pub min_tokens_to_cache: u64,
    #[serde(default = "default_max_tokens_to_cache")]
    pub max_tokens_to_cache: u64,
    #[serde(default = "default_min_cost_to_cache")]
    pub min_cost_to_cache: f64,
    #[serde(default = "default_coverage_threshold")]
    pub similarity_coverage_threshold: f64,
    #[serde(default = "default_weight_frequency")]
    pub weight_frequency: f64,
    #[serde(default = "default_weight_recency")]
    pub weight_recency: f64,
    #[serde(default = "default_weight_similarity")]
    pub weight_similarity: f64,
    #[serde(default = "default_weight_tokens_saved")]
    pub weight_tokens_saved: f64,
    #[serde(default = "default_eviction_percentage")]
    pub eviction_percentage: f64,
    #[serde(default = "default_eviction_log_capacity")]
    pub eviction_log_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cache_size: default_max_cache_size(),
            threshold_short: default_threshold_short(),
            threshold_medium: default_threshold_medium(),
            threshold_long: default_threshold_long(),
            short_query_max_len: default_short_query_max_len(),
            medium_query_max_len: default_medium_query_max_len(),
            min_tokens_to_cache: default_min_tokens_to_cache(),
            max_tokens_to_cache: default_max_tokens_to_cache(),
            min_cost_to_cache: default_min_cost_to_cache(),
            similarity_coverage_threshold: default_coverage_threshold(),
            weight_frequency: default_weight_frequency(),
            weight_recency: default_weight_recency(),
            weight_similarity: default_weight_similarity(),
            weight_tokens_saved: default_weight_tokens_saved(),
            eviction_percentage: default_eviction_percentage(),
            eviction_log_capacity: default_eviction_log_capacity(),
        }
    }
}

fn default_max_cache_size() -> usize {
    25
}
fn default_threshold_short() -> f64 {
    0.92
}
fn default_threshold_medium() -> f64 {
    0.88
}
fn default_threshold_long() -> f64 {
    0.84
}
fn default_short_query_max_len() -> usize {
    50
}
fn default_medium_query_max_len() -> usize {
    200
}
fn default_min_tokens_to_cache() -> u64 {
    10
}
fn default_max_tokens_to_cache() -> u64 {
    4000
}
fn default_min_cost_to_cache() -> f64 {
    0.000_001
}
fn default_coverage_threshold() -> f64 {
    0.98
}
fn default_weight_frequency() -> f64 {
    0.35
}
fn default_weight_recency() -> f64 {
    0.20
}
fn default_weight_similarity() -> f64 {
    0.25
}
fn default_weight_tokens_saved() -> f64 {
    0.20
}
fn default_eviction_percentage() -> f64 {
    0.10
}
fn default_eviction_log_capacity() -> usize {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default = "default_optimization_interval")]
    pub optimization_interval: u64,
    #[serde(default = "default_target_hit_rate")]
    pub target_hit_rate: f64,
    #[serde(default = "default_threshold_adjustment_step")]
    pub threshold_adjustment_step: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            optimization_interval: default_optimization_interval(),
            target_hit_rate: default_target_hit_rate(),
            threshold_adjustment_step: default_threshold_adjustment_step(),
        }
    }
}

fn default_optimization_interval() -> u64 {
    50
}
fn default_target_hit_rate() -> f64 {
    0.40
}
fn default_threshold_adjustment_step() -> f64 {
    0.02
}

/// Safety rails the optimizer will never cross, regardless of config.
pub const THRESHOLD_FLOOR: f64 = 0.70;
pub const THRESHOLD_CEILING: f64 = 0.98;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

impl GatewayConfig {
    /// Build configuration from environment variables, falling back to
    /// compiled defaults for anything unset or unparsable. A malformed
    /// numeric env var logs a warning and falls back rather than failing
    /// startup.
    pub fn from_env() -> Self {
        let mut config = GatewayConfig::default();

        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.llm.model = model;
        }
        if let Ok(raw) = std::env::var("MAX_CACHE_SIZE") {
            match raw.parse() {
                Ok(value) => config.cache.max_cache_size = value,
                Err(_) => tracing::warn!(value = %raw, "invalid MAX_CACHE_SIZE, using default"),
            }
        }
        if let Ok(raw) = std::env::var("OPTIMIZATION_INTERVAL") {
            match raw.parse() {
                Ok(value) => config.optimizer.optimization_interval = value,
                Err(_) => {
                    tracing::warn!(value = %raw, "invalid OPTIMIZATION_INTERVAL, using default")
                }
            }
        }

        config
    }

    /// Overlay a TOML config file on top of the current values. Used when
    /// `GATEWAY_CONFIG_PATH` is set.
    pub fn merge_toml_file(mut self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Configuration(format!("failed to read config file {path:?}: {e}"))
        })?;
        let file_config: GatewayConfig = toml_from_str(&content)?;
        self = file_config;
        Ok(self)
    }
}

#[cfg(feature = "http")]
fn toml_from_str(content: &str) -> Result<GatewayConfig> {
    toml::from_str(content)
        .map_err(|e| GatewayError::Configuration(format!("failed to parse config file: {e}")))
}

#[cfg(not(feature = "http"))]
fn toml_from_str(_content: &str) -> Result<GatewayConfig> {
    Err(GatewayError::Configuration(
        "TOML config loading requires the `http` feature".to_string(),
    ))
}
