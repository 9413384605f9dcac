//! Core request/response data types shared by the cache, router, and batcher.

use serde::{Deserialize, Serialize};

/// Recognized intent categories. Anything the upstream preprocessor doesn't
/// recognize maps to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Reasoning,
    Summarization,
    Coding,
    DataAnalysis,
    CreativeWriting,
    FactualAnswering,
    Conversation,
    Classification,
    Other,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLength {
    Short,
    Medium,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyTolerance {
    Low,
    Medium,
    High,
}

/// Metadata attached to a request by the upstream preprocessor. Read-only
/// to the cache, router, and batcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub intent_type: IntentType,
    pub complexity_level: ComplexityLevel,
    pub expected_output_length: OutputLength,
    pub latency_tolerance: LatencyTolerance,
    pub compliance_needed: bool,
}

impl Default for Analysis {
    fn default() -> Self {
        Self {
            intent_type: IntentType::General,
            complexity_level: ComplexityLevel::Medium,
            expected_output_length: OutputLength::Medium,
            latency_tolerance: LatencyTolerance::Medium,
            compliance_needed: false,
        }
    }
}

/// An immutable, fully-formed request entering the core. Never mutated
/// after construction.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub request_id: String,
    pub created_at_ms: i64,
    pub query_text: String,
    pub analysis: Analysis,
    pub input_token_count: u32,
    pub user_id: Option<String>,
    /// Caller-supplied override for the LLM call's output budget; falls
    /// back to a value derived from `analysis.expected_output_length`.
    pub max_tokens: Option<u32>,
    /// Caller-supplied sampling temperature; falls back to 0.7.
    pub temperature: Option<f64>,
}

/// Reason a batch was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Size,
    Tokens,
    Time,
    Force,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::Size => "size",
            CloseReason::Tokens => "tokens",
            CloseReason::Time => "time",
            CloseReason::Force => "force",
        }
    }
}

/// A request admitted into a batch. Carries the fields the batcher needs
/// independent of the original `GatewayRequest`.
#[derive(Debug, Clone)]
pub struct BatchedRequest {
    pub request_id: String,
    pub created_at_ms: i64,
    pub query_text: String,
    pub analysis: Analysis,
    pub token_count: u32,
    pub selected_model: String,
    pub user_id: Option<String>,
}

/// A batch of requests destined for a single model, open or closed.
#[derive(Debug, Clone)]
pub struct Batch {
    pub batch_id: String,
    pub model_name: String,
    pub created_at_ms: i64,
    pub closed_at_ms: Option<i64>,
    pub close_reason: Option<CloseReason>,
    pub requests: Vec<BatchedRequest>,
    pub total_input_tokens: u64,
    pub total_effective_tokens: u64,
}

impl Batch {
    pub fn size(&self) -> usize {
        self.requests.len()
    }

    pub fn max_wait_ms(&self) -> i64 {
        match self.closed_at_ms {
            Some(closed) => (closed - self.created_at_ms).max(0),
            None => 0,
        }
    }
}

/// Monotonically-updated global cache counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheMetrics {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub tokens_used: u64,
    pub tokens_saved: u64,
    pub cost_total: f64,
    pub cost_saved: f64,
    pub cache_size: usize,
    pub evictions: u64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_requests as f64
        }
    }

    pub fn cost_reduction_percent(&self) -> f64 {
        let potential = self.cost_total + self.cost_saved;
        if potential == 0.0 {
            0.0
        } else {
            (self.cost_saved / potential) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_is_zero_with_no_requests() {
        let metrics = CacheMetrics::default();
        assert_eq!(metrics.hit_rate(), 0.0);
    }

    #[test]
    fn hit_rate_divides_hits_by_requests() {
        let metrics = CacheMetrics {
            total_requests: 10,
            cache_hits: 4,
            ..Default::default()
        };
        assert_eq!(metrics.hit_rate(), 0.4);
    }

    #[test]
    fn cost_reduction_is_zero_with_no_spend() {
        let metrics = CacheMetrics::default();
        assert_eq!(metrics.cost_reduction_percent(), 0.0);
    }

    #[test]
    fn cost_reduction_percent_matches_saved_share() {
        let metrics = CacheMetrics {
            cost_total: 3.0,
            cost_saved: 1.0,
            ..Default::default()
        };
        assert_eq!(metrics.cost_reduction_percent(), 25.0);
    }
}
