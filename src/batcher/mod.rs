//! Per-model online batcher.
//!
//! Groups requests targeting the same model into bounded batches, closing
//! each as soon as a size, token-budget, or deadline trigger fires. State
//! mutation is a single short critical section; the only suspension points
//! live outside the batcher, in embedding/LLM I/O.

pub mod policy;

use std::collections::HashMap;

use crate::catalog::ModelCatalog;
use crate::types::{Batch, BatchedRequest, CloseReason};

pub use policy::{effective_tokens, policy_for_model, AdaptiveBatchingConfig, BatchingPolicy};

pub struct ModelWiseBatcher {
    catalog: ModelCatalog,
    cfg: AdaptiveBatchingConfig,
    open: HashMap<String, Batch>,
    next_batch_num: u64,
}

impl ModelWiseBatcher {
    pub fn new(catalog: ModelCatalog, cfg: AdaptiveBatchingConfig) -> Self {
        Self { catalog, cfg, open: HashMap::new(), next_batch_num: 1 }
    }

    fn new_batch(&mut self, model_name: &str, created_at_ms: i64) -> Batch {
        let batch_id = format!("batch-{}", self.next_batch_num);
        self.next_batch_num += 1;
        Batch {
            batch_id,
            model_name: model_name.to_string(),
            created_at_ms,
            closed_at_ms: None,
            close_reason: None,
            requests: Vec::new(),
            total_input_tokens: 0,
            total_effective_tokens: 0,
        }
    }

    /// Policy for an open batch, derived from its first request — a stable
    /// choice so policy doesn't shift mid-batch as later requests arrive.
    fn policy_for_open_batch(&self, batch: &Batch) -> BatchingPolicy {
        match batch.requests.first() {
            Some(first) => policy_for_model(&self.catalog, &first.selected_model, &first.analysis, &self.cfg),
            None => BatchingPolicy {
                max_wait_ms: self.cfg.base_wait_ms,
                max_batch_size: self.cfg.default_max_batch_size,
                max_batch_tokens: self.cfg.default_max_batch_tokens,
            },
        }
    }

    /// Close any open batch whose age has reached its wait bound.
    pub fn flush_due(&mut self, now_ms: i64) -> Vec<Batch> {
        let mut closed = Vec::new();
        let models: Vec<String> = self.open.keys().cloned().collect();
        for model in models {
            let Some(batch) = self.open.get(&model) else { continue };
            if batch.requests.is_empty() {
                continue;
            }
            let pol = self.policy_for_open_batch(batch);
            if now_ms - batch.created_at_ms >= pol.max_wait_ms {
                let mut batch = self.open.remove(&model).unwrap();
                batch.closed_at_ms = Some(now_ms);
                batch.close_reason = Some(CloseReason::Time);
                closed.push(batch);
            }
        }
        closed
    }

    /// Force-close every non-empty open batch.
    pub fn flush_all(&mut self, now_ms: i64) -> Vec<Batch> {
        let mut closed = Vec::new();
        for (_, mut batch) in self.open.drain() {
            if !batch.requests.is_empty() {
                batch.closed_at_ms = Some(now_ms);
                if batch.close_reason.is_none() {
                    batch.close_reason = Some(CloseReason::Force);
                }
                closed.push(batch);
            }
        }
        closed
    }

    /// Add a request, returning any batches closed as a side effect (due to
    /// aging out, or because this admission didn't fit and triggered a
    /// close-and-reopen, or because this admission exactly filled the
    /// batch).
    pub fn add(&mut self, request: BatchedRequest, now_ms: i64) -> Vec<Batch> {
        let mut closed = self.flush_due(now_ms);

        let model = request.selected_model.clone();
        if !self.open.contains_key(&model) {
            let batch = self.new_batch(&model, now_ms);
            self.open.insert(model.clone(), batch);
        }

        let pol = policy_for_model(&self.catalog, &request.selected_model, &request.analysis, &self.cfg);
        let eff_tokens = effective_tokens(request.token_count, &request.analysis);

        {
            let batch = self.open.get(&model).unwrap();
            let would_exceed_size = batch.size() + 1 > pol.max_batch_size;
            let would_exceed_tokens =
                batch.total_effective_tokens + eff_tokens as u64 > pol.max_batch_tokens as u64;

            if batch.size() > 0 && (would_exceed_size || would_exceed_tokens) {
                let mut finished = self.open.remove(&model).unwrap();
                finished.closed_at_ms = Some(now_ms);
                finished.close_reason =
                    Some(if would_exceed_size { CloseReason::Size } else { CloseReason::Tokens });
                closed.push(finished);

                let fresh = self.new_batch(&model, now_ms);
                self.open.insert(model.clone(), fresh);
            }
        }

        let batch = self.open.get_mut(&model).unwrap();
        batch.total_input_tokens += request.token_count as u64;
        batch.total_effective_tokens += eff_tokens as u64;
        batch.requests.push(request);

        if batch.size() >= pol.max_batch_size {
            let mut finished = self.open.remove(&model).unwrap();
            finished.closed_at_ms = Some(now_ms);
            finished.close_reason = Some(CloseReason::Size);
            closed.push(finished);
        } else if batch.total_effective_tokens >= pol.max_batch_tokens as u64 {
            let mut finished = self.open.remove(&model).unwrap();
            finished.closed_at_ms = Some(now_ms);
            finished.close_reason = Some(CloseReason::Tokens);
            closed.push(finished);
        }

        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Analysis, ComplexityLevel, IntentType, LatencyTolerance, OutputLength};

    fn request(id: &str, model: &str, tokens: u32, created_at_ms: i64) -> BatchedRequest {
        BatchedRequest {
            request_id: id.to_string(),
            created_at_ms,
            query_text: "hello".to_string(),
            analysis: Analysis {
                intent_type: IntentType::General,
                complexity_level: ComplexityLevel::Medium,
                expected_output_length: OutputLength::Medium,
                latency_tolerance: LatencyTolerance::Medium,
                compliance_needed: false,
            },
            token_count: tokens,
            selected_model: model.to_string(),
            user_id: None,
        }
    }

    fn batcher() -> ModelWiseBatcher {
        ModelWiseBatcher::new(ModelCatalog::default(), AdaptiveBatchingConfig::default())
    }

    #[test]
    fn size_close_with_two_arrivals() {
        let mut cfg = AdaptiveBatchingConfig::default();
        cfg.default_max_batch_size = 2;
        let mut b = ModelWiseBatcher::new(ModelCatalog::default(), cfg);

        let closed = b.add(request("r1", "gpt-4o", 10, 0), 0);
        assert!(closed.is_empty());
        let closed = b.add(request("r2", "gpt-4o", 10, 5), 5);
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].close_reason, Some(CloseReason::Size));
        assert_eq!(closed[0].closed_at_ms, Some(5));
        assert_eq!(closed[0].requests.len(), 2);
    }

    #[test]
    fn time_close_via_flush_due() {
        let mut b = batcher();
        b.add(request("r1", "gpt-4o", 10, 0), 0);
        let closed = b.flush_due(79);
        assert!(closed.is_empty(), "must not close one ms before the wait bound");
        let closed = b.flush_due(80);
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].close_reason, Some(CloseReason::Time));
        assert_eq!(closed[0].requests.len(), 1);
    }

    #[test]
    fn requests_for_a_model_stay_in_arrival_order() {
        let mut b = batcher();
        for i in 0..5 {
            b.add(request(&format!("r{i}"), "gpt-4o", 10, i as i64), i as i64);
        }
        let closed = b.flush_all(100);
        assert_eq!(closed.len(), 1);
        let ids: Vec<&str> = closed[0].requests.iter().map(|r| r.request_id.as_str()).collect();
        assert_eq!(ids, vec!["r0", "r1", "r2", "r3", "r4"]);
    }

    #[test]
    fn force_close_tags_reason_force() {
        let mut b = batcher();
        b.add(request("r1", "gpt-4o", 10, 0), 0);
        let closed = b.flush_all(10);
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].close_reason, Some(CloseReason::Force));
    }

    #[test]
    fn exact_token_fill_closes_with_tokens_reason() {
        let mut cfg = AdaptiveBatchingConfig::default();
        cfg.default_max_batch_tokens = 100;
        cfg.default_max_batch_size = 1000;
        let mut b = ModelWiseBatcher::new(ModelCatalog::default(), cfg);
        // expected_output_length=medium => factor 0.6 => effective = round(token*1.6).
        // token_count=63 => effective = round(100.8) = 101 >= 100, closes exactly at this admission.
        let closed = b.add(request("r1", "gpt-4o", 63, 0), 0);
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].close_reason, Some(CloseReason::Tokens));
    }

    #[test]
    fn each_model_gets_its_own_open_batch() {
        let mut b = batcher();
        b.add(request("r1", "gpt-4o", 10, 0), 0);
        b.add(request("r2", "claude-3-opus", 10, 0), 0);
        let closed = b.flush_all(1);
        assert_eq!(closed.len(), 2);
    }
}
