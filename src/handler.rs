//! Request orchestration: wires the cache, router, batcher, and optimizer
//! together into the single `/query` code path. Transport-agnostic — the
//! HTTP layer is a thin adapter over this module.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::Mutex;

use crate::batcher::ModelWiseBatcher;
use crate::cache::SemanticCache;
use crate::catalog::ModelCatalog;
use crate::config::{GatewayConfig, LlmConfig};
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::router::ModelRouter;
use crate::types::{Analysis, BatchedRequest, GatewayRequest};
use crate::Result;

/// A completed `/query` response.
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueryResponse {
    pub request_id: String,
    pub response_text: String,
    pub cache_hit: bool,
    pub similarity_score: Option<f64>,
    pub selected_model: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
    pub cost_saved: f64,
}

fn unix_secs_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as i64
}

/// Shared gateway state: one instance backs every request.
pub struct Gateway {
    pub cache: Mutex<SemanticCache>,
    pub router: ModelRouter,
    pub batcher: Mutex<ModelWiseBatcher>,
    pub optimizer: Mutex<crate::cache::optimizer::CacheOptimizer>,
    pub llm_config: LlmConfig,
    pub embedding_provider: Arc<dyn EmbeddingProvider>,
    pub llm_provider: Arc<dyn LlmProvider>,
}

impl Gateway {
    pub fn new(
        config: GatewayConfig,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        llm_provider: Arc<dyn LlmProvider>,
    ) -> Self {
        let catalog = ModelCatalog::default();
        Self {
            cache: Mutex::new(SemanticCache::new(config.cache.clone())),
            router: ModelRouter::new(catalog, crate::router::RouterConfig::default()),
            batcher: Mutex::new(ModelWiseBatcher::new(
                ModelCatalog::default(),
                crate::batcher::AdaptiveBatchingConfig::default(),
            )),
            optimizer: Mutex::new(crate::cache::optimizer::CacheOptimizer::new(config.optimizer.clone())),
            llm_config: config.llm,
            embedding_provider,
            llm_provider,
        }
    }

    /// Run one request through lookup, the miss path (route, batch-admit,
    /// generate, admit into the cache), and the optimizer's periodic check.
    ///
    /// Mirrors the reference ordering exactly: record the request, attempt
    /// the lookup, and on a miss run generation before ever touching the
    /// cache again, so the cache's own request counter drives the
    /// optimizer's trigger regardless of hit/miss outcome.
    pub async fn handle_query(&self, request: GatewayRequest) -> Result<QueryResponse> {
        let started = std::time::Instant::now();
        metrics::counter!(crate::telemetry::REQUESTS_TOTAL).increment(1);

        let normalized_query = crate::providers::normalize_query_text(&request.query_text);
        let embedding = self.embedding_provider.embed(&normalized_query).await?;

        let (hit_idx, similarity, cache_hit) = {
            let mut cache = self.cache.lock().await;
            let result = cache.lookup(&normalized_query, &embedding);
            let similarity = result.similarity;
            let is_hit = result.entry.is_some();
            match is_hit {
                true => (cache.index_of(&normalized_query), similarity, true),
                false => (None, similarity, false),
            }
        };

        let response = if cache_hit {
            let idx = hit_idx.expect("lookup reported a hit without a resolvable index");
            let mut cache = self.cache.lock().await;
            let (response_text, tokens_saved, cost_saved) = {
                let entry = cache.entry(idx);
                (entry.response_text.clone(), entry.input_tokens + entry.output_tokens, entry.cost)
            };
            cache.record_hit(idx, similarity, tokens_saved, cost_saved);
            metrics::counter!(crate::telemetry::CACHE_HITS_TOTAL).increment(1);

            QueryResponse {
                request_id: request.request_id.clone(),
                response_text,
                cache_hit: true,
                similarity_score: Some(similarity),
                selected_model: None,
                input_tokens: 0,
                output_tokens: 0,
                cost: 0.0,
                cost_saved,
            }
        } else {
            metrics::counter!(crate::telemetry::CACHE_MISSES_TOTAL).increment(1);
            let (selected_model, selection_debug) = self.router.select(&request.analysis);
            metrics::counter!(crate::telemetry::ROUTER_SELECTIONS_TOTAL, "model" => selected_model.clone())
                .increment(1);
            tracing::debug!(model = %selected_model, debug = ?selection_debug, "routed request");

            let batched = BatchedRequest {
                request_id: request.request_id.clone(),
                created_at_ms: now_ms(),
                query_text: normalized_query.clone(),
                analysis: request.analysis.clone(),
                token_count: request.input_token_count,
                selected_model: selected_model.clone(),
                user_id: request.user_id.clone(),
            };
            let closed = {
                let mut batcher = self.batcher.lock().await;
                batcher.add(batched, now_ms())
            };
            for batch in &closed {
                metrics::counter!(
                    crate::telemetry::BATCH_CLOSES_TOTAL,
                    "model" => batch.model_name.clone(),
                    "reason" => batch.close_reason.map(|r| r.as_str()).unwrap_or("unknown")
                )
                .increment(1);
            }

            let max_output_tokens = request.max_tokens.unwrap_or_else(|| max_output_tokens_for(&request.analysis));
            let temperature = request.temperature.unwrap_or(0.7);
            let generation = self
                .llm_provider
                .generate(&selected_model, &request.query_text, max_output_tokens, temperature)
                .await?;

            let cost = self.llm_config.calculate_cost(
                &selected_model,
                generation.input_tokens,
                generation.output_tokens,
            );

            let best_similarity = if similarity > 0.0 { Some(similarity) } else { None };
            let mut cache = self.cache.lock().await;
            cache.admit(
                &normalized_query,
                &generation.text,
                embedding,
                generation.input_tokens,
                generation.output_tokens,
                cost,
                best_similarity,
            );
            cache.record_spend(generation.input_tokens + generation.output_tokens, cost);

            QueryResponse {
                request_id: request.request_id.clone(),
                response_text: generation.text,
                cache_hit: false,
                similarity_score: if similarity > 0.0 { Some(similarity) } else { None },
                selected_model: Some(selected_model),
                input_tokens: generation.input_tokens,
                output_tokens: generation.output_tokens,
                cost,
                cost_saved: 0.0,
            }
        };

        self.maybe_optimize().await;
        metrics::histogram!(crate::telemetry::REQUEST_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        Ok(response)
    }

    async fn maybe_optimize(&self) {
        let total_requests = self.cache.lock().await.metrics().total_requests;
        let should = self.optimizer.lock().await.should_optimize(total_requests);
        if should {
            let mut cache = self.cache.lock().await;
            let mut optimizer = self.optimizer.lock().await;
            let result = optimizer.optimize(&mut cache, unix_secs_now());
            tracing::info!(
                optimization_number = result.optimization_number,
                hit_rate = result.current_hit_rate,
                "ran periodic cache optimization"
            );
        }
    }
}

/// Output token budget the LLM call should request, derived from the
/// request's expected output length.
fn max_output_tokens_for(analysis: &Analysis) -> u32 {
    match analysis.expected_output_length {
        crate::types::OutputLength::Short => 256,
        crate::types::OutputLength::Medium => 500,
        crate::types::OutputLength::Long => 1500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::providers::mock::{DeterministicEmbeddingProvider, EchoLlmProvider};
    use crate::types::{ComplexityLevel, IntentType, LatencyTolerance, OutputLength};

    fn gateway() -> Gateway {
        Gateway::new(
            GatewayConfig::default(),
            Arc::new(DeterministicEmbeddingProvider { dimension: 768 }),
            Arc::new(EchoLlmProvider::new()),
        )
    }

    fn request(id: &str, query: &str) -> GatewayRequest {
        GatewayRequest {
            request_id: id.to_string(),
            created_at_ms: now_ms(),
            query_text: query.to_string(),
            analysis: Analysis {
                intent_type: IntentType::General,
                complexity_level: ComplexityLevel::Medium,
                expected_output_length: OutputLength::Medium,
                latency_tolerance: LatencyTolerance::Medium,
                compliance_needed: false,
            },
            input_token_count: 40,
            user_id: None,
            max_tokens: None,
            temperature: None,
        }
    }

    #[tokio::test]
    async fn repeated_query_becomes_a_cache_hit() {
        let gateway = gateway();
        let first = gateway.handle_query(request("r1", "what is the capital of france")).await.unwrap();
        assert!(!first.cache_hit);

        let second = gateway.handle_query(request("r2", "what is the capital of france")).await.unwrap();
        assert!(second.cache_hit);
        assert_eq!(second.response_text, first.response_text);
    }

    #[tokio::test]
    async fn distinct_queries_both_miss() {
        let gateway = gateway();
        let a = gateway.handle_query(request("r1", "tell me about rust")).await.unwrap();
        let b = gateway.handle_query(request("r2", "tell me about the eiffel tower")).await.unwrap();
        assert!(!a.cache_hit);
        assert!(!b.cache_hit);
    }
}
