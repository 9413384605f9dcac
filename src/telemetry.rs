//! Telemetry metric name constants.
//!
//! Centralised metric names for gateway operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `gateway_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `model` — catalog model name selected for a request
//! - `reason` — batch close reason: "size" | "tokens" | "time" | "force"
//! - `status` — outcome: "hit" or "miss"

/// Total requests handled by `/query`.
pub const REQUESTS_TOTAL: &str = "gateway_requests_total";

/// Request latency in seconds, end to end.
pub const REQUEST_DURATION_SECONDS: &str = "gateway_request_duration_seconds";

/// Total cache hits.
pub const CACHE_HITS_TOTAL: &str = "gateway_cache_hits_total";

/// Total cache misses.
pub const CACHE_MISSES_TOTAL: &str = "gateway_cache_misses_total";

/// Total cache evictions.
pub const CACHE_EVICTIONS_TOTAL: &str = "gateway_cache_evictions_total";

/// Total background optimizer runs that changed a threshold.
pub const OPTIMIZER_ADJUSTMENTS_TOTAL: &str = "gateway_optimizer_adjustments_total";

/// Total router selections.
///
/// Labels: `model`.
pub const ROUTER_SELECTIONS_TOTAL: &str = "gateway_router_selections_total";

/// Total batches closed.
///
/// Labels: `model`, `reason`.
pub const BATCH_CLOSES_TOTAL: &str = "gateway_batch_closes_total";
