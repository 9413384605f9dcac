//! Adaptive LLM request gateway.
//!
//! Three cooperating subsystems sit in front of an LLM provider:
//!
//! - an adaptive semantic [`cache`] that answers repeat-ish queries without
//!   a model call,
//! - a cost-first [`router`] that picks the cheapest catalog model meeting
//!   a request's capability threshold,
//! - a per-model online [`batcher`] that groups concurrent requests bound
//!   for the same model.
//!
//! [`handler::Gateway`] wires the three together into the single request
//! path; the optional `http` feature exposes them over a JSON REST API.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use adaptive_llm_gateway::config::GatewayConfig;
//! use adaptive_llm_gateway::handler::Gateway;
//! use adaptive_llm_gateway::providers::mock::{DeterministicEmbeddingProvider, EchoLlmProvider};
//! use adaptive_llm_gateway::types::{Analysis, GatewayRequest};
//!
//! #[tokio::main]
//! async fn main() -> adaptive_llm_gateway::Result<()> {
//!     let gateway = Gateway::new(
//!         GatewayConfig::default(),
//!         Arc::new(DeterministicEmbeddingProvider { dimension: 768 }),
//!         Arc::new(EchoLlmProvider::new()),
//!     );
//!
//!     let response = gateway
//!         .handle_query(GatewayRequest {
//!             request_id: "req-1".to_string(),
//!             created_at_ms: 0,
//!             query_text: "what is the capital of france".to_string(),
//!             analysis: Analysis::default(),
//!             input_token_count: 8,
//!             user_id: None,
//!             max_tokens: None,
//!             temperature: None,
//!         })
//!         .await?;
//!
//!     println!("{}", response.response_text);
//!     Ok(())
//! }
//! ```

pub mod batcher;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod handler;
#[cfg(feature = "http")]
pub mod http;
pub mod providers;
pub mod router;
pub mod telemetry;
pub mod types;
pub mod version;

pub use error::{GatewayError, Result};
pub use handler::Gateway;
