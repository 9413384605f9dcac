//! External collaborator contracts: embedding and text generation.
//!
//! The gateway core never talks to a vendor API directly. It calls these
//! traits, and a binary or integration test supplies the implementation
//! (an HTTP client against a real provider, or a mock for testing).

use async_trait::async_trait;

use crate::cache::entry::normalize;
use crate::Result;

/// Produces a unit-norm embedding vector for a query string.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, query: &str) -> Result<Vec<f32>>;
}

/// Text generation output: the response text plus token accounting the
/// cache and cost calculator depend on.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Generates a response for a prompt against a named model.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<Generation>;
}

/// Normalizes query text before embedding: lowercase, trimmed, internal
/// whitespace collapsed to single spaces. Embedding providers should call
/// this so that two queries differing only in casing/spacing land at the
/// same vector.
pub fn normalize_query_text(text: &str) -> String {
    text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Post-process a raw provider embedding into the unit-norm form the cache
/// requires.
pub fn finalize_embedding(raw: Vec<f32>) -> Vec<f32> {
    normalize(raw)
}

/// Google Generative Language API client, matching the embedding and
/// generation contracts the gateway expects. One `reqwest::Client` is
/// shared across calls.
#[cfg(feature = "http")]
pub mod gemini {
    use super::*;
    use serde_json::json;

    const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

    pub struct GeminiClient {
        http: reqwest::Client,
        api_key: String,
        embedding_model: String,
    }

    impl GeminiClient {
        pub fn new(api_key: String, embedding_model: String) -> Self {
            Self { http: reqwest::Client::new(), api_key, embedding_model }
        }

        fn transient_err(message: impl Into<String>) -> crate::GatewayError {
            crate::GatewayError::Embedding {
                message: message.into(),
                transient: true,
                retry_after: None,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for GeminiClient {
        async fn embed(&self, query: &str) -> Result<Vec<f32>> {
            let normalized = normalize_query_text(query);
            let url = format!(
                "{API_BASE}/{}:embedContent?key={}",
                self.embedding_model, self.api_key
            );
            let body = json!({
                "model": self.embedding_model,
                "content": { "parts": [{ "text": normalized }] },
                "taskType": "RETRIEVAL_QUERY",
            });

            let resp = self.http.post(&url).json(&body).send().await.map_err(|e| {
                Self::transient_err(format!("embedding request failed: {e}"))
            })?;
            if !resp.status().is_success() {
                let status = resp.status();
                return Err(crate::GatewayError::Embedding {
                    message: format!("embedding API returned {status}"),
                    transient: status.is_server_error() || status.as_u16() == 429,
                    retry_after: None,
                });
            }

            let parsed: serde_json::Value = resp.json().await.map_err(|e| {
                Self::transient_err(format!("malformed embedding response: {e}"))
            })?;
            let values = parsed["embedding"]["values"]
                .as_array()
                .ok_or_else(|| Self::transient_err("embedding response missing values"))?;
            let raw: Vec<f32> = values.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect();
            Ok(finalize_embedding(raw))
        }
    }

    #[async_trait]
    impl LlmProvider for GeminiClient {
        async fn generate(
            &self,
            model: &str,
            prompt: &str,
            max_tokens: u32,
            temperature: f64,
        ) -> Result<Generation> {
            let url = format!("{API_BASE}/{model}:generateContent?key={}", self.api_key);
            let body = json!({
                "contents": [{ "parts": [{ "text": prompt }] }],
                "generationConfig": {
                    "maxOutputTokens": max_tokens,
                    "temperature": temperature,
                },
            });

            let resp = self.http.post(&url).json(&body).send().await.map_err(|e| {
                crate::GatewayError::Llm { message: format!("generation request failed: {e}"), transient: true, retry_after: None }
            })?;
            if !resp.status().is_success() {
                let status = resp.status();
                return Err(crate::GatewayError::Llm {
                    message: format!("generation API returned {status}"),
                    transient: status.is_server_error() || status.as_u16() == 429,
                    retry_after: None,
                });
            }

            let parsed: serde_json::Value = resp.json().await.map_err(|e| {
                crate::GatewayError::Llm { message: format!("malformed generation response: {e}"), transient: false, retry_after: None }
            })?;

            let text = parsed["candidates"][0]["content"]["parts"][0]["text"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let input_tokens = parsed["usageMetadata"]["promptTokenCount"].as_u64().unwrap_or(0);
            let output_tokens = parsed["usageMetadata"]["candidatesTokenCount"].as_u64().unwrap_or(0);

            Ok(Generation { text, input_tokens, output_tokens })
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// Deterministic stand-in embedding provider: hashes the normalized
    /// query into a low-dimensional vector, so identical text always maps
    /// to the same point and distinct text reliably differs.
    pub struct DeterministicEmbeddingProvider {
        pub dimension: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for DeterministicEmbeddingProvider {
        async fn embed(&self, query: &str) -> Result<Vec<f32>> {
            let normalized = normalize_query_text(query);
            let mut raw = vec![0f32; self.dimension];
            for (i, byte) in normalized.bytes().enumerate() {
                raw[i % self.dimension] += byte as f32;
            }
            if raw.iter().all(|x| *x == 0.0) {
                raw[0] = 1.0;
            }
            Ok(finalize_embedding(raw))
        }
    }

    /// Canned-response LLM provider for tests: returns a fixed answer and
    /// a token count proportional to the prompt length.
    pub struct EchoLlmProvider {
        calls: AtomicU64,
        responses: Mutex<Vec<String>>,
    }

    impl EchoLlmProvider {
        pub fn new() -> Self {
            Self { calls: AtomicU64::new(0), responses: Mutex::new(Vec::new()) }
        }

        pub fn call_count(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Default for EchoLlmProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl LlmProvider for EchoLlmProvider {
        async fn generate(
            &self,
            _model: &str,
            prompt: &str,
            max_tokens: u32,
            _temperature: f64,
        ) -> Result<Generation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let text = format!("echo: {prompt}");
            self.responses.lock().unwrap().push(text.clone());
            let input_tokens = (prompt.len() / 4).max(1) as u64;
            let output_tokens = (text.len() / 4).max(1).min(max_tokens as usize) as u64;
            Ok(Generation { text, input_tokens, output_tokens })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_query_text_collapses_whitespace_and_case() {
        assert_eq!(normalize_query_text("  Hello   WORLD  "), "hello world");
    }

    #[tokio::test]
    async fn deterministic_provider_is_stable_across_calls() {
        let provider = mock::DeterministicEmbeddingProvider { dimension: 8 };
        let a = provider.embed("what is rust").await.unwrap();
        let b = provider.embed("What Is Rust").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn echo_provider_counts_calls() {
        let provider = mock::EchoLlmProvider::new();
        provider.generate("m", "hi", 100, 0.7).await.unwrap();
        provider.generate("m", "hi again", 100, 0.7).await.unwrap();
        assert_eq!(provider.call_count(), 2);
    }
}
