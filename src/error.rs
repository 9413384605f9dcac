//! Gateway error types

use std::time::Duration;

/// Gateway error types
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// Embedding provider failed. `retry_after` is populated when the
    /// provider encodes a suggested backoff duration.
    #[error("embedding provider error: {message}")]
    Embedding {
        message: String,
        transient: bool,
        retry_after: Option<Duration>,
    },

    /// LLM provider failed.
    #[error("llm provider error: {message}")]
    Llm {
        message: String,
        transient: bool,
        retry_after: Option<Duration>,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("JSON error: {0}")]
    Json(String),

    /// Cache/index state diverged from the entry list. Never expected in
    /// normal operation; surfaced rather than silently corrected.
    #[error("internal invariant violation: {0}")]
    Invariant(String),
}

impl GatewayError {
    /// Whether this error is transient and the caller may retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Embedding { transient, .. } | Self::Llm { transient, .. } => *transient,
            Self::InvalidRequest(_) | Self::Configuration(_) | Self::Json(_) | Self::Invariant(_) => {
                false
            }
        }
    }

    /// Suggested backoff duration, when the failing provider specified one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Embedding { retry_after, .. } | Self::Llm { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Json(err.to_string())
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_error_transience_is_explicit() {
        let transient = GatewayError::Embedding {
            message: "timeout".into(),
            transient: true,
            retry_after: Some(Duration::from_millis(250)),
        };
        assert!(transient.is_transient());
        assert_eq!(transient.retry_after(), Some(Duration::from_millis(250)));

        let fatal = GatewayError::Embedding {
            message: "bad api key".into(),
            transient: false,
            retry_after: None,
        };
        assert!(!fatal.is_transient());
    }

    #[test]
    fn invalid_request_is_never_transient() {
        let err = GatewayError::InvalidRequest("empty query".into());
        assert!(!err.is_transient());
        assert_eq!(err.retry_after(), None);
    }
}
