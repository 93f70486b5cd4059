//! Unified error type for LLM/embedding clients.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    /// The config names a different provider than the client expects.
    #[error("invalid provider for this client")]
    InvalidProvider,

    /// Invalid endpoint (empty or missing http/https scheme).
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The provider requires an API key and none was configured.
    #[error("missing api key for {0}")]
    MissingApiKey(&'static str),

    /// Transport/HTTP client error.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-successful HTTP status from upstream.
    #[error("unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        snippet: String,
    },

    /// Unexpected/invalid JSON response.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The response carried no usable content.
    #[error("empty response from provider")]
    Empty,

    /// Embedding dimension differs from the configured one.
    #[error("vector size mismatch: got={got}, want={want}")]
    VectorSizeMismatch { got: usize, want: usize },
}

impl LlmError {
    /// Whether a retry with backoff is worthwhile: timeouts, connect
    /// failures, 429 and 5xx are transient; validation-shaped errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            LlmError::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

/// Cap response-body snippets carried inside errors.
pub(crate) fn make_snippet(text: &str) -> String {
    text.chars().take(240).collect()
}
