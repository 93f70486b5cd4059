//! Batch embedding client with a content-addressed cache and bounded retry.
//!
//! The cache key hashes `(model_id, input)`, so a model switch never serves
//! stale vectors. Lookups always precede remote calls; concurrent writers for
//! the same key resolve last-writer-wins over identical content.

use crate::errors::LlmError;
use futures::future::join_all;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Provider interface for embedding generation. Async because real backends
/// perform HTTP requests.
pub trait EmbeddingsProvider: Send + Sync {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, LlmError>> + Send + 'a>>;

    /// Model identifier, part of every cache key.
    fn model_id(&self) -> &str;
}

/// Knobs for the cached/batched layer.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Expected vector dimension; 0 disables the check.
    pub dimension: usize,
    /// Max in-flight provider calls per batch.
    pub batch_size: usize,
    /// Total attempts per text (first try + retries).
    pub max_attempts: usize,
    /// Base backoff, doubled per retry.
    pub backoff_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: 1536,
            batch_size: 32,
            max_attempts: 3,
            backoff_ms: 200,
        }
    }
}

impl EmbeddingConfig {
    /// Overrides from `EMBEDDING_DIM`, `EMBEDDING_BATCH_SIZE`,
    /// `EMBEDDING_MAX_ATTEMPTS`, `EMBEDDING_BACKOFF_MS`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_usize("EMBEDDING_DIM") {
            cfg.dimension = v;
        }
        if let Some(v) = env_usize("EMBEDDING_BATCH_SIZE") {
            cfg.batch_size = v.max(1);
        }
        if let Some(v) = env_usize("EMBEDDING_MAX_ATTEMPTS") {
            cfg.max_attempts = v.max(1);
        }
        if let Some(v) = env_usize("EMBEDDING_BACKOFF_MS") {
            cfg.backoff_ms = v as u64;
        }
        cfg
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Caching, batching, retrying front for an [`EmbeddingsProvider`].
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingsProvider>,
    cfg: EmbeddingConfig,
    cache: RwLock<HashMap<String, Arc<Vec<f32>>>>,
}

impl EmbeddingClient {
    pub fn new(provider: Arc<dyn EmbeddingsProvider>, cfg: EmbeddingConfig) -> Self {
        Self {
            provider,
            cfg,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn dimension(&self) -> usize {
        self.cfg.dimension
    }

    /// Embed one text: cache first, then remote with bounded backoff.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let key = self.cache_key(text);
        if let Some(hit) = self.cache.read().await.get(&key) {
            debug!(key = %&key[..12], "embedding cache hit");
            return Ok(hit.as_ref().clone());
        }

        let vector = self.embed_remote(text).await?;
        self.cache
            .write()
            .await
            .insert(key, Arc::new(vector.clone()));
        Ok(vector)
    }

    /// Embed many texts, preserving input order. Each element carries its own
    /// outcome so callers can skip failed units while keeping the rest.
    pub async fn embed_batch(&self, texts: &[String]) -> Vec<Result<Vec<f32>, LlmError>> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.cfg.batch_size.max(1)) {
            let results = join_all(chunk.iter().map(|t| self.embed(t))).await;
            out.extend(results);
        }
        out
    }

    async fn embed_remote(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let mut delay = Duration::from_millis(self.cfg.backoff_ms);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.provider.embed(text).await {
                Ok(v) => {
                    if self.cfg.dimension > 0 && v.len() != self.cfg.dimension {
                        return Err(LlmError::VectorSizeMismatch {
                            got: v.len(),
                            want: self.cfg.dimension,
                        });
                    }
                    return Ok(v);
                }
                Err(err) if err.is_transient() && attempt < self.cfg.max_attempts => {
                    warn!(attempt, error = %err, "transient embedding failure, backing off");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn cache_key(&self, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.provider.model_id().as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic fake: vector derived from the text, call count tracked.
    struct FakeProvider {
        calls: AtomicUsize,
        fail_first: usize,
    }

    impl FakeProvider {
        fn new(fail_first: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first,
            }
        }
    }

    impl EmbeddingsProvider for FakeProvider {
        fn embed<'a>(
            &'a self,
            text: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, LlmError>> + Send + 'a>> {
            Box::pin(async move {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                if n < self.fail_first {
                    return Err(LlmError::HttpStatus {
                        status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                        url: "http://fake".into(),
                        snippet: String::new(),
                    });
                }
                let mut v = vec![0.0f32; 4];
                for (i, b) in text.bytes().enumerate() {
                    v[i % 4] += b as f32;
                }
                Ok(v)
            })
        }

        fn model_id(&self) -> &str {
            "fake-embed"
        }
    }

    fn client(fail_first: usize) -> (Arc<FakeProvider>, EmbeddingClient) {
        let provider = Arc::new(FakeProvider::new(fail_first));
        let cfg = EmbeddingConfig {
            dimension: 4,
            batch_size: 2,
            max_attempts: 3,
            backoff_ms: 1,
        };
        (provider.clone(), EmbeddingClient::new(provider, cfg))
    }

    #[tokio::test]
    async fn cache_prevents_repeat_remote_calls() {
        let (provider, client) = client(0);
        let a = client.embed("hello").await.expect("embed");
        let b = client.embed("hello").await.expect("embed");
        assert_eq!(a, b);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let (_, client) = client(0);
        let texts: Vec<String> = ["one", "two", "three", "four", "five"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let results = client.embed_batch(&texts).await;
        assert_eq!(results.len(), texts.len());
        for (text, res) in texts.iter().zip(&results) {
            let direct = client.embed(text).await.expect("embed");
            assert_eq!(res.as_ref().expect("batch ok"), &direct);
        }
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let (provider, client) = client(2);
        let v = client.embed("retry me").await.expect("succeeds on 3rd try");
        assert_eq!(v.len(), 4);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_the_error() {
        let (provider, client) = client(10);
        let err = client.embed("never works").await.expect_err("fails");
        assert!(err.is_transient());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3, "bounded attempts");
    }

    #[tokio::test]
    async fn dimension_mismatch_is_permanent() {
        let provider = Arc::new(FakeProvider::new(0));
        let cfg = EmbeddingConfig {
            dimension: 8,
            ..EmbeddingConfig::default()
        };
        let client = EmbeddingClient::new(provider, cfg);
        let err = client.embed("x").await.expect_err("mismatch");
        assert!(matches!(err, LlmError::VectorSizeMismatch { got: 4, want: 8 }));
    }
}
