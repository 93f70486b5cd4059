//! Profile facade: one generation profile, one embedding profile.
//!
//! Construct once, wrap in `Arc`, and pass clones to dependents. Clients are
//! built eagerly so configuration problems surface at startup, not on the
//! first remote call.

use crate::config::{LlmProvider, ModelConfig};
use crate::embedding::EmbeddingsProvider;
use crate::errors::LlmError;
use crate::ollama::OllamaClient;
use crate::openai::OpenAiClient;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;
use tracing::info;

enum ProviderClient {
    Ollama(OllamaClient),
    OpenAi(OpenAiClient),
}

impl ProviderClient {
    fn build(cfg: ModelConfig) -> Result<Self, LlmError> {
        match cfg.provider {
            LlmProvider::Ollama => Ok(Self::Ollama(OllamaClient::new(cfg)?)),
            LlmProvider::OpenAi => Ok(Self::OpenAi(OpenAiClient::new(cfg)?)),
        }
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError> {
        match self {
            Self::Ollama(c) => c.generate(prompt, system).await,
            Self::OpenAi(c) => c.generate(prompt, system).await,
        }
    }

    async fn embeddings(&self, input: &str) -> Result<Vec<f32>, LlmError> {
        match self {
            Self::Ollama(c) => c.embeddings(input).await,
            Self::OpenAi(c) => c.embeddings(input).await,
        }
    }

    async fn ping(&self) -> Result<(), LlmError> {
        match self {
            Self::Ollama(c) => c.ping().await,
            Self::OpenAi(c) => c.ping().await,
        }
    }
}

/// Anything able to turn a prompt into prose. The orchestrator depends on
/// this, not on a concrete provider.
pub trait TextGenerator: Send + Sync {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        system: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>>;
}

/// Shared service holding the generation and embedding profiles.
pub struct LlmProfiles {
    generation: ProviderClient,
    embedding: ProviderClient,
    generation_cfg: ModelConfig,
    embedding_cfg: ModelConfig,
}

impl LlmProfiles {
    pub fn new(generation: ModelConfig, embedding: ModelConfig) -> Result<Self, LlmError> {
        info!(
            generation.provider = %generation.provider,
            generation.model = %generation.model,
            embedding.provider = %embedding.provider,
            embedding.model = %embedding.model,
            "LlmProfiles initialized"
        );
        Ok(Self {
            generation: ProviderClient::build(generation.clone())?,
            embedding: ProviderClient::build(embedding.clone())?,
            generation_cfg: generation,
            embedding_cfg: embedding,
        })
    }

    /// Profiles from `LLM_*` and `EMBEDDING_*` environment variables.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::new(ModelConfig::from_env("LLM")?, ModelConfig::from_env("EMBEDDING")?)
    }

    /// Generate text with the generation profile.
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError> {
        let started = Instant::now();
        let out = self.generation.generate(prompt, system).await;
        if out.is_ok() {
            info!(
                model = %self.generation_cfg.model,
                prompt_len = prompt.len(),
                latency_ms = started.elapsed().as_millis(),
                "generation completed"
            );
        }
        out
    }

    /// Raw embedding call with the embedding profile (no cache; see
    /// [`crate::EmbeddingClient`] for the cached/batched layer).
    pub async fn embed_raw(&self, input: &str) -> Result<Vec<f32>, LlmError> {
        self.embedding.embeddings(input).await
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_cfg.model
    }

    /// Probe both profiles; errors bubble the first failing profile.
    pub async fn ping_all(&self) -> Result<(), LlmError> {
        self.generation.ping().await?;
        if self.embedding_cfg != self.generation_cfg {
            self.embedding.ping().await?;
        }
        Ok(())
    }
}

impl TextGenerator for LlmProfiles {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        system: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>> {
        Box::pin(self.generate(prompt, system))
    }
}

impl EmbeddingsProvider for LlmProfiles {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, LlmError>> + Send + 'a>> {
        Box::pin(self.embed_raw(text))
    }

    fn model_id(&self) -> &str {
        self.embedding_model()
    }
}
