//! Thin client for the Ollama API.
//!
//! - `POST {endpoint}/api/generate`   — non-streaming text generation
//! - `POST {endpoint}/api/embeddings` — embeddings retrieval
//! - `GET  {endpoint}/api/tags`       — health probe

use crate::config::{LlmProvider, ModelConfig};
use crate::errors::{LlmError, make_snippet};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

pub struct OllamaClient {
    client: reqwest::Client,
    cfg: ModelConfig,
    url_generate: String,
    url_embeddings: String,
    url_tags: String,
}

impl OllamaClient {
    /// # Errors
    /// - [`LlmError::InvalidProvider`] if `cfg.provider` is not Ollama
    /// - [`LlmError::InvalidEndpoint`] if the endpoint scheme is invalid
    /// - [`LlmError::Transport`] if the HTTP client cannot be built
    pub fn new(cfg: ModelConfig) -> Result<Self, LlmError> {
        if cfg.provider != LlmProvider::Ollama {
            return Err(LlmError::InvalidProvider);
        }
        let base = cfg.checked_endpoint()?;
        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            url_generate: format!("{base}/api/generate"),
            url_embeddings: format!("{base}/api/embeddings"),
            url_tags: format!("{base}/api/tags"),
            client,
            cfg,
        })
    }

    /// Non-streaming generation via `/api/generate`.
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError> {
        let body = GenerateRequest {
            model: &self.cfg.model,
            prompt,
            system,
            stream: false,
            options: Some(GenerateOptions {
                temperature: self.cfg.temperature,
                num_predict: self.cfg.max_tokens,
            }),
        };

        debug!("POST {}", self.url_generate);
        let resp = self
            .client
            .post(&self.url_generate)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_generate.clone();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::HttpStatus {
                status,
                url,
                snippet: make_snippet(&text),
            });
        }

        let out: GenerateResponse = resp.json().await.map_err(|e| {
            LlmError::Decode(format!("serde error: {e}; ensure `stream=false` is used"))
        })?;
        Ok(out.response)
    }

    /// Embeddings via `/api/embeddings`.
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, LlmError> {
        let body = EmbeddingsRequest {
            model: &self.cfg.model,
            prompt: input,
        };

        debug!("POST {}", self.url_embeddings);
        let resp = self
            .client
            .post(&self.url_embeddings)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_embeddings.clone();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::HttpStatus {
                status,
                url,
                snippet: make_snippet(&text),
            });
        }

        let out: EmbeddingsResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(format!("serde error: {e}")))?;
        Ok(out.embedding)
    }

    /// Cheap reachability probe.
    pub async fn ping(&self) -> Result<(), LlmError> {
        let resp = self.client.get(&self.url_tags).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(LlmError::HttpStatus {
                status: resp.status(),
                url: self.url_tags.clone(),
                snippet: String::new(),
            })
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Debug, Default, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}
