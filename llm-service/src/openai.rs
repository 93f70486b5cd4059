//! Client for OpenAI-compatible APIs.
//!
//! - `POST {endpoint}/v1/chat/completions` — non-streaming chat completion
//! - `POST {endpoint}/v1/embeddings`       — embeddings retrieval

use crate::config::{LlmProvider, ModelConfig};
use crate::errors::{LlmError, make_snippet};
use reqwest::header;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

pub struct OpenAiClient {
    client: reqwest::Client,
    cfg: ModelConfig,
    url_chat: String,
    url_embeddings: String,
}

impl OpenAiClient {
    /// # Errors
    /// - [`LlmError::InvalidProvider`] if `cfg.provider` is not OpenAI
    /// - [`LlmError::MissingApiKey`] if no API key was configured
    /// - [`LlmError::InvalidEndpoint`] if the endpoint scheme is invalid
    pub fn new(cfg: ModelConfig) -> Result<Self, LlmError> {
        if cfg.provider != LlmProvider::OpenAi {
            return Err(LlmError::InvalidProvider);
        }
        let api_key = cfg
            .api_key
            .clone()
            .ok_or(LlmError::MissingApiKey("openai"))?;
        let base = cfg.checked_endpoint()?;

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| LlmError::Decode(format!("invalid API key header: {e}")))?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            url_chat: format!("{base}/v1/chat/completions"),
            url_embeddings: format!("{base}/v1/embeddings"),
            client,
            cfg,
        })
    }

    /// Non-streaming chat completion; optional system message first.
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = system {
            messages.push(ChatMessage {
                role: "system",
                content: sys,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });
        let body = ChatCompletionRequest {
            model: &self.cfg.model,
            messages,
            temperature: self.cfg.temperature,
            max_tokens: self.cfg.max_tokens,
        };

        debug!("POST {}", self.url_chat);
        let resp = self.client.post(&self.url_chat).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_chat.clone();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::HttpStatus {
                status,
                url,
                snippet: make_snippet(&text),
            });
        }

        let out: ChatCompletionResponse = resp.json().await.map_err(|e| {
            LlmError::Decode(format!(
                "serde error: {e}; expected `choices[0].message.content`"
            ))
        })?;
        out.choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or(LlmError::Empty)
    }

    /// Single embeddings vector via `/v1/embeddings`.
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, LlmError> {
        let body = EmbeddingsRequest {
            model: &self.cfg.model,
            input,
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
        out.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(LlmError::Empty)
    }

    /// Reachability probe against the chat endpoint host.
    pub async fn ping(&self) -> Result<(), LlmError> {
        // POSTing an empty body would burn tokens; a HEAD on the base path
        // is enough to prove the host resolves and answers.
        let resp = self.client.head(&self.url_chat).send().await?;
        let status = resp.status();
        if status.is_server_error() {
            return Err(LlmError::HttpStatus {
                status,
                url: self.url_chat.clone(),
                snippet: String::new(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingsDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsDatum {
    embedding: Vec<f32>,
}
