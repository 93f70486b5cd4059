//! Model/provider configuration.

use crate::errors::LlmError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::{Display, Formatter};

/// Supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Ollama,
    OpenAi,
}

impl Display for LlmProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::Ollama => f.write_str("ollama"),
            LlmProvider::OpenAi => f.write_str("openai"),
        }
    }
}

/// Universal per-model configuration shared by both clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

impl ModelConfig {
    /// Build a profile config from environment variables under `prefix`.
    ///
    /// Recognized vars (prefix `LLM` or `EMBEDDING`):
    /// - `{prefix}_PROVIDER` = ollama|openai (default: ollama)
    /// - `{prefix}_MODEL` (required)
    /// - `{prefix}_ENDPOINT` (default: http://localhost:11434)
    /// - `{prefix}_API_KEY` (optional)
    /// - `{prefix}_MAX_TOKENS`, `{prefix}_TEMPERATURE`, `{prefix}_TIMEOUT_SECS`
    pub fn from_env(prefix: &str) -> Result<Self, LlmError> {
        let provider = match env::var(format!("{prefix}_PROVIDER"))
            .unwrap_or_else(|_| "ollama".into())
            .to_ascii_lowercase()
            .as_str()
        {
            "ollama" => LlmProvider::Ollama,
            "openai" => LlmProvider::OpenAi,
            other => return Err(LlmError::Decode(format!("unknown provider: {other}"))),
        };
        let model = env::var(format!("{prefix}_MODEL"))
            .map_err(|_| LlmError::Decode(format!("{prefix}_MODEL is required")))?;
        let endpoint = env::var(format!("{prefix}_ENDPOINT"))
            .unwrap_or_else(|_| "http://localhost:11434".into());

        Ok(Self {
            provider,
            model,
            endpoint,
            api_key: env::var(format!("{prefix}_API_KEY")).ok(),
            max_tokens: env_parse(&format!("{prefix}_MAX_TOKENS")),
            temperature: env_parse(&format!("{prefix}_TEMPERATURE")),
            timeout_secs: env_parse(&format!("{prefix}_TIMEOUT_SECS")),
        })
    }

    /// Validate the endpoint scheme; shared by client constructors.
    pub(crate) fn checked_endpoint(&self) -> Result<String, LlmError> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(LlmError::InvalidEndpoint(self.endpoint.clone()));
        }
        Ok(endpoint.trim_end_matches('/').to_string())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}
