//! Configuration for the vector side of the pipeline.

use crate::errors::VectorError;
use serde::{Deserialize, Serialize};
use std::env;

/// Distance metric for collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceKind {
    Cosine,
    Dot,
    Euclid,
}

/// High-level vector-store configuration.
#[derive(Debug, Clone)]
pub struct VectorConfig {
    pub url: String,
    pub api_key: Option<String>,
    /// Collection holding code-unit points.
    pub collection_code: String,
    /// Collection holding documentation points (searched if present).
    pub collection_docs: String,
    pub distance: DistanceKind,
    pub dimension: usize,
    pub upsert_batch: usize,
    /// Characters of unit source kept in `payload.code_excerpt`.
    pub excerpt_chars: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".into(),
            api_key: None,
            collection_code: "code_units".into(),
            collection_docs: "documentation".into(),
            distance: DistanceKind::Cosine,
            dimension: 1536,
            upsert_batch: 256,
            excerpt_chars: 2000,
        }
    }
}

impl VectorConfig {
    /// Build from environment variables.
    ///
    /// Recognized vars (all optional, defaults above):
    /// - `QDRANT_URL`, `QDRANT_API_KEY`
    /// - `VECTOR_COLLECTION_CODE`, `VECTOR_COLLECTION_DOCS`
    /// - `VECTOR_DISTANCE` = cosine|dot|euclid
    /// - `EMBEDDING_DIM`, `VECTOR_BATCH_SIZE`, `VECTOR_EXCERPT_CHARS`
    pub fn from_env() -> Result<Self, VectorError> {
        let mut cfg = Self::default();
        if let Ok(v) = env::var("QDRANT_URL") {
            cfg.url = v;
        }
        cfg.api_key = env::var("QDRANT_API_KEY").ok();
        if let Ok(v) = env::var("VECTOR_COLLECTION_CODE") {
            cfg.collection_code = v;
        }
        if let Ok(v) = env::var("VECTOR_COLLECTION_DOCS") {
            cfg.collection_docs = v;
        }
        if let Ok(v) = env::var("VECTOR_DISTANCE") {
            cfg.distance = match v.to_ascii_lowercase().as_str() {
                "cosine" => DistanceKind::Cosine,
                "dot" => DistanceKind::Dot,
                "euclid" | "l2" => DistanceKind::Euclid,
                other => {
                    return Err(VectorError::Config(format!(
                        "unknown VECTOR_DISTANCE: {other}"
                    )));
                }
            };
        }
        if let Some(v) = env_usize("EMBEDDING_DIM") {
            cfg.dimension = v;
        }
        if let Some(v) = env_usize("VECTOR_BATCH_SIZE") {
            cfg.upsert_batch = v.max(1);
        }
        if let Some(v) = env_usize("VECTOR_EXCERPT_CHARS") {
            cfg.excerpt_chars = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), VectorError> {
        if self.url.trim().is_empty() {
            return Err(VectorError::Config("empty QDRANT_URL".into()));
        }
        if self.collection_code.trim().is_empty() {
            return Err(VectorError::Config("empty code collection name".into()));
        }
        if self.dimension == 0 {
            return Err(VectorError::Config("dimension must be non-zero".into()));
        }
        Ok(())
    }
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
