//! Error types for vector persistence.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorError {
    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("vector size mismatch: got={got}, want={want}")]
    VectorSizeMismatch { got: usize, want: usize },

    #[error("serde json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}
