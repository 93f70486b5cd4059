//! Error type for the ingestion driver.

use graph_store::GraphError;
use thiserror::Error;
use vector_store::VectorError;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Graph-side failure. `GraphError::SchemaInit` aborts the whole run.
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Vector(#[from] VectorError),

    #[error("scan failed: {0}")]
    Scan(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
