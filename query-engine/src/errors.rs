//! Error type for the query side.

use graph_store::GraphError;
use llm_service::LlmError;
use thiserror::Error;
use vector_store::VectorError;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Vector(#[from] VectorError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}
