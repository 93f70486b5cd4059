//! Error types for graph persistence.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    /// Constraints/indexes could not be established. Fatal: the driver must
    /// refuse to proceed.
    #[error("schema init failed: {0}")]
    SchemaInit(String),

    /// A write arrived before `ensure_schema` succeeded.
    #[error("schema not ready: {0}")]
    SchemaNotReady(&'static str),

    /// Edge endpoint missing from the store. CALLS endpoints must both live
    /// in the target namespace, so this also rejects cross-namespace edges.
    #[error("unknown unit {id} in namespace {namespace}")]
    UnknownUnit { namespace: String, id: String },

    /// The backend rejected a batch; the file's data was rolled back.
    #[error("store rejected batch for {file_path}: {reason}")]
    Rejected { file_path: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}
