//! Abstract vector-store interface.

use crate::config::DistanceKind;
use crate::errors::VectorError;
use crate::filters::PayloadFilter;
use async_trait::async_trait;

/// One point to upsert: UUID-shaped id, vector, JSON payload.
#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: serde_json::Value,
}

/// A search hit: similarity score plus the stored payload.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub point_id: String,
    pub score: f32,
    pub payload: serde_json::Value,
}

impl VectorHit {
    /// The canonical CodeUnit id preserved in the payload.
    pub fn original_id(&self) -> Option<&str> {
        self.payload.get("original_id").and_then(|v| v.as_str())
    }

    pub fn namespace(&self) -> Option<&str> {
        self.payload.get("namespace").and_then(|v| v.as_str())
    }
}

/// Abstract vector backend. Upserts are idempotent by point id; `search`
/// applies `filter` as an exact match on payload fields.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if absent (idempotent).
    async fn ensure_collection(
        &self,
        name: &str,
        dim: usize,
        distance: DistanceKind,
    ) -> Result<(), VectorError>;

    /// Upsert a batch; returns the accepted point count.
    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>)
    -> Result<u64, VectorError>;

    /// Top-`k` by similarity, descending. A missing collection yields an
    /// empty result, not an error (the docs collection is optional).
    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        k: usize,
        filter: Option<PayloadFilter>,
    ) -> Result<Vec<VectorHit>, VectorError>;

    /// Delete every point matching `filter`; returns the removed count.
    async fn delete(&self, collection: &str, filter: PayloadFilter) -> Result<u64, VectorError>;
}
