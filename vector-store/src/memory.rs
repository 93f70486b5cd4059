//! In-memory vector backend: exact cosine/dot scoring over a hash map.
//! First-class for tests and offline runs; mirrors the Qdrant semantics
//! (idempotent upsert by id, exact payload filters, missing collection
//! searches are empty).

use crate::config::DistanceKind;
use crate::errors::VectorError;
use crate::filters::PayloadFilter;
use crate::store::{VectorHit, VectorPoint, VectorStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

struct Collection {
    dim: usize,
    distance: DistanceKind,
    points: HashMap<String, (Vec<f32>, serde_json::Value)>,
}

#[derive(Default)]
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total points in a collection (test/diagnostic helper).
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.points.len())
            .unwrap_or(0)
    }

    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn ensure_collection(
        &self,
        name: &str,
        dim: usize,
        distance: DistanceKind,
    ) -> Result<(), VectorError> {
        let mut cols = self.collections.write().await;
        cols.entry(name.to_string()).or_insert_with(|| Collection {
            dim,
            distance,
            points: HashMap::new(),
        });
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> Result<u64, VectorError> {
        let mut cols = self.collections.write().await;
        let col = cols
            .get_mut(collection)
            .ok_or_else(|| VectorError::UnknownCollection(collection.to_string()))?;
        let mut accepted = 0;
        for p in points {
            if p.vector.len() != col.dim {
                return Err(VectorError::VectorSizeMismatch {
                    got: p.vector.len(),
                    want: col.dim,
                });
            }
            col.points.insert(p.id, (p.vector, p.payload));
            accepted += 1;
        }
        Ok(accepted)
    }

    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        k: usize,
        filter: Option<PayloadFilter>,
    ) -> Result<Vec<VectorHit>, VectorError> {
        let cols = self.collections.read().await;
        let Some(col) = cols.get(collection) else {
            debug!(collection, "search against missing collection, empty result");
            return Ok(Vec::new());
        };

        let mut hits: Vec<VectorHit> = col
            .points
            .iter()
            .filter(|(_, (_, payload))| {
                filter.as_ref().map(|f| f.matches(payload)).unwrap_or(true)
            })
            .map(|(id, (v, payload))| VectorHit {
                point_id: id.clone(),
                score: score(&vector, v, col.distance),
                payload: payload.clone(),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.point_id.cmp(&b.point_id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn delete(&self, collection: &str, filter: PayloadFilter) -> Result<u64, VectorError> {
        let mut cols = self.collections.write().await;
        let Some(col) = cols.get_mut(collection) else {
            return Ok(0);
        };
        let before = col.points.len();
        col.points.retain(|_, (_, payload)| !filter.matches(payload));
        Ok((before - col.points.len()) as u64)
    }
}

fn score(a: &[f32], b: &[f32], distance: DistanceKind) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return f32::MIN;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    match distance {
        DistanceKind::Dot => dot,
        DistanceKind::Cosine => {
            let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            if na == 0.0 || nb == 0.0 {
                0.0
            } else {
                dot / (na * nb)
            }
        }
        DistanceKind::Euclid => {
            let d2: f32 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
            -d2.sqrt()
        }
    }
}
