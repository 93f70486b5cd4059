//! Qdrant backend: a thin adapter concentrating all `qdrant-client` usage,
//! keeping the rest of the pipeline decoupled from its builder API.

use crate::config::{DistanceKind, VectorConfig};
use crate::errors::VectorError;
use crate::filters::{PayloadFilter, to_qdrant_filter};
use crate::store::{VectorHit, VectorPoint, VectorStore};
use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, PointId,
    PointStruct, SearchPointsBuilder, UpsertPointsBuilder, Value as QValue, Vector,
    VectorParamsBuilder, Vectors, point_id, value, vectors,
};
use tracing::{debug, info, warn};

pub struct QdrantBackend {
    client: Qdrant,
}

impl QdrantBackend {
    /// # Errors
    /// Returns [`VectorError::Config`] if the client cannot be initialized.
    pub fn new(cfg: &VectorConfig) -> Result<Self, VectorError> {
        cfg.validate()?;
        let mut builder = Qdrant::from_url(&cfg.url);
        if let Some(key) = &cfg.api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| VectorError::Config(e.to_string()))?;
        Ok(Self { client })
    }

    async fn collection_exists(&self, name: &str) -> bool {
        self.client.collection_info(name).await.is_ok()
    }
}

#[async_trait]
impl VectorStore for QdrantBackend {
    async fn ensure_collection(
        &self,
        name: &str,
        dim: usize,
        distance: DistanceKind,
    ) -> Result<(), VectorError> {
        if self.collection_exists(name).await {
            debug!(collection = name, "collection already exists");
            return Ok(());
        }
        let distance = match distance {
            DistanceKind::Cosine => Distance::Cosine,
            DistanceKind::Dot => Distance::Dot,
            DistanceKind::Euclid => Distance::Euclid,
        };
        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dim as u64, distance)),
            )
            .await
            .map_err(|e| VectorError::Store(e.to_string()))?;
        info!(collection = name, dim, "collection created");
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> Result<u64, VectorError> {
        if points.is_empty() {
            return Ok(0);
        }
        let count = points.len() as u64;
        let points: Vec<PointStruct> = points.into_iter().map(to_point_struct).collect();
        debug!(collection, points = count, "upserting points");
        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points))
            .await
            .map_err(|e| VectorError::Store(e.to_string()))?;
        Ok(count)
    }

    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        k: usize,
        filter: Option<PayloadFilter>,
    ) -> Result<Vec<VectorHit>, VectorError> {
        if !self.collection_exists(collection).await {
            warn!(collection, "search against missing collection, empty result");
            return Ok(Vec::new());
        }
        let mut builder =
            SearchPointsBuilder::new(collection, vector, k as u64).with_payload(true);
        if let Some(f) = &filter {
            builder = builder.filter(to_qdrant_filter(f));
        }
        let res = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| VectorError::Store(e.to_string()))?;

        let mut out = Vec::with_capacity(res.result.len());
        for r in res.result.into_iter() {
            out.push(VectorHit {
                point_id: format_point_id(r.id),
                score: r.score,
                payload: qpayload_to_json(r.payload),
            });
        }
        debug!(collection, hits = out.len(), "search completed");
        Ok(out)
    }

    async fn delete(&self, collection: &str, filter: PayloadFilter) -> Result<u64, VectorError> {
        if !self.collection_exists(collection).await {
            return Ok(0);
        }
        let qfilter = to_qdrant_filter(&filter);

        // Count first: the delete response does not carry a removed total.
        let removed = self
            .client
            .count(
                CountPointsBuilder::new(collection)
                    .filter(qfilter.clone())
                    .exact(true),
            )
            .await
            .map_err(|e| VectorError::Store(e.to_string()))?
            .result
            .map(|r| r.count)
            .unwrap_or(0);

        self.client
            .delete_points(DeletePointsBuilder::new(collection).points(qfilter))
            .await
            .map_err(|e| VectorError::Store(e.to_string()))?;
        info!(collection, removed, "points deleted");
        Ok(removed)
    }
}

fn to_point_struct(p: VectorPoint) -> PointStruct {
    let mut payload_map = std::collections::HashMap::new();
    if let serde_json::Value::Object(map) = p.payload {
        for (k, v) in map {
            payload_map.insert(k, json_to_qvalue(v));
        }
    }

    let vectors = Vectors {
        vectors_options: Some(vectors::VectorsOptions::Vector(Vector {
            data: p.vector,
            ..Default::default()
        })),
    };

    PointStruct {
        id: Some(PointId {
            point_id_options: Some(point_id::PointIdOptions::Uuid(p.id)),
        }),
        payload: payload_map,
        vectors: Some(vectors),
        ..Default::default()
    }
}

fn format_point_id(id: Option<PointId>) -> String {
    match id.and_then(|p| p.point_id_options) {
        Some(point_id::PointIdOptions::Uuid(u)) => u,
        Some(point_id::PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    }
}

/// `serde_json::Value` → `qdrant::Value`. Nested arrays/objects are
/// stringified; the payload schema is flat by construction.
fn json_to_qvalue(v: serde_json::Value) -> QValue {
    use serde_json::Value as J;
    use value::Kind as K;

    match v {
        J::String(s) => QValue {
            kind: Some(K::StringValue(s)),
        },
        J::Number(n) => {
            if let Some(i) = n.as_i64() {
                QValue {
                    kind: Some(K::IntegerValue(i)),
                }
            } else if let Some(f) = n.as_f64() {
                QValue {
                    kind: Some(K::DoubleValue(f)),
                }
            } else {
                QValue {
                    kind: Some(K::StringValue(n.to_string())),
                }
            }
        }
        J::Bool(b) => QValue {
            kind: Some(K::BoolValue(b)),
        },
        other => QValue {
            kind: Some(K::StringValue(other.to_string())),
        },
    }
}

/// Qdrant payload → JSON object for uniform downstream handling.
fn qpayload_to_json(p: std::collections::HashMap<String, QValue>) -> serde_json::Value {
    use value::Kind as K;
    let mut m = serde_json::Map::new();
    for (k, v) in p {
        let j = match v.kind {
            Some(K::StringValue(s)) => serde_json::Value::String(s),
            Some(K::IntegerValue(i)) => serde_json::Value::Number(i.into()),
            Some(K::DoubleValue(f)) => serde_json::json!(f),
            Some(K::BoolValue(b)) => serde_json::Value::Bool(b),
            _ => serde_json::Value::Null,
        };
        m.insert(k, j);
    }
    serde_json::Value::Object(m)
}
