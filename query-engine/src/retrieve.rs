//! Retrieval primitives: vector search with cross-store join, bounded CALLS
//! traversal, immediate callers. All three are independent and safe to call
//! concurrently.

use crate::errors::QueryError;
use crate::types::{CodeSnippet, DocSnippet};
use graph_store::{CallPath, GraphStore, UnitRef};
use llm_service::EmbeddingClient;
use std::sync::Arc;
use tracing::{debug, trace};
use vector_store::{PayloadFilter, PointPayload, VectorStore};

/// Collection names the engine reads from.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub collection_code: String,
    pub collection_docs: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            collection_code: "code_units".into(),
            collection_docs: "documentation".into(),
        }
    }
}

pub struct RetrievalEngine {
    graph: Arc<dyn GraphStore>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<EmbeddingClient>,
    cfg: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<EmbeddingClient>,
        cfg: RetrievalConfig,
    ) -> Self {
        Self {
            graph,
            vectors,
            embedder,
            cfg,
        }
    }

    /// Embed a query text through the shared cached client.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, QueryError> {
        Ok(self.embedder.embed(text).await?)
    }

    /// Text-in convenience over [`Self::vector_search`]: embed, then search.
    /// The orchestrator embeds once and reuses the vector instead.
    pub async fn vector_search_text(
        &self,
        query_text: &str,
        namespace: Option<&str>,
        k: usize,
    ) -> Result<Vec<CodeSnippet>, QueryError> {
        let vector = self.embed(query_text).await?;
        self.vector_search(vector, namespace, k).await
    }

    /// Vector search over code units.
    ///
    /// `namespace` semantics: colon-qualified → exact store-side filter;
    /// bare prefix → unfiltered search, prefix-matched on the payload;
    /// `None` → all namespaces. Hits whose `original_id` is gone from the
    /// graph are dropped without error.
    pub async fn vector_search(
        &self,
        query_vector: Vec<f32>,
        namespace: Option<&str>,
        k: usize,
    ) -> Result<Vec<CodeSnippet>, QueryError> {
        let (filter, prefix) = match namespace {
            Some(ns) if ns.contains(':') => (Some(PayloadFilter::namespace(ns)), None),
            Some(prefix) => (None, Some(prefix.to_string())),
            None => (None, None),
        };
        // Prefix filtering happens client-side: over-fetch to keep recall.
        let fetch_k = if prefix.is_some() { k * 4 } else { k };

        let hits = self
            .vectors
            .search(&self.cfg.collection_code, query_vector, fetch_k, filter)
            .await?;

        let mut out = Vec::with_capacity(hits.len());
        for hit in hits {
            let Ok(payload) = serde_json::from_value::<PointPayload>(hit.payload.clone()) else {
                trace!(point = %hit.point_id, "malformed code payload, dropped");
                continue;
            };
            if let Some(prefix) = &prefix {
                let matches = payload.namespace == *prefix
                    || payload
                        .namespace
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with(':'));
                if !matches {
                    continue;
                }
            }
            // Cross-store join: the graph is the source of truth.
            if self
                .graph
                .unit(&payload.namespace, &payload.original_id)
                .await?
                .is_none()
            {
                trace!(id = %payload.original_id, "vector hit without graph node, dropped");
                continue;
            }
            out.push(CodeSnippet {
                original_id: payload.original_id,
                namespace: payload.namespace,
                name: payload.name,
                file_path: payload.file_path,
                line_start: payload.line_start,
                signature: payload.signature,
                code_excerpt: payload.code_excerpt,
                score: hit.score,
            });
            if out.len() == k {
                break;
            }
        }
        debug!(hits = out.len(), "vector search joined");
        Ok(out)
    }

    /// Vector search over the documentation collection (lenient payload
    /// shape; empty when the collection does not exist).
    pub async fn doc_search(
        &self,
        query_vector: Vec<f32>,
        k: usize,
    ) -> Result<Vec<DocSnippet>, QueryError> {
        let hits = self
            .vectors
            .search(&self.cfg.collection_docs, query_vector, k, None)
            .await?;
        let out = hits
            .into_iter()
            .map(|hit| DocSnippet {
                title: string_field(&hit.payload, &["title", "source", "name", "file_path"]),
                excerpt: string_field(&hit.payload, &["excerpt", "text", "code_excerpt", "body"]),
                score: hit.score,
            })
            .filter(|d| !d.excerpt.is_empty())
            .collect();
        Ok(out)
    }

    /// Bounded CALLS paths from a unit, deduplicated by terminal node.
    pub async fn graph_outgoing(
        &self,
        namespace: &str,
        id: &str,
        depth: usize,
    ) -> Result<Vec<CallPath>, QueryError> {
        Ok(self.graph.outgoing(namespace, id, depth).await?)
    }

    /// Immediate callers of a unit.
    pub async fn graph_incoming(
        &self,
        namespace: &str,
        id: &str,
    ) -> Result<Vec<UnitRef>, QueryError> {
        Ok(self.graph.incoming(namespace, id).await?)
    }
}

fn string_field(payload: &serde_json::Value, keys: &[&str]) -> String {
    for key in keys {
        if let Some(s) = payload.get(key).and_then(|v| v.as_str()) {
            if !s.is_empty() {
                return s.to_string();
            }
        }
    }
    String::new()
}
