//! Vector loader: embed parser output and upsert points.
//!
//! Vector writes are deliberately weaker than graph writes: a unit whose
//! embedding fails permanently is skipped (and logged), a batch that fails
//! upsert is retried once and then skipped. The graph is never rolled back
//! from here; retrieval tolerates the resulting vector misses.

use crate::config::VectorConfig;
use crate::errors::VectorError;
use crate::filters::PayloadFilter;
use crate::payload::{PointPayload, embedding_input};
use crate::point_id::point_id_for;
use crate::store::{VectorPoint, VectorStore};
use code_parsers::ParseResult;
use llm_service::EmbeddingClient;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Per-file outcome of the vector pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorLoadOutcome {
    /// Points accepted by the store.
    pub written: u64,
    /// Units dropped (embedding or upsert failure after retry).
    pub skipped: usize,
}

pub struct VectorLoader {
    store: Arc<dyn VectorStore>,
    embedder: Arc<EmbeddingClient>,
    cfg: VectorConfig,
    ensured: AtomicBool,
}

impl VectorLoader {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<EmbeddingClient>,
        cfg: VectorConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            cfg,
            ensured: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> Arc<dyn VectorStore> {
        Arc::clone(&self.store)
    }

    /// Embed and upsert one file's units into the code collection.
    pub async fn load(&self, parsed: &ParseResult) -> Result<VectorLoadOutcome, VectorError> {
        if parsed.units.is_empty() {
            return Ok(VectorLoadOutcome::default());
        }
        self.ensure_code_collection().await?;

        let texts: Vec<String> = parsed
            .units
            .iter()
            .map(|u| embedding_input(u, self.cfg.excerpt_chars))
            .collect();
        let embeddings = self.embedder.embed_batch(&texts).await;

        let mut outcome = VectorLoadOutcome::default();
        let mut points = Vec::with_capacity(parsed.units.len());
        for (unit, embedded) in parsed.units.iter().zip(embeddings) {
            match embedded {
                Ok(vector) => {
                    let payload = PointPayload::from_unit(unit, self.cfg.excerpt_chars);
                    points.push(VectorPoint {
                        id: point_id_for(&unit.id),
                        vector,
                        payload: serde_json::to_value(&payload)?,
                    });
                }
                Err(err) => {
                    warn!(unit = %unit.id, error = %err, "embedding failed, unit skipped for vectoring");
                    outcome.skipped += 1;
                }
            }
        }

        for chunk in points.chunks(self.cfg.upsert_batch.max(1)) {
            match self
                .store
                .upsert(&self.cfg.collection_code, chunk.to_vec())
                .await
            {
                Ok(n) => outcome.written += n,
                Err(first_err) => {
                    warn!(error = %first_err, "upsert batch failed, retrying once");
                    match self
                        .store
                        .upsert(&self.cfg.collection_code, chunk.to_vec())
                        .await
                    {
                        Ok(n) => outcome.written += n,
                        Err(second_err) => {
                            warn!(
                                error = %second_err,
                                units = chunk.len(),
                                "upsert retry failed, batch skipped"
                            );
                            outcome.skipped += chunk.len();
                        }
                    }
                }
            }
        }

        debug!(
            file = %parsed.file_path,
            written = outcome.written,
            skipped = outcome.skipped,
            "vector load done"
        );
        Ok(outcome)
    }

    /// Remove every point in either collection carrying `namespace`.
    pub async fn purge_namespace(&self, namespace: &str) -> Result<u64, VectorError> {
        let filter = PayloadFilter::namespace(namespace);
        let mut removed = self
            .store
            .delete(&self.cfg.collection_code, filter.clone())
            .await?;
        removed += self
            .store
            .delete(&self.cfg.collection_docs, filter)
            .await?;
        Ok(removed)
    }

    async fn ensure_code_collection(&self) -> Result<(), VectorError> {
        if self.ensured.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.store
            .ensure_collection(
                &self.cfg.collection_code,
                self.embedder.dimension(),
                self.cfg.distance,
            )
            .await?;
        self.ensured.store(true, Ordering::SeqCst);
        Ok(())
    }
}
