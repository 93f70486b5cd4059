//! Graph loader: parser output in, nodes and name-resolved CALLS edges out.
//!
//! Two phases per namespace, matching the store's ordering contract:
//! 1. [`GraphLoader::load_units`] per file (transactional node/CONTAINS/
//!    IMPORTS upsert), collecting unresolved `(caller, callee)` pairs;
//! 2. [`GraphLoader::resolve_calls`] once all files landed, then
//!    [`GraphLoader::finish_namespace`] to re-derive entry points.

use crate::errors::GraphError;
use crate::store::{CallEdge, FileBatch, GraphStore};
use code_parsers::{CodeUnit, ParseResult, UnitKind};
use edit_distance::edit_distance;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

/// An unresolved call captured at parse time, waiting for name resolution.
#[derive(Debug, Clone)]
pub struct PendingCall {
    pub caller_id: String,
    pub caller_kind: UnitKind,
    pub caller_file: String,
    pub callee: String,
}

/// Writes `ParseResult`s into a [`GraphStore`].
pub struct GraphLoader {
    store: Arc<dyn GraphStore>,
}

impl GraphLoader {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn GraphStore> {
        Arc::clone(&self.store)
    }

    /// One-shot schema setup. A failure here is fatal for the driver.
    pub async fn ensure_schema(&self) -> Result<(), GraphError> {
        self.store.ensure_schema().await
    }

    /// Upsert one file's units transactionally and return its pending calls.
    pub async fn load_units(&self, parsed: &ParseResult) -> Result<Vec<PendingCall>, GraphError> {
        let batch = FileBatch {
            namespace: parsed.namespace.clone(),
            file_path: parsed.file_path.clone(),
            units: parsed.units.clone(),
            imports: parsed.imports.clone(),
        };
        self.store.apply_file(batch).await?;

        let mut pending = Vec::new();
        for unit in &parsed.units {
            for callee in &unit.callees {
                pending.push(PendingCall {
                    caller_id: unit.id.clone(),
                    caller_kind: unit.kind,
                    caller_file: unit.file_path.clone(),
                    callee: callee.clone(),
                });
            }
        }
        Ok(pending)
    }

    /// Resolve pending calls into CALLS edges.
    ///
    /// Per call: (a) intra-file match on exact name or the last dotted
    /// segment; (b) intra-namespace match with deterministic tie-breaks
    /// (same kind as caller, then file-path edit distance, then smallest id);
    /// (c) silently dropped (external/stdlib target).
    pub async fn resolve_calls(
        &self,
        namespace: &str,
        pending: &[PendingCall],
    ) -> Result<usize, GraphError> {
        let mut edges: Vec<CallEdge> = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for call in pending {
            let Some(callee_id) = self.resolve_one(namespace, call).await? else {
                trace!(callee = %call.callee, "resolve miss, dropped");
                continue;
            };
            if callee_id == call.caller_id {
                // Self-recursion is not modeled as an edge; it would mask
                // every recursive entry point.
                continue;
            }
            if seen.insert((call.caller_id.clone(), callee_id.clone())) {
                edges.push(CallEdge {
                    caller_id: call.caller_id.clone(),
                    callee_id,
                });
            }
        }

        let written = self.store.write_calls(namespace, &edges).await?;
        debug!(
            namespace,
            pending = pending.len(),
            resolved = edges.len(),
            written,
            "calls resolved"
        );
        Ok(written)
    }

    /// Re-derive `is_entry_point` after the CALLS pass.
    pub async fn finish_namespace(&self, namespace: &str) -> Result<usize, GraphError> {
        self.store.refresh_entry_points(namespace).await
    }

    async fn resolve_one(
        &self,
        namespace: &str,
        call: &PendingCall,
    ) -> Result<Option<String>, GraphError> {
        let callee = call.callee.as_str();
        let tail = last_segment(callee);

        // (a) intra-file
        let in_file = self
            .store
            .units_in_file(namespace, &call.caller_file)
            .await?;
        let local: Vec<&CodeUnit> = in_file
            .iter()
            .filter(|u| is_callable(u.kind) && (u.name == callee || u.name == tail))
            .collect();
        if let Some(best) = pick_best(&local, call) {
            return Ok(Some(best.id.clone()));
        }

        // (b) intra-namespace
        let mut global = self.store.units_by_name(namespace, callee).await?;
        if global.is_empty() && tail != callee {
            global = self.store.units_by_name(namespace, tail).await?;
        }
        let global: Vec<&CodeUnit> = global.iter().filter(|u| is_callable(u.kind)).collect();
        if let Some(best) = pick_best(&global, call) {
            return Ok(Some(best.id.clone()));
        }

        // (c) external/stdlib
        Ok(None)
    }
}

fn is_callable(kind: UnitKind) -> bool {
    matches!(kind, UnitKind::Function | UnitKind::Method)
}

/// Deterministic candidate selection: prefer the caller's kind, then the
/// closest file path, then the lexicographically smallest id.
fn pick_best<'a>(candidates: &[&'a CodeUnit], call: &PendingCall) -> Option<&'a CodeUnit> {
    candidates
        .iter()
        .min_by_key(|u| {
            let kind_rank = if u.kind == call.caller_kind { 0u8 } else { 1 };
            let dist = edit_distance(&u.file_path, &call.caller_file);
            (kind_rank, dist, u.id.clone())
        })
        .copied()
}

fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}
