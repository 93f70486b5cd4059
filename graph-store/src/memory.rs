//! In-memory graph backend.
//!
//! One petgraph `StableDiGraph` per namespace, plus hash indexes mirroring
//! the schema contract: unique `(namespace, id)`, lookup by name and by file.
//! Per-file upserts are diff-based so that re-ingesting identical sources
//! keeps node identity (and therefore cross-file CALLS edges) intact.

use crate::errors::GraphError;
use crate::store::{
    CallEdge, CallPath, EdgeKind, FileBatch, GraphCounts, GraphStore, ImportEdge, PurgeCounts,
    UnitRef,
};
use async_trait::async_trait;
use code_parsers::{CodeUnit, UnitKind};
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Default)]
struct NamespaceGraph {
    graph: StableDiGraph<String, EdgeKind>,
    index_of: HashMap<String, NodeIndex>,
    units: HashMap<String, CodeUnit>,
    by_name: HashMap<String, BTreeSet<String>>,
    by_file: HashMap<String, BTreeSet<String>>,
    imports: Vec<ImportEdge>,
}

impl NamespaceGraph {
    fn remove_unit(&mut self, id: &str) {
        if let Some(idx) = self.index_of.remove(id) {
            self.graph.remove_node(idx);
        }
        if let Some(unit) = self.units.remove(id) {
            if let Some(set) = self.by_name.get_mut(&unit.name) {
                set.remove(id);
                if set.is_empty() {
                    self.by_name.remove(&unit.name);
                }
            }
        }
        self.imports.retain(|row| row.module_id != id);
    }

    fn insert_unit(&mut self, unit: CodeUnit) {
        let id = unit.id.clone();
        if let Some(existing) = self.units.get_mut(&id) {
            *existing = unit;
            return;
        }
        let idx = self.graph.add_node(id.clone());
        self.index_of.insert(id.clone(), idx);
        self.by_name
            .entry(unit.name.clone())
            .or_default()
            .insert(id.clone());
        self.units.insert(id, unit);
    }

    fn has_edge(&self, a: NodeIndex, b: NodeIndex, kind: EdgeKind) -> bool {
        self.graph
            .edges_connecting(a, b)
            .any(|e| *e.weight() == kind)
    }

    fn incoming_calls(&self, idx: NodeIndex) -> usize {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .filter(|e| *e.weight() == EdgeKind::Calls)
            .count()
    }

    fn counts(&self) -> GraphCounts {
        let mut contains = 0;
        let mut calls = 0;
        for e in self.graph.edge_weights() {
            match e {
                EdgeKind::Contains => contains += 1,
                EdgeKind::Calls => calls += 1,
                EdgeKind::Imports => {}
            }
        }
        GraphCounts {
            units: self.units.len(),
            contains,
            calls,
            imports: self.imports.len(),
        }
    }
}

/// In-memory [`GraphStore`] backend. Cheap to clone behind an `Arc`; all
/// state lives under one RwLock keyed by namespace.
pub struct MemoryGraph {
    schema_ready: AtomicBool,
    inner: RwLock<HashMap<String, NamespaceGraph>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self {
            schema_ready: AtomicBool::new(false),
            inner: RwLock::new(HashMap::new()),
        }
    }

    fn check_schema(&self) -> Result<(), GraphError> {
        if self.schema_ready.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(GraphError::SchemaNotReady(
                "ensure_schema must run before writes",
            ))
        }
    }

    /// Full dump for snapshot persistence, grouped per namespace.
    pub(crate) async fn export_state(
        &self,
    ) -> BTreeMap<String, (Vec<CodeUnit>, Vec<CallEdge>, Vec<ImportEdge>)> {
        let inner = self.inner.read().await;
        let mut out = BTreeMap::new();
        for (ns, g) in inner.iter() {
            let mut units: Vec<CodeUnit> = g.units.values().cloned().collect();
            units.sort_by(|a, b| a.id.cmp(&b.id));
            let mut calls = Vec::new();
            for e in g.graph.edge_indices() {
                if g.graph[e] != EdgeKind::Calls {
                    continue;
                }
                if let Some((a, b)) = g.graph.edge_endpoints(e) {
                    calls.push(CallEdge {
                        caller_id: g.graph[a].clone(),
                        callee_id: g.graph[b].clone(),
                    });
                }
            }
            calls.sort_by(|a, b| (&a.caller_id, &a.callee_id).cmp(&(&b.caller_id, &b.callee_id)));
            out.insert(ns.clone(), (units, calls, g.imports.clone()));
        }
        out
    }
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn ensure_schema(&self) -> Result<(), GraphError> {
        // Idempotent: constraints are structural (hash indexes), nothing to
        // create remotely. The flag gates writes so the driver's one-shot
        // setup contract still holds.
        self.schema_ready.store(true, Ordering::SeqCst);
        debug!("graph schema ready");
        Ok(())
    }

    async fn apply_file(&self, batch: FileBatch) -> Result<(), GraphError> {
        self.check_schema()?;

        // Validate before mutating: rejection must leave prior state intact.
        let new_ids: BTreeSet<&str> = batch.units.iter().map(|u| u.id.as_str()).collect();
        for unit in &batch.units {
            if unit.namespace != batch.namespace || unit.file_path != batch.file_path {
                return Err(GraphError::Rejected {
                    file_path: batch.file_path.clone(),
                    reason: format!("unit {} does not belong to this batch", unit.id),
                });
            }
            match (&unit.kind, &unit.parent_id) {
                (UnitKind::Module, None) => {}
                (UnitKind::Module, Some(_)) => {
                    return Err(GraphError::Rejected {
                        file_path: batch.file_path.clone(),
                        reason: format!("module unit {} must not have a parent", unit.id),
                    });
                }
                (_, Some(parent)) if new_ids.contains(parent.as_str()) => {}
                (_, _) => {
                    return Err(GraphError::Rejected {
                        file_path: batch.file_path.clone(),
                        reason: format!("unit {} lacks an in-file parent", unit.id),
                    });
                }
            }
        }

        let mut inner = self.inner.write().await;
        let g = inner.entry(batch.namespace.clone()).or_default();

        let old_ids = g
            .by_file
            .remove(&batch.file_path)
            .unwrap_or_default();
        for id in old_ids.iter() {
            if !new_ids.contains(id.as_str()) {
                g.remove_unit(id);
            }
        }
        // Imports are rebuilt for the file's module units.
        let keep_modules: BTreeSet<&str> = batch
            .units
            .iter()
            .filter(|u| u.kind == UnitKind::Module)
            .map(|u| u.id.as_str())
            .collect();
        g.imports.retain(|row| !keep_modules.contains(row.module_id.as_str()));

        for unit in &batch.units {
            g.insert_unit(unit.clone());
        }
        g.by_file.insert(
            batch.file_path.clone(),
            batch.units.iter().map(|u| u.id.clone()).collect(),
        );

        for unit in &batch.units {
            if let Some(parent) = &unit.parent_id {
                let (Some(&p), Some(&c)) = (g.index_of.get(parent), g.index_of.get(&unit.id))
                else {
                    continue;
                };
                if !g.has_edge(p, c, EdgeKind::Contains) {
                    g.graph.add_edge(p, c, EdgeKind::Contains);
                }
            }
        }
        for import in &batch.imports {
            g.imports.push(ImportEdge {
                namespace: batch.namespace.clone(),
                module_id: import.module_id.clone(),
                target: import.target.clone(),
                origin: import.origin,
                line: import.line,
            });
        }

        debug!(
            namespace = %batch.namespace,
            file = %batch.file_path,
            units = batch.units.len(),
            "file batch applied"
        );
        Ok(())
    }

    async fn write_calls(&self, namespace: &str, edges: &[CallEdge]) -> Result<usize, GraphError> {
        self.check_schema()?;
        let mut inner = self.inner.write().await;
        let Some(g) = inner.get_mut(namespace) else {
            if edges.is_empty() {
                return Ok(0);
            }
            return Err(GraphError::UnknownUnit {
                namespace: namespace.to_string(),
                id: edges[0].caller_id.clone(),
            });
        };

        let mut added = 0;
        for edge in edges {
            let a = *g.index_of.get(&edge.caller_id).ok_or_else(|| {
                GraphError::UnknownUnit {
                    namespace: namespace.to_string(),
                    id: edge.caller_id.clone(),
                }
            })?;
            let b = *g.index_of.get(&edge.callee_id).ok_or_else(|| {
                GraphError::UnknownUnit {
                    namespace: namespace.to_string(),
                    id: edge.callee_id.clone(),
                }
            })?;
            if !g.has_edge(a, b, EdgeKind::Calls) {
                g.graph.add_edge(a, b, EdgeKind::Calls);
                added += 1;
            }
        }
        debug!(namespace, added, total = edges.len(), "calls written");
        Ok(added)
    }

    async fn refresh_entry_points(&self, namespace: &str) -> Result<usize, GraphError> {
        let mut inner = self.inner.write().await;
        let Some(g) = inner.get_mut(namespace) else {
            return Ok(0);
        };
        let mut entry_points = 0;
        let ids: Vec<String> = g.units.keys().cloned().collect();
        for id in ids {
            let Some(&idx) = g.index_of.get(&id) else {
                continue;
            };
            let no_callers = g.incoming_calls(idx) == 0;
            if let Some(unit) = g.units.get_mut(&id) {
                unit.is_entry_point = unit.entry_hint && no_callers;
                if unit.is_entry_point {
                    entry_points += 1;
                }
            }
        }
        info!(namespace, entry_points, "entry points derived");
        Ok(entry_points)
    }

    async fn unit(&self, namespace: &str, id: &str) -> Result<Option<CodeUnit>, GraphError> {
        let inner = self.inner.read().await;
        Ok(inner
            .get(namespace)
            .and_then(|g| g.units.get(id))
            .cloned())
    }

    async fn units_by_name(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Vec<CodeUnit>, GraphError> {
        let inner = self.inner.read().await;
        let Some(g) = inner.get(namespace) else {
            return Ok(Vec::new());
        };
        let Some(ids) = g.by_name.get(name) else {
            return Ok(Vec::new());
        };
        Ok(ids.iter().filter_map(|id| g.units.get(id)).cloned().collect())
    }

    async fn units_in_file(
        &self,
        namespace: &str,
        file_path: &str,
    ) -> Result<Vec<CodeUnit>, GraphError> {
        let inner = self.inner.read().await;
        let Some(g) = inner.get(namespace) else {
            return Ok(Vec::new());
        };
        let Some(ids) = g.by_file.get(file_path) else {
            return Ok(Vec::new());
        };
        Ok(ids.iter().filter_map(|id| g.units.get(id)).cloned().collect())
    }

    async fn outgoing(
        &self,
        namespace: &str,
        id: &str,
        depth: usize,
    ) -> Result<Vec<CallPath>, GraphError> {
        let inner = self.inner.read().await;
        let Some(g) = inner.get(namespace) else {
            return Ok(Vec::new());
        };
        let Some(&start) = g.index_of.get(id) else {
            return Ok(Vec::new());
        };

        // BFS: the first path reaching a terminal is the shortest one.
        let mut paths: BTreeMap<String, CallPath> = BTreeMap::new();
        let mut queue: VecDeque<Vec<NodeIndex>> = VecDeque::new();
        queue.push_back(vec![start]);
        while let Some(path) = queue.pop_front() {
            if path.len() > depth {
                continue;
            }
            let last = *path.last().unwrap_or(&start);
            for e in g.graph.edges_directed(last, Direction::Outgoing) {
                if *e.weight() != EdgeKind::Calls {
                    continue;
                }
                let next = e.target();
                if path.contains(&next) {
                    continue;
                }
                let mut extended = path.clone();
                extended.push(next);
                let terminal_id = g.graph[next].clone();
                if !paths.contains_key(&terminal_id) {
                    let nodes = extended
                        .iter()
                        .filter_map(|&i| g.units.get(&g.graph[i]))
                        .map(UnitRef::of)
                        .collect();
                    paths.insert(terminal_id, CallPath { nodes });
                }
                queue.push_back(extended);
            }
        }
        Ok(paths.into_values().collect())
    }

    async fn incoming(&self, namespace: &str, id: &str) -> Result<Vec<UnitRef>, GraphError> {
        let inner = self.inner.read().await;
        let Some(g) = inner.get(namespace) else {
            return Ok(Vec::new());
        };
        let Some(&idx) = g.index_of.get(id) else {
            return Ok(Vec::new());
        };
        let mut out: Vec<UnitRef> = g
            .graph
            .edges_directed(idx, Direction::Incoming)
            .filter(|e| *e.weight() == EdgeKind::Calls)
            .filter_map(|e| g.units.get(&g.graph[e.source()]))
            .map(UnitRef::of)
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out.dedup_by(|a, b| a.id == b.id);
        Ok(out)
    }

    async fn purge(&self, namespace: &str) -> Result<PurgeCounts, GraphError> {
        let mut inner = self.inner.write().await;
        let Some(g) = inner.remove(namespace) else {
            return Ok(PurgeCounts::default());
        };
        let counts = g.counts();
        info!(namespace, units = counts.units, "namespace purged from graph");
        Ok(PurgeCounts {
            units: counts.units,
            edges: counts.edges(),
        })
    }

    async fn counts(&self, namespace: &str) -> Result<GraphCounts, GraphError> {
        let inner = self.inner.read().await;
        Ok(inner
            .get(namespace)
            .map(|g| g.counts())
            .unwrap_or_default())
    }
}
