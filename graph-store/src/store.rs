//! Abstract graph-store interface and its row types.
//!
//! The interface is domain-level: upserts are per-file transactions, reads
//! return scalar rows ([`UnitRef`], [`CallEdge`]), and every operation is
//! namespace-scoped. Backends must keep upserts idempotent.

use crate::errors::GraphError;
use async_trait::async_trait;
use code_parsers::{CodeUnit, ImportOrigin, ImportRef, UnitKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Edge labels persisted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Contains,
    Calls,
    Imports,
}

impl Display for EdgeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EdgeKind::Contains => "contains",
            EdgeKind::Calls => "calls",
            EdgeKind::Imports => "imports",
        };
        f.write_str(s)
    }
}

/// One file's worth of nodes and structural edges, applied atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileBatch {
    pub namespace: String,
    pub file_path: String,
    pub units: Vec<CodeUnit>,
    pub imports: Vec<ImportRef>,
}

/// A resolved CALLS edge between two units of the same namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallEdge {
    pub caller_id: String,
    pub callee_id: String,
}

/// Import edge row: importing module plus the textual target, which may or
/// may not correspond to an ingested unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportEdge {
    pub namespace: String,
    pub module_id: String,
    pub target: String,
    pub origin: ImportOrigin,
    pub line: usize,
}

/// Scalar row describing a unit in traversal results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRef {
    pub id: String,
    pub name: String,
    pub kind: UnitKind,
    pub file_path: String,
}

impl UnitRef {
    pub fn of(unit: &CodeUnit) -> Self {
        Self {
            id: unit.id.clone(),
            name: unit.name.clone(),
            kind: unit.kind,
            file_path: unit.file_path.clone(),
        }
    }
}

/// A CALLS path from an origin unit; the last node is the terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallPath {
    pub nodes: Vec<UnitRef>,
}

impl CallPath {
    pub fn terminal(&self) -> Option<&UnitRef> {
        self.nodes.last()
    }
}

/// Node/edge tallies for a namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphCounts {
    pub units: usize,
    pub contains: usize,
    pub calls: usize,
    pub imports: usize,
}

impl GraphCounts {
    pub fn edges(&self) -> usize {
        self.contains + self.calls + self.imports
    }
}

/// What a purge removed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PurgeCounts {
    pub units: usize,
    pub edges: usize,
}

/// Abstract graph backend.
///
/// `ensure_schema` is one-shot and idempotent; mutating calls before a
/// successful `ensure_schema` fail with [`GraphError::SchemaNotReady`].
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Establish the uniqueness constraint on `(namespace, id)` and the
    /// `namespace` / `namespace+name` / `namespace+file_path` indexes.
    async fn ensure_schema(&self) -> Result<(), GraphError>;

    /// Upsert one file's units and structural edges transactionally: either
    /// the whole batch lands or the file's previous state is kept.
    async fn apply_file(&self, batch: FileBatch) -> Result<(), GraphError>;

    /// Write resolved CALLS edges. Both endpoints must already exist in
    /// `namespace`. Duplicate edges are ignored (idempotent re-runs).
    async fn write_calls(&self, namespace: &str, edges: &[CallEdge]) -> Result<usize, GraphError>;

    /// Re-derive `is_entry_point` for every unit in the namespace: hint set
    /// at parse time and no incoming CALLS. Returns the entry-point count.
    async fn refresh_entry_points(&self, namespace: &str) -> Result<usize, GraphError>;

    async fn unit(&self, namespace: &str, id: &str) -> Result<Option<CodeUnit>, GraphError>;

    async fn units_by_name(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Vec<CodeUnit>, GraphError>;

    async fn units_in_file(
        &self,
        namespace: &str,
        file_path: &str,
    ) -> Result<Vec<CodeUnit>, GraphError>;

    /// CALLS paths from `id`, bounded by `depth`, deduplicated by terminal
    /// node (shortest path wins).
    async fn outgoing(
        &self,
        namespace: &str,
        id: &str,
        depth: usize,
    ) -> Result<Vec<CallPath>, GraphError>;

    /// Immediate callers of `id`.
    async fn incoming(&self, namespace: &str, id: &str) -> Result<Vec<UnitRef>, GraphError>;

    /// Remove every node, edge, and import row in the namespace.
    async fn purge(&self, namespace: &str) -> Result<PurgeCounts, GraphError>;

    async fn counts(&self, namespace: &str) -> Result<GraphCounts, GraphError>;
}
