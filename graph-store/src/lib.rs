//! Graph persistence for code units.
//!
//! The crate exposes an abstract [`GraphStore`] (schema setup, per-file
//! transactional upserts, CALLS writes, traversal, purge) plus the in-memory
//! backend [`MemoryGraph`] and the [`GraphLoader`] that turns parser output
//! into nodes and name-resolved edges.
//!
//! Ordering contract: for a namespace, all nodes are written before any CALLS
//! edge; `refresh_entry_points` runs after the CALLS pass.

mod errors;
mod loader;
mod memory;
mod snapshot;
mod store;

#[cfg(test)]
mod tests;

pub use errors::GraphError;
pub use loader::{GraphLoader, PendingCall};
pub use memory::MemoryGraph;
pub use snapshot::{load_snapshot, save_snapshot};
pub use store::{
    CallEdge, CallPath, EdgeKind, FileBatch, GraphCounts, GraphStore, ImportEdge, PurgeCounts,
    UnitRef,
};
