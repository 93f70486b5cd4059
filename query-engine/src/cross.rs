//! Cross-service hook.
//!
//! CALLS edges never cross namespaces in the graph; links between services
//! (HTTP client wrappers, queues) are derived at the application layer. The
//! orchestrator consults this hook so such a layer can contribute edges; the
//! default implementation returns nothing.

use crate::types::EdgeLine;
use async_trait::async_trait;

#[async_trait]
pub trait CrossServiceResolver: Send + Sync {
    /// Inter-namespace edges relevant to the given unit ids.
    async fn cross_namespace_edges(&self, unit_ids: &[String]) -> Vec<EdgeLine>;
}

/// Default resolver: no cross-service knowledge.
pub struct NoCrossService;

#[async_trait]
impl CrossServiceResolver for NoCrossService {
    async fn cross_namespace_edges(&self, _unit_ids: &[String]) -> Vec<EdgeLine> {
        Vec::new()
    }
}
