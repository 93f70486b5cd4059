//! Public result and option types for the query surface.

use serde::{Deserialize, Serialize};

/// Knobs for one query. Defaults mirror the driver API contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Colon-qualified namespace, a bare prefix (filter-only), or `None` for
    /// all namespaces.
    pub namespace: Option<String>,
    pub k_code: usize,
    pub k_doc: usize,
    /// Graph traversal fan-out: top hits that get outgoing/incoming lookups.
    pub m_graph: usize,
    /// Bounded CALLS path depth.
    pub depth: usize,
    pub budget_chars: usize,
    pub use_llm: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            namespace: None,
            k_code: 10,
            k_doc: 3,
            m_graph: 5,
            depth: 3,
            budget_chars: 12_000,
            use_llm: true,
        }
    }
}

/// Documentation snippet for the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocSnippet {
    pub title: String,
    pub excerpt: String,
    pub score: f32,
}

/// Code snippet for the prompt, joined back to the graph by `original_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSnippet {
    pub original_id: String,
    pub namespace: String,
    pub name: String,
    pub file_path: String,
    pub line_start: usize,
    pub signature: String,
    pub code_excerpt: String,
    pub score: f32,
}

/// A rendered CALLS edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeLine {
    pub caller: String,
    pub callee: String,
}

/// The size-bounded context handed to the LLM and returned to the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextBundle {
    pub question: String,
    pub docs: Vec<DocSnippet>,
    pub code: Vec<CodeSnippet>,
    pub call_edges: Vec<EdgeLine>,
    pub cross_namespace_edges: Vec<EdgeLine>,
    pub total_chars: usize,
    /// True when snippets were dropped to fit the budget.
    pub truncated: bool,
}

/// Final result: the context always, the answer when the LLM ran and
/// succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub answer: Option<String>,
    /// Whether the LLM step was attempted (it may still have failed; the
    /// context is returned either way).
    pub llm_ran: bool,
    pub context: ContextBundle,
}
