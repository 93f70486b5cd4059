//! Context assembly under a character budget.
//!
//! Snippets are kept in descending score order until the budget is spent;
//! everything that does not fit is dropped (lowest scores go first) and the
//! bundle is marked truncated. Edges are cheap and kept whole.

use crate::types::{CodeSnippet, ContextBundle, DocSnippet, EdgeLine};
use tracing::debug;

fn doc_cost(d: &DocSnippet) -> usize {
    d.title.len() + d.excerpt.len()
}

fn code_cost(c: &CodeSnippet) -> usize {
    c.signature.len() + c.code_excerpt.len() + c.file_path.len()
}

/// Build the bounded bundle from raw retrieval output.
pub fn assemble_context(
    question: &str,
    mut docs: Vec<DocSnippet>,
    mut code: Vec<CodeSnippet>,
    call_edges: Vec<EdgeLine>,
    cross_namespace_edges: Vec<EdgeLine>,
    budget_chars: usize,
) -> ContextBundle {
    docs.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    code.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut bundle = ContextBundle {
        question: question.to_string(),
        call_edges,
        cross_namespace_edges,
        ..ContextBundle::default()
    };
    let mut spent = question.len();
    let mut truncated = false;

    for doc in docs {
        let cost = doc_cost(&doc);
        if spent + cost > budget_chars {
            truncated = true;
            continue;
        }
        spent += cost;
        bundle.docs.push(doc);
    }
    for snippet in code {
        let cost = code_cost(&snippet);
        if spent + cost > budget_chars {
            truncated = true;
            continue;
        }
        spent += cost;
        bundle.code.push(snippet);
    }

    bundle.total_chars = spent;
    bundle.truncated = truncated;
    debug!(
        docs = bundle.docs.len(),
        code = bundle.code.len(),
        total_chars = bundle.total_chars,
        truncated = bundle.truncated,
        "context assembled"
    );
    bundle
}
