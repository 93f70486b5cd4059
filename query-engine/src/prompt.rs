//! Prompt builder: one message carrying the question, numbered doc and code
//! snippets, and the relevant call edges. The model is asked to answer in
//! prose and cite snippets by index.

use crate::types::ContextBundle;
use std::fmt::Write;

/// Keep this short: it steers without wasting tokens.
pub const SYSTEM_PROMPT: &str = "You are a precise code assistant. Answer in prose, \
cite documentation snippets as [D<n>] and code snippets as [C<n>], and say so \
when the context is insufficient.";

/// Render the single user message for the LLM.
pub fn build_prompt(bundle: &ContextBundle) -> String {
    let mut out = String::new();
    out.push_str("Question:\n");
    out.push_str(bundle.question.trim());
    out.push_str("\n\n");

    if !bundle.docs.is_empty() {
        out.push_str("Documentation snippets:\n");
        for (i, doc) in bundle.docs.iter().enumerate() {
            let _ = writeln!(
                out,
                "[D{}] {} (score {:.3})\n{}",
                i + 1,
                doc.title,
                doc.score,
                doc.excerpt.trim()
            );
        }
        out.push('\n');
    }

    if !bundle.code.is_empty() {
        out.push_str("Code snippets:\n");
        for (i, code) in bundle.code.iter().enumerate() {
            let _ = writeln!(
                out,
                "[C{}] {} {}:{} {} (score {:.3})\n{}",
                i + 1,
                code.namespace,
                code.file_path,
                code.line_start,
                code.signature,
                code.score,
                code.code_excerpt.trim()
            );
        }
        out.push('\n');
    }

    if !bundle.call_edges.is_empty() {
        out.push_str("Call edges:\n");
        for edge in &bundle.call_edges {
            let _ = writeln!(out, "{} -> {}", edge.caller, edge.callee);
        }
        out.push('\n');
    }

    if !bundle.cross_namespace_edges.is_empty() {
        out.push_str("Cross-service edges:\n");
        for edge in &bundle.cross_namespace_edges {
            let _ = writeln!(out, "{} -> {}", edge.caller, edge.callee);
        }
        out.push('\n');
    }

    out.push_str("Answer the question using the snippets above; cite by index.\n");
    out
}
