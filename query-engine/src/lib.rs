//! Query-side fusion engine.
//!
//! [`RetrievalEngine`] offers the three primitives (vector search with a
//! namespace filter and cross-store join, bounded CALLS traversal, immediate
//! callers). [`QueryOrchestrator`] fans them out for a natural-language
//! question, assembles a character-bounded context, and optionally calls the
//! LLM. Every step observes a cancellation token and returns partial context
//! when interrupted.

mod context;
mod cross;
mod errors;
mod orchestrate;
mod prompt;
mod retrieve;
mod types;

#[cfg(test)]
mod tests;

pub use context::assemble_context;
pub use cross::{CrossServiceResolver, NoCrossService};
pub use errors::QueryError;
pub use orchestrate::QueryOrchestrator;
pub use prompt::{SYSTEM_PROMPT, build_prompt};
pub use retrieve::{RetrievalConfig, RetrievalEngine};
pub use types::{
    CodeSnippet, ContextBundle, DocSnippet, EdgeLine, QueryOptions, QueryOutcome,
};
