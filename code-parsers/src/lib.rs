//! Language parsers and the shared code-unit schema.
//!
//! This crate is the bottom of the pipeline. It turns source text into a
//! uniform [`ParseResult`] regardless of language, and owns the stable
//! identifier scheme every other crate joins on.
//!
//! Layout:
//! - [`types`]: language-agnostic schema (`CodeUnit`, `ParseResult`, enums);
//! - [`ids`]: content-addressed unit identifiers;
//! - [`registry`]: extension/tag dispatch to language parsers;
//! - [`languages`]: one extractor per supported language plus a generic
//!   line-based fallback.

pub mod ids;
pub mod languages;
pub mod registry;
pub mod types;

pub use registry::ParserRegistry;
pub use types::{
    CodeUnit, ImportOrigin, ImportRef, Language, ParseIssue, ParseResult, UnitKind,
};

use std::path::Path;

/// Capability set implemented by every language parser.
///
/// Implementations must be infallible at the API level: malformed input
/// produces an empty `units` list plus populated `errors`, never a panic.
pub trait LanguageParser: Send + Sync {
    /// Language tag this parser produces units for.
    fn language(&self) -> Language;

    /// File extensions (lowercase, without dot) claimed by this parser.
    fn extensions(&self) -> &'static [&'static str];

    /// Parse in-memory source into a [`ParseResult`].
    fn parse_string(&self, source: &str, namespace: &str, file_path: &str) -> ParseResult;

    /// Parse a file from disk. I/O failures are recorded as a parse issue.
    fn parse_file(&self, path: &Path, namespace: &str) -> ParseResult {
        let file_path = path.to_string_lossy().to_string();
        match std::fs::read_to_string(path) {
            Ok(source) => self.parse_string(&source, namespace, &file_path),
            Err(err) => {
                let mut res = ParseResult::empty(self.language(), namespace, &file_path);
                res.errors.push(ParseIssue {
                    file_path,
                    line: None,
                    message: format!("read failed: {err}"),
                });
                res
            }
        }
    }
}
