//! Portable, language-agnostic schema shared by the whole pipeline.
//!
//! Design goals:
//! - Language-neutral core with minimal assumptions.
//! - Stable IDs via content hashes (computed in [`crate::ids`]).
//! - `serde(rename_all = "snake_case")` for enums to keep serialized forms
//!   stable across the graph store and vector payloads.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Language discriminator for parsed files.
///
/// `Other` covers files handled by the generic line-based driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Go,
    Javascript,
    Typescript,
    Java,
    Other,
}

impl Display for Language {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Language::Go => "go",
            Language::Javascript => "javascript",
            Language::Typescript => "typescript",
            Language::Java => "java",
            Language::Other => "other",
        };
        f.write_str(s)
    }
}

/// Code-unit taxonomy. Keep the set stable; graph labels derive from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Module,
    Class,
    Function,
    Method,
    Interface,
}

impl Display for UnitKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnitKind::Module => "module",
            UnitKind::Class => "class",
            UnitKind::Function => "function",
            UnitKind::Method => "method",
            UnitKind::Interface => "interface",
        };
        f.write_str(s)
    }
}

/// A parsed source element with stable identity.
///
/// One record per addressable entity. `callees` holds the *unresolved* dotted
/// call targets captured at parse time; resolution into CALLS edges happens in
/// the graph loader, never here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeUnit {
    /// Content-addressed id, 32 lowercase hex chars (see [`crate::ids`]).
    pub id: String,
    /// Declared identifier. Anonymous functions get a synthetic name derived
    /// from the enclosing scope and line; never empty.
    pub name: String,
    pub kind: UnitKind,
    pub language: Language,
    /// Colon-qualified ingestion scope, e.g. `sock_shop:payment`.
    pub namespace: String,
    /// Repo-relative path of the defining file.
    pub file_path: String,
    /// 1-based inclusive line span.
    pub line_start: usize,
    pub line_end: usize,
    /// Language-neutral rendered signature: name + parenthesized parameter
    /// names, no types.
    pub signature: String,
    /// Ordered parameter identifiers.
    pub parameters: Vec<String>,
    /// Leading comment/doc block; may be empty.
    pub docstring: String,
    /// Source substring for the unit (embedding input).
    pub code: String,
    /// Unresolved callee names, method chains flattened as `a.b.c`. Deduped,
    /// source order preserved.
    pub callees: Vec<String>,
    /// Enclosing module or class within the same file; `None` only for the
    /// module unit itself.
    pub parent_id: Option<String>,
    /// Parse-time entry-point hint (heuristic match on kind/name/annotations).
    /// The authoritative `is_entry_point` is derived after CALLS edges exist.
    pub entry_hint: bool,
    /// Derived flag: `entry_hint` and no incoming CALLS edges.
    #[serde(default)]
    pub is_entry_point: bool,
}

impl CodeUnit {
    /// Push a callee path, keeping the list deduplicated in source order.
    pub fn push_callee(&mut self, path: String) {
        if !self.callees.iter().any(|c| c == &path) {
            self.callees.push(path);
        }
    }
}

/// Classifies the origin of an import target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportOrigin {
    /// Language/standard library module.
    Std,
    /// Third-party dependency.
    Package,
    /// Repository-relative file.
    Local,
    Unknown,
}

/// An import directive captured from a module.
///
/// The target is kept textual; it may or may not resolve to an ingested unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRef {
    /// Id of the importing module unit.
    pub module_id: String,
    /// Imported target as written (quotes stripped).
    pub target: String,
    pub origin: ImportOrigin,
    pub line: usize,
}

/// Recoverable, per-file parse problem. Never halts ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseIssue {
    pub file_path: String,
    pub line: Option<usize>,
    pub message: String,
}

/// Uniform output of every language parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResult {
    pub file_path: String,
    pub language: Language,
    pub namespace: String,
    pub units: Vec<CodeUnit>,
    pub imports: Vec<ImportRef>,
    pub errors: Vec<ParseIssue>,
}

impl ParseResult {
    /// An empty result carrying only identity fields.
    pub fn empty(language: Language, namespace: &str, file_path: &str) -> Self {
        Self {
            file_path: file_path.to_string(),
            language,
            namespace: namespace.to_string(),
            units: Vec::new(),
            imports: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// The module unit for this file, if the file produced one.
    pub fn module(&self) -> Option<&CodeUnit> {
        self.units.iter().find(|u| u.kind == UnitKind::Module)
    }
}

/// Returns a clamped copy of `s` limited by `max_chars`, preserving line
/// boundaries where possible and keeping the output valid UTF-8.
pub fn clamp_excerpt(s: &str, max_chars: usize) -> String {
    if s.len() <= max_chars {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, line) in s.lines().enumerate() {
        let need = line.len() + if i > 0 { 1 } else { 0 };
        if out.len() + need > max_chars {
            // A single oversized first line is cut at a char boundary.
            if out.is_empty() {
                let mut end = max_chars;
                while end > 0 && !line.is_char_boundary(end) {
                    end -= 1;
                }
                out.push_str(&line[..end]);
            }
            break;
        }
        if i > 0 {
            out.push('\n');
        }
        out.push_str(line);
    }
    out
}
