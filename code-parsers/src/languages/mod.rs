//! Language extractors.
//!
//! Every extractor walks the Tree-sitter AST with a plain DFS (no `Query`
//! API, version-agnostic) and emits units into a [`ParseResult`]. Shared
//! mechanics live here: span/code slicing, leading-comment collection,
//! dotted-path flattening for call targets, and synthetic names for
//! anonymous functions.

pub mod ecma;
pub mod generic;
pub mod go;
pub mod java;

use crate::ids::unit_id;
use crate::types::{CodeUnit, Language, ParseIssue, ParseResult, UnitKind};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tree_sitter::Node;

/// Dotted identifier path, e.g. `a`, `a.b`, `pkg.Type.Method`.
static DOTTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$").unwrap()
});

pub(crate) fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// 1-based line span of a node.
pub(crate) fn line_span(node: Node<'_>) -> (usize, usize) {
    (
        node.start_position().row + 1,
        node.end_position().row + 1,
    )
}

/// Flatten a call-target expression into a dotted path, or `None` when the
/// expression is not a plain identifier chain (computed calls, literals).
pub(crate) fn dotted_path(node: Node<'_>, source: &str) -> Option<String> {
    let raw: String = node_text(node, source)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if DOTTED.is_match(&raw) {
        Some(raw)
    } else {
        None
    }
}

/// Last segment of a dotted path (`a.b.c` → `c`).
pub(crate) fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// Synthetic name for an anonymous function: enclosing scope + line.
pub(crate) fn synthetic_name(scope: &str, line: usize) -> String {
    format!("{scope}_anon_l{line}")
}

/// Render the language-neutral signature: name + parenthesized parameter
/// names, no types.
pub(crate) fn render_signature(name: &str, parameters: &[String]) -> String {
    format!("{}({})", name, parameters.join(", "))
}

/// Collect the contiguous comment block immediately above `node`.
///
/// Comment markers (`//`, `///`, `/*`, `*/`, leading `*`) are stripped
/// per line; the result may be empty.
pub(crate) fn leading_doc(node: Node<'_>, source: &str, comment_kinds: &[&str]) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut expect_row = node.start_position().row;
    let mut cur = node.prev_sibling();
    while let Some(c) = cur {
        if !comment_kinds.contains(&c.kind()) {
            break;
        }
        if c.end_position().row + 1 != expect_row {
            break;
        }
        blocks.push(strip_comment_markers(node_text(c, source)));
        expect_row = c.start_position().row;
        cur = c.prev_sibling();
    }
    blocks.reverse();
    blocks.join("\n").trim().to_string()
}

fn strip_comment_markers(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            let t = line.trim();
            let t = t.strip_prefix("///").unwrap_or(t);
            let t = t.strip_prefix("//").unwrap_or(t);
            let t = t.strip_prefix("/**").unwrap_or(t);
            let t = t.strip_prefix("/*").unwrap_or(t);
            let t = t.strip_suffix("*/").unwrap_or(t);
            let t = t.strip_prefix('*').unwrap_or(t);
            t.trim()
        })
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Module name for a file: its stem, falling back to the full path.
pub(crate) fn module_name(file_path: &str) -> String {
    Path::new(file_path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_path.to_string())
}

/// Shared constructor for units: fills identity, span, and code slice.
pub(crate) struct UnitBuilder<'a> {
    pub namespace: &'a str,
    pub file_path: &'a str,
    pub language: Language,
    pub source: &'a str,
}

impl<'a> UnitBuilder<'a> {
    pub fn new(namespace: &'a str, file_path: &'a str, language: Language, source: &'a str) -> Self {
        Self {
            namespace,
            file_path,
            language,
            source,
        }
    }

    /// Build a unit for an AST node.
    pub fn unit(&self, kind: UnitKind, name: &str, node: Node<'_>) -> CodeUnit {
        let (line_start, line_end) = line_span(node);
        self.unit_spanned(kind, name, line_start, line_end, node_text(node, self.source))
    }

    /// Build a unit from explicit span/code (module units, generic driver).
    pub fn unit_spanned(
        &self,
        kind: UnitKind,
        name: &str,
        line_start: usize,
        line_end: usize,
        code: &str,
    ) -> CodeUnit {
        CodeUnit {
            id: unit_id(
                self.namespace,
                self.language,
                self.file_path,
                kind,
                name,
                line_start,
            ),
            name: name.to_string(),
            kind,
            language: self.language,
            namespace: self.namespace.to_string(),
            file_path: self.file_path.to_string(),
            line_start,
            line_end,
            signature: render_signature(name, &[]),
            parameters: Vec::new(),
            docstring: String::new(),
            code: code.to_string(),
            callees: Vec::new(),
            parent_id: None,
            entry_hint: false,
            is_entry_point: false,
        }
    }

    /// The module unit spanning the whole file.
    pub fn module_unit(&self) -> CodeUnit {
        let name = module_name(self.file_path);
        let lines = self.source.lines().count().max(1);
        let mut unit = self.unit_spanned(UnitKind::Module, &name, 1, lines, self.source);
        unit.signature = name;
        unit
    }
}

/// Record a best-effort notice when the grammar flagged syntax errors.
pub(crate) fn note_syntax_errors(root: Node<'_>, result: &mut ParseResult) {
    if root.has_error() {
        result.errors.push(ParseIssue {
            file_path: result.file_path.clone(),
            line: None,
            message: "syntax errors present; extraction is best-effort".to_string(),
        });
    }
}

/// Dotted paths that register HTTP handlers. A unit passed as an argument to
/// one of these becomes an entry-point candidate.
pub(crate) fn is_handler_registration(path: &str) -> bool {
    if path.contains(".Handle") || path.contains(".HandleFunc") {
        return true;
    }
    if path.contains("Route") || path.contains("Router") {
        return true;
    }
    let lower = path.to_ascii_lowercase();
    if let Some(rest) = lower.strip_prefix("router.") {
        return matches!(
            last_segment(rest),
            "get" | "post" | "put" | "delete" | "patch"
        );
    }
    false
}

/// Web annotations that mark a unit as an entry-point candidate.
pub(crate) fn is_web_annotation(name: &str) -> bool {
    matches!(
        name,
        "RestController"
            | "RequestMapping"
            | "GetMapping"
            | "PostMapping"
            | "PutMapping"
            | "DeleteMapping"
            | "PatchMapping"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_registration_paths() {
        assert!(is_handler_registration("mux.HandleFunc"));
        assert!(is_handler_registration("http.Handle"));
        assert!(is_handler_registration("app.Route"));
        assert!(is_handler_registration("router.get"));
        assert!(!is_handler_registration("fmt.Sprintf"));
    }

    #[test]
    fn synthetic_names_are_never_empty() {
        let n = synthetic_name("index", 3);
        assert!(!n.is_empty());
        assert_eq!(n, "index_anon_l3");
    }

    #[test]
    fn signature_rendering() {
        assert_eq!(render_signature("f", &[]), "f()");
        assert_eq!(
            render_signature("add", &["a".into(), "b".into()]),
            "add(a, b)"
        );
    }
}
