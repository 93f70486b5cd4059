//! Generic line-based driver for languages without a dedicated grammar.
//!
//! Best-effort regex scan: declaration patterns open a unit, the unit extends
//! until the next declaration at the same or shallower indentation (or EOF),
//! and call-looking identifiers inside that range become callees. Precision
//! is deliberately modest; the driver exists so unknown-but-registered
//! languages still land in the graph.

use super::{UnitBuilder, last_segment, render_signature, synthetic_name};
use crate::types::{ImportOrigin, ImportRef, Language, ParseResult, UnitKind};
use crate::LanguageParser;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static FUNC_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:def|fun|fn|func|function|sub)\s+([A-Za-z_]\w*)\s*\(([^)]*)\)")
        .unwrap()
});

static CLASS_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:(?:abstract|final|open|sealed|data|public|export)\s+)*(class|interface|struct|trait)\s+([A-Za-z_]\w*)").unwrap()
});

static IMPORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(?:import|require|include|use|using)\s+['"]?([\w./:@-]+)['"]?"#).unwrap()
});

static CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*)\s*\(").unwrap()
});

/// Keywords that look like calls in most languages but never are.
const CALL_STOPWORDS: &[&str] = &[
    "if", "for", "while", "switch", "match", "return", "catch", "def", "fn", "func",
    "function", "fun", "new", "class", "print",
];

pub struct GenericParser;

impl LanguageParser for GenericParser {
    fn language(&self) -> Language {
        Language::Other
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py", "rb", "kt", "kts", "swift", "php", "scala", "cs"]
    }

    fn parse_string(&self, source: &str, namespace: &str, file_path: &str) -> ParseResult {
        extract(source, namespace, file_path)
    }
}

struct Decl {
    kind: UnitKind,
    name: String,
    parameters: Vec<String>,
    line: usize,
}

fn extract(source: &str, namespace: &str, file_path: &str) -> ParseResult {
    let mut result = ParseResult::empty(Language::Other, namespace, file_path);
    if source.trim().is_empty() {
        return result;
    }

    let b = UnitBuilder::new(namespace, file_path, Language::Other, source);
    let module = b.module_unit();
    let module_id = module.id.clone();
    let module_scope = module.name.clone();
    let total_lines = source.lines().count().max(1);
    result.units.push(module);

    // Imports first: independent of unit spans.
    for cap in IMPORT_LINE.captures_iter(source) {
        let target = cap.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
        if target.is_empty() {
            continue;
        }
        let line = line_of(source, cap.get(0).unwrap().start());
        result.imports.push(ImportRef {
            module_id: module_id.clone(),
            origin: ImportOrigin::Unknown,
            line,
            target,
        });
    }

    // Declarations, sorted by position.
    let mut decls: Vec<Decl> = Vec::new();
    for cap in CLASS_DECL.captures_iter(source) {
        let kw = cap.get(1).map(|m| m.as_str()).unwrap_or("class");
        let name = cap.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        decls.push(Decl {
            kind: if kw == "interface" || kw == "trait" {
                UnitKind::Interface
            } else {
                UnitKind::Class
            },
            name,
            parameters: Vec::new(),
            line: line_of(source, cap.get(0).unwrap().start()),
        });
    }
    for cap in FUNC_DECL.captures_iter(source) {
        let name = cap
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| synthetic_name(&module_scope, 0));
        let parameters = cap
            .get(2)
            .map(|m| param_list(m.as_str()))
            .unwrap_or_default();
        decls.push(Decl {
            kind: UnitKind::Function,
            name,
            parameters,
            line: line_of(source, cap.get(0).unwrap().start()),
        });
    }
    decls.sort_by_key(|d| d.line);

    let lines: Vec<&str> = source.lines().collect();
    for (i, decl) in decls.iter().enumerate() {
        let line_end = decls
            .get(i + 1)
            .map(|next| next.line.saturating_sub(1).max(decl.line))
            .unwrap_or(total_lines);
        let code = lines[decl.line - 1..line_end.min(lines.len())].join("\n");
        let mut unit = b.unit_spanned(decl.kind, &decl.name, decl.line, line_end, &code);
        unit.parent_id = Some(module_id.clone());
        unit.parameters = decl.parameters.clone();
        unit.signature = match decl.kind {
            UnitKind::Function => render_signature(&decl.name, &decl.parameters),
            _ => decl.name.clone(),
        };
        if decl.kind == UnitKind::Function {
            collect_calls(&code, &decl.name, &mut unit.callees);
            if decl.name == "main" {
                unit.entry_hint = true;
            }
        }
        result.units.push(unit);
    }

    debug!(
        file = file_path,
        units = result.units.len(),
        "generic extraction done"
    );
    result
}

fn param_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| {
            // strip defaults, types and sigils: keep the leading identifier
            let head = p.trim().split([':', '=', ' ']).next().unwrap_or("");
            head.trim_matches(|c: char| !c.is_alphanumeric() && c != '_')
                .to_string()
        })
        .filter(|p| !p.is_empty() && p != "self" && p != "this")
        .collect()
}

fn collect_calls(code: &str, own_name: &str, callees: &mut Vec<String>) {
    // skip the declaration line itself
    let body = code.lines().skip(1).collect::<Vec<_>>().join("\n");
    for cap in CALL.captures_iter(&body) {
        let path = cap.get(1).map(|m| m.as_str()).unwrap_or("");
        if path.is_empty() || path == own_name {
            continue;
        }
        if CALL_STOPWORDS.contains(&last_segment(path)) || CALL_STOPWORDS.contains(&path) {
            continue;
        }
        if !callees.iter().any(|c| c == path) {
            callees.push(path.to_string());
        }
    }
}

fn line_of(code: &str, byte_idx: usize) -> usize {
    code[..byte_idx].bytes().filter(|&b| b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP_PY: &str = r#"import flask

class CartService:
    def __init__(self, store):
        self.store = store

def add_item(cart_id, item):
    validate(item)
    store.persist(cart_id, item)

def validate(item):
    pass
"#;

    fn parse(src: &str, path: &str) -> ParseResult {
        GenericParser.parse_string(src, "demo:cart", path)
    }

    #[test]
    fn extracts_classes_functions_and_imports() {
        let res = parse(APP_PY, "app.py");
        assert!(res
            .units
            .iter()
            .any(|u| u.name == "CartService" && u.kind == UnitKind::Class));
        let add = res.units.iter().find(|u| u.name == "add_item").unwrap();
        assert_eq!(add.kind, UnitKind::Function);
        assert_eq!(add.parameters, vec!["cart_id".to_string(), "item".to_string()]);
        assert!(add.callees.iter().any(|c| c == "validate"));
        assert!(add.callees.iter().any(|c| c == "store.persist"));
        assert!(res.imports.iter().any(|i| i.target == "flask"));
    }

    #[test]
    fn units_never_have_empty_names() {
        let res = parse(APP_PY, "app.py");
        assert!(res.units.iter().all(|u| !u.name.is_empty()));
    }

    #[test]
    fn empty_source_is_silent() {
        let res = parse("\n\n", "empty.py");
        assert!(res.units.is_empty());
        assert!(res.errors.is_empty());
    }
}
