//! Go extractor.
//!
//! Walks the tree-sitter-go AST and emits units for top-level functions,
//! structs, interfaces, methods (receiver funcs and interface elements),
//! imports, and textual call targets. Receiver methods attach to the struct
//! declared in the same file when one exists, otherwise to the module unit.

use super::{
    UnitBuilder, dotted_path, is_handler_registration, last_segment, leading_doc, node_text,
    note_syntax_errors, render_signature,
};
use crate::types::{
    CodeUnit, ImportOrigin, ImportRef, Language, ParseIssue, ParseResult, UnitKind,
};
use crate::LanguageParser;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use tree_sitter::{Node, Parser};

const COMMENT_KINDS: &[&str] = &["comment"];

pub struct GoParser;

impl LanguageParser for GoParser {
    fn language(&self) -> Language {
        Language::Go
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn parse_string(&self, source: &str, namespace: &str, file_path: &str) -> ParseResult {
        extract(source, namespace, file_path)
    }
}

fn extract(source: &str, namespace: &str, file_path: &str) -> ParseResult {
    let mut result = ParseResult::empty(Language::Go, namespace, file_path);
    if source.trim().is_empty() {
        return result;
    }

    let mut parser = Parser::new();
    if let Err(err) = parser.set_language(&tree_sitter_go::LANGUAGE.into()) {
        result.errors.push(ParseIssue {
            file_path: file_path.to_string(),
            line: None,
            message: format!("go grammar unavailable: {err}"),
        });
        return result;
    }
    let Some(tree) = parser.parse(source, None) else {
        result.errors.push(ParseIssue {
            file_path: file_path.to_string(),
            line: None,
            message: "tree-sitter returned no tree".to_string(),
        });
        return result;
    };
    let root = tree.root_node();
    note_syntax_errors(root, &mut result);

    let b = UnitBuilder::new(namespace, file_path, Language::Go, source);
    let module = b.module_unit();
    let module_id = module.id.clone();
    result.units.push(module);

    let mut cursor = root.walk();
    let decls: Vec<Node<'_>> = root.named_children(&mut cursor).collect();

    // First pass: named types, so receiver methods can attach to them.
    let mut type_ids: HashMap<String, String> = HashMap::new();
    for decl in &decls {
        if decl.kind() != "type_declaration" {
            continue;
        }
        let doc = leading_doc(*decl, source, COMMENT_KINDS);
        let mut c = decl.walk();
        for spec in decl.named_children(&mut c) {
            if spec.kind() != "type_spec" {
                continue;
            }
            let Some(name_node) = spec.child_by_field_name("name") else {
                continue;
            };
            let name = node_text(name_node, source).to_string();
            if name.is_empty() {
                continue;
            }
            let kind = match spec.child_by_field_name("type").map(|t| t.kind()) {
                Some("struct_type") => UnitKind::Class,
                Some("interface_type") => UnitKind::Interface,
                _ => continue,
            };
            let mut unit = b.unit(kind, &name, spec);
            unit.parent_id = Some(module_id.clone());
            unit.docstring = doc.clone();
            unit.signature = name.clone();
            type_ids.insert(name, unit.id.clone());
            let parent = unit.id.clone();
            let type_body = spec.child_by_field_name("type");
            result.units.push(unit);

            if kind == UnitKind::Interface {
                if let Some(body) = type_body {
                    emit_interface_methods(&b, body, &parent, source, &mut result);
                }
            }
        }
    }

    // Second pass: functions, receiver methods, imports.
    for decl in &decls {
        match decl.kind() {
            "function_declaration" => {
                let Some(name_node) = decl.child_by_field_name("name") else {
                    continue;
                };
                let name = node_text(name_node, source).to_string();
                if name.is_empty() {
                    continue;
                }
                let mut unit = b.unit(UnitKind::Function, &name, *decl);
                unit.parameters = param_names(decl.child_by_field_name("parameters"), source);
                unit.signature = render_signature(&name, &unit.parameters);
                unit.docstring = leading_doc(*decl, source, COMMENT_KINDS);
                unit.parent_id = Some(module_id.clone());
                if let Some(body) = decl.child_by_field_name("body") {
                    collect_calls(body, source, &mut unit);
                }
                result.units.push(unit);
            }
            "method_declaration" => {
                let Some(name_node) = decl.child_by_field_name("name") else {
                    continue;
                };
                let name = node_text(name_node, source).to_string();
                if name.is_empty() {
                    continue;
                }
                let mut unit = b.unit(UnitKind::Method, &name, *decl);
                unit.parameters = param_names(decl.child_by_field_name("parameters"), source);
                unit.signature = render_signature(&name, &unit.parameters);
                unit.docstring = leading_doc(*decl, source, COMMENT_KINDS);
                unit.parent_id = decl
                    .child_by_field_name("receiver")
                    .and_then(|r| receiver_type(r, source))
                    .and_then(|t| type_ids.get(&t).cloned())
                    .or_else(|| Some(module_id.clone()));
                if let Some(body) = decl.child_by_field_name("body") {
                    collect_calls(body, source, &mut unit);
                }
                result.units.push(unit);
            }
            "import_declaration" => {
                collect_imports(*decl, source, &module_id, &mut result.imports);
            }
            _ => {}
        }
    }

    apply_entry_hints(root, source, &mut result.units);
    debug!(
        file = file_path,
        units = result.units.len(),
        imports = result.imports.len(),
        "go extraction done"
    );
    result
}

fn emit_interface_methods(
    b: &UnitBuilder<'_>,
    interface_body: Node<'_>,
    parent_id: &str,
    source: &str,
    result: &mut ParseResult,
) {
    let mut c = interface_body.walk();
    for elem in interface_body.named_children(&mut c) {
        if !matches!(elem.kind(), "method_elem" | "method_spec") {
            continue;
        }
        let Some(name_node) = elem.child_by_field_name("name") else {
            continue;
        };
        let name = node_text(name_node, source).to_string();
        if name.is_empty() {
            continue;
        }
        let mut unit = b.unit(UnitKind::Method, &name, elem);
        unit.parameters = param_names(elem.child_by_field_name("parameters"), source);
        unit.signature = render_signature(&name, &unit.parameters);
        unit.docstring = leading_doc(elem, source, COMMENT_KINDS);
        unit.parent_id = Some(parent_id.to_string());
        result.units.push(unit);
    }
}

/// Receiver type name: the first type identifier inside the receiver list
/// (`(s *service)` → `service`).
fn receiver_type(receiver: Node<'_>, source: &str) -> Option<String> {
    let mut stack = vec![receiver];
    while let Some(n) = stack.pop() {
        if n.kind() == "type_identifier" {
            return Some(node_text(n, source).to_string());
        }
        for i in (0..n.named_child_count()).rev() {
            if let Some(c) = n.named_child(i) {
                stack.push(c);
            }
        }
    }
    None
}

fn param_names(params: Option<Node<'_>>, source: &str) -> Vec<String> {
    let Some(list) = params else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut c = list.walk();
    for decl in list.named_children(&mut c) {
        if !matches!(
            decl.kind(),
            "parameter_declaration" | "variadic_parameter_declaration"
        ) {
            continue;
        }
        let mut c2 = decl.walk();
        for child in decl.named_children(&mut c2) {
            if child.kind() == "identifier" {
                out.push(node_text(child, source).to_string());
            }
        }
    }
    out
}

fn collect_calls(body: Node<'_>, source: &str, unit: &mut CodeUnit) {
    let mut stack = vec![body];
    while let Some(n) = stack.pop() {
        if n.kind() == "call_expression" {
            if let Some(f) = n.child_by_field_name("function") {
                if let Some(path) = dotted_path(f, source) {
                    unit.push_callee(path);
                }
            }
        }
        for i in (0..n.named_child_count()).rev() {
            if let Some(c) = n.named_child(i) {
                stack.push(c);
            }
        }
    }
}

fn collect_imports(
    decl: Node<'_>,
    source: &str,
    module_id: &str,
    imports: &mut Vec<ImportRef>,
) {
    let mut stack = vec![decl];
    while let Some(n) = stack.pop() {
        if n.kind() == "import_spec" {
            if let Some(path_node) = n.child_by_field_name("path") {
                let target = node_text(path_node, source).trim_matches('"').to_string();
                if !target.is_empty() {
                    imports.push(ImportRef {
                        module_id: module_id.to_string(),
                        origin: classify_import(&target),
                        line: n.start_position().row + 1,
                        target,
                    });
                }
            }
        }
        for i in (0..n.named_child_count()).rev() {
            if let Some(c) = n.named_child(i) {
                stack.push(c);
            }
        }
    }
}

/// Go import origin: domain-qualified paths are packages, relative paths are
/// local, bare paths are the standard library.
fn classify_import(target: &str) -> ImportOrigin {
    if target.starts_with("./") || target.starts_with("../") {
        return ImportOrigin::Local;
    }
    match target.split('/').next() {
        Some(head) if head.contains('.') => ImportOrigin::Package,
        Some(_) => ImportOrigin::Std,
        None => ImportOrigin::Unknown,
    }
}

/// Mark entry-point hints: `main`, and functions referenced as arguments to
/// handler-registration calls anywhere in the file.
fn apply_entry_hints(root: Node<'_>, source: &str, units: &mut [CodeUnit]) {
    let mut candidates: HashSet<String> = HashSet::new();
    let mut stack = vec![root];
    while let Some(n) = stack.pop() {
        if n.kind() == "call_expression" {
            let is_registration = n
                .child_by_field_name("function")
                .and_then(|f| dotted_path(f, source))
                .is_some_and(|p| is_handler_registration(&p));
            if is_registration {
                if let Some(args) = n.child_by_field_name("arguments") {
                    let mut c = args.walk();
                    for arg in args.named_children(&mut c) {
                        match arg.kind() {
                            "identifier" => {
                                candidates.insert(node_text(arg, source).to_string());
                            }
                            "selector_expression" => {
                                if let Some(p) = dotted_path(arg, source) {
                                    candidates.insert(last_segment(&p).to_string());
                                }
                            }
                            _ => {}
                        }
                    }
                }
            }
        }
        for i in (0..n.named_child_count()).rev() {
            if let Some(c) = n.named_child(i) {
                stack.push(c);
            }
        }
    }

    for unit in units.iter_mut() {
        match unit.kind {
            UnitKind::Function if unit.name == "main" => unit.entry_hint = true,
            UnitKind::Function | UnitKind::Method if candidates.contains(&unit.name) => {
                unit.entry_hint = true;
            }
            _ => {}
        }
    }
}
