//! JavaScript / TypeScript extractor.
//!
//! Both grammars share node shapes, so one walk serves both languages.
//! Captured units: function declarations, top-level arrow/function
//! expressions assigned to identifiers, IIFEs (synthetic name), classes and
//! their methods, TS interfaces and enums. Imports cover ES6 `import` and
//! CommonJS `require()`.
//!
//! Known gap: deeply nested anonymous callbacks are not emitted as units;
//! their calls attach to the nearest enclosing named unit instead.

use super::{
    UnitBuilder, dotted_path, is_handler_registration, last_segment, leading_doc, node_text,
    note_syntax_errors, render_signature, synthetic_name,
};
use crate::types::{
    ImportOrigin, ImportRef, Language, ParseIssue, ParseResult, UnitKind,
};
use crate::LanguageParser;
use std::collections::HashSet;
use tracing::debug;
use tree_sitter::{Node, Parser};

const COMMENT_KINDS: &[&str] = &["comment"];

pub struct JavascriptParser;

impl LanguageParser for JavascriptParser {
    fn language(&self) -> Language {
        Language::Javascript
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["js", "jsx", "mjs", "cjs"]
    }

    fn parse_string(&self, source: &str, namespace: &str, file_path: &str) -> ParseResult {
        extract(source, namespace, file_path, Language::Javascript)
    }
}

pub struct TypescriptParser;

impl LanguageParser for TypescriptParser {
    fn language(&self) -> Language {
        Language::Typescript
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ts", "tsx"]
    }

    fn parse_string(&self, source: &str, namespace: &str, file_path: &str) -> ParseResult {
        extract(source, namespace, file_path, Language::Typescript)
    }
}

fn grammar(language: Language) -> tree_sitter::Language {
    match language {
        Language::Typescript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        _ => tree_sitter_javascript::LANGUAGE.into(),
    }
}

fn extract(source: &str, namespace: &str, file_path: &str, language: Language) -> ParseResult {
    let mut result = ParseResult::empty(language, namespace, file_path);
    if source.trim().is_empty() {
        return result;
    }

    let mut parser = Parser::new();
    if let Err(err) = parser.set_language(&grammar(language)) {
        result.errors.push(ParseIssue {
            file_path: file_path.to_string(),
            line: None,
            message: format!("grammar unavailable: {err}"),
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

    let b = UnitBuilder::new(namespace, file_path, language, source);
    let module = b.module_unit();
    let module_id = module.id.clone();
    let module_scope = module.name.clone();
    result.units.push(module);

    let mut candidates: HashSet<String> = HashSet::new();
    walk(
        root,
        source,
        &b,
        &module_id,
        None,
        &module_scope,
        &mut result,
        &mut candidates,
    );

    for unit in result.units.iter_mut() {
        match unit.kind {
            UnitKind::Function if unit.name == "main" => unit.entry_hint = true,
            UnitKind::Function | UnitKind::Method if candidates.contains(&unit.name) => {
                unit.entry_hint = true;
            }
            _ => {}
        }
    }

    debug!(
        file = file_path,
        units = result.units.len(),
        imports = result.imports.len(),
        "ecma extraction done"
    );
    result
}

/// Recursive walk carrying the enclosing container (`parent_id`) and the
/// index of the nearest enclosing callable unit (`enclosing`), which receives
/// captured call targets.
#[allow(clippy::too_many_arguments)]
fn walk(
    node: Node<'_>,
    source: &str,
    b: &UnitBuilder<'_>,
    parent_id: &str,
    enclosing: Option<usize>,
    module_scope: &str,
    out: &mut ParseResult,
    candidates: &mut HashSet<String>,
) {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                if !name.is_empty() {
                    let idx = emit_callable(node, source, b, UnitKind::Function, &name, parent_id, out);
                    descend(node, source, b, parent_id, Some(idx), module_scope, out, candidates);
                    return;
                }
            }
        }
        "class_declaration" | "abstract_class_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                if !name.is_empty() {
                    let mut unit = b.unit(UnitKind::Class, &name, node);
                    unit.signature = name.clone();
                    unit.docstring = leading_doc(node, source, COMMENT_KINDS);
                    unit.parent_id = Some(parent_id.to_string());
                    let class_id = unit.id.clone();
                    out.units.push(unit);
                    descend(node, source, b, &class_id, enclosing, module_scope, out, candidates);
                    return;
                }
            }
        }
        "method_definition" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                if !name.is_empty() {
                    let idx = emit_callable(node, source, b, UnitKind::Method, &name, parent_id, out);
                    descend(node, source, b, parent_id, Some(idx), module_scope, out, candidates);
                    return;
                }
            }
        }
        "interface_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                if !name.is_empty() {
                    let mut unit = b.unit(UnitKind::Interface, &name, node);
                    unit.signature = name.clone();
                    unit.docstring = leading_doc(node, source, COMMENT_KINDS);
                    unit.parent_id = Some(parent_id.to_string());
                    let iface_id = unit.id.clone();
                    out.units.push(unit);
                    descend(node, source, b, &iface_id, enclosing, module_scope, out, candidates);
                    return;
                }
            }
        }
        "method_signature" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                if !name.is_empty() {
                    emit_callable(node, source, b, UnitKind::Method, &name, parent_id, out);
                    return;
                }
            }
        }
        "enum_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                if !name.is_empty() {
                    let mut unit = b.unit(UnitKind::Class, &name, node);
                    unit.signature = name.clone();
                    unit.parent_id = Some(parent_id.to_string());
                    out.units.push(unit);
                    return;
                }
            }
        }
        "variable_declarator" => {
            // `const f = (…) => {…}` / `const f = function (…) {…}`
            let value = node.child_by_field_name("value");
            if let (Some(name_node), Some(value)) = (node.child_by_field_name("name"), value) {
                if matches!(
                    value.kind(),
                    "arrow_function" | "function_expression" | "function"
                ) {
                    let name = node_text(name_node, source).to_string();
                    if !name.is_empty() && name_node.kind() == "identifier" {
                        let kind = if is_inside_class(node) {
                            UnitKind::Method
                        } else {
                            UnitKind::Function
                        };
                        let idx = emit_assigned_fn(node, value, source, b, kind, &name, parent_id, out);
                        descend(value, source, b, parent_id, Some(idx), module_scope, out, candidates);
                        return;
                    }
                }
            }
        }
        "public_field_definition" | "field_definition" => {
            // class field holding an arrow function is a method in practice;
            // the name field differs between the JS and TS grammars
            let name_node = node
                .child_by_field_name("property")
                .or_else(|| node.child_by_field_name("name"));
            let value = node.child_by_field_name("value");
            if let (Some(name_node), Some(value)) = (name_node, value) {
                if matches!(value.kind(), "arrow_function" | "function_expression" | "function") {
                    let name = node_text(name_node, source).to_string();
                    if !name.is_empty() {
                        let idx =
                            emit_assigned_fn(node, value, source, b, UnitKind::Method, &name, parent_id, out);
                        descend(value, source, b, parent_id, Some(idx), module_scope, out, candidates);
                        return;
                    }
                }
            }
        }
        "call_expression" => {
            if let Some(f) = node.child_by_field_name("function") {
                // IIFE at any level: (function () {…})() / (() => {…})()
                if f.kind() == "parenthesized_expression" {
                    if let Some(inner) = first_function_child(f) {
                        let line = node.start_position().row + 1;
                        let name = synthetic_name(module_scope, line);
                        let idx =
                            emit_assigned_fn(node, inner, source, b, UnitKind::Function, &name, parent_id, out);
                        descend(node, source, b, parent_id, Some(idx), module_scope, out, candidates);
                        return;
                    }
                }
                if let Some(path) = dotted_path(f, source) {
                    if path == "require" {
                        if let Some(target) = first_string_argument(node, source) {
                            out.imports.push(ImportRef {
                                module_id: out.units[0].id.clone(),
                                origin: classify_import(&target),
                                line: node.start_position().row + 1,
                                target,
                            });
                        }
                    } else {
                        if is_handler_registration(&path) {
                            collect_handler_arguments(node, source, candidates);
                        }
                        if let Some(idx) = enclosing {
                            out.units[idx].push_callee(path);
                        }
                    }
                }
            }
        }
        "import_statement" => {
            if let Some(src_node) = node.child_by_field_name("source") {
                let target = node_text(src_node, source)
                    .trim_matches(|c| c == '"' || c == '\'' || c == '`')
                    .to_string();
                if !target.is_empty() {
                    out.imports.push(ImportRef {
                        module_id: out.units[0].id.clone(),
                        origin: classify_import(&target),
                        line: node.start_position().row + 1,
                        target,
                    });
                }
            }
            return;
        }
        _ => {}
    }

    descend(node, source, b, parent_id, enclosing, module_scope, out, candidates);
}

#[allow(clippy::too_many_arguments)]
fn descend(
    node: Node<'_>,
    source: &str,
    b: &UnitBuilder<'_>,
    parent_id: &str,
    enclosing: Option<usize>,
    module_scope: &str,
    out: &mut ParseResult,
    candidates: &mut HashSet<String>,
) {
    for i in 0..node.named_child_count() {
        if let Some(child) = node.named_child(i) {
            walk(child, source, b, parent_id, enclosing, module_scope, out, candidates);
        }
    }
}

/// Emit a callable unit whose parameters come from the node's own
/// `parameters` field. Returns the unit's index for call attachment.
fn emit_callable(
    node: Node<'_>,
    source: &str,
    b: &UnitBuilder<'_>,
    kind: UnitKind,
    name: &str,
    parent_id: &str,
    out: &mut ParseResult,
) -> usize {
    let mut unit = b.unit(kind, name, node);
    unit.parameters = param_names(node, source);
    unit.signature = render_signature(name, &unit.parameters);
    unit.docstring = leading_doc(node, source, COMMENT_KINDS);
    unit.parent_id = Some(parent_id.to_string());
    out.units.push(unit);
    out.units.len() - 1
}

/// Emit a unit for a function value assigned to a name (declarator, class
/// field, IIFE). Span covers the whole assignment node; parameters come from
/// the function value.
#[allow(clippy::too_many_arguments)]
fn emit_assigned_fn(
    span_node: Node<'_>,
    value: Node<'_>,
    source: &str,
    b: &UnitBuilder<'_>,
    kind: UnitKind,
    name: &str,
    parent_id: &str,
    out: &mut ParseResult,
) -> usize {
    let mut unit = b.unit(kind, name, span_node);
    unit.parameters = param_names(value, source);
    unit.signature = render_signature(name, &unit.parameters);
    unit.docstring = leading_doc(span_node, source, COMMENT_KINDS);
    unit.parent_id = Some(parent_id.to_string());
    out.units.push(unit);
    out.units.len() - 1
}

fn first_function_child(paren: Node<'_>) -> Option<Node<'_>> {
    for i in 0..paren.named_child_count() {
        if let Some(c) = paren.named_child(i) {
            if matches!(c.kind(), "arrow_function" | "function_expression" | "function") {
                return Some(c);
            }
        }
    }
    None
}

fn first_string_argument(call: Node<'_>, source: &str) -> Option<String> {
    let args = call.child_by_field_name("arguments")?;
    for i in 0..args.named_child_count() {
        if let Some(a) = args.named_child(i) {
            if a.kind() == "string" {
                let t = node_text(a, source)
                    .trim_matches(|c| c == '"' || c == '\'' || c == '`')
                    .to_string();
                if !t.is_empty() {
                    return Some(t);
                }
            }
        }
    }
    None
}

fn collect_handler_arguments(call: Node<'_>, source: &str, candidates: &mut HashSet<String>) {
    let Some(args) = call.child_by_field_name("arguments") else {
        return;
    };
    for i in 0..args.named_child_count() {
        if let Some(a) = args.named_child(i) {
            match a.kind() {
                "identifier" => {
                    candidates.insert(node_text(a, source).to_string());
                }
                "member_expression" => {
                    if let Some(p) = dotted_path(a, source) {
                        candidates.insert(last_segment(&p).to_string());
                    }
                }
                _ => {}
            }
        }
    }
}

fn param_names(callable: Node<'_>, source: &str) -> Vec<String> {
    // arrow functions may have a single bare-identifier parameter
    if let Some(single) = callable.child_by_field_name("parameter") {
        if single.kind() == "identifier" {
            return vec![node_text(single, source).to_string()];
        }
    }
    let Some(list) = callable.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for i in 0..list.named_child_count() {
        if let Some(p) = list.named_child(i) {
            if let Some(name) = param_identifier(p, source) {
                out.push(name);
            }
        }
    }
    out
}

/// First plain identifier inside a parameter node (handles TS
/// required/optional parameters, defaults, and rest patterns).
fn param_identifier(node: Node<'_>, source: &str) -> Option<String> {
    if node.kind() == "identifier" {
        return Some(node_text(node, source).to_string());
    }
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if n.kind() == "identifier" {
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

fn is_inside_class(node: Node<'_>) -> bool {
    let mut cur = node.parent();
    while let Some(n) = cur {
        if n.kind() == "class_body" {
            return true;
        }
        cur = n.parent();
    }
    false
}

/// JS/TS import origin: relative paths are local, bare specifiers are
/// third-party packages (there is no separate stdlib namespace).
fn classify_import(target: &str) -> ImportOrigin {
    if target.starts_with("./") || target.starts_with("../") || target.starts_with('/') {
        ImportOrigin::Local
    } else if target.starts_with("node:") {
        ImportOrigin::Std
    } else {
        ImportOrigin::Package
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_js(src: &str, path: &str) -> ParseResult {
        JavascriptParser.parse_string(src, "sock_shop:front-end", path)
    }

    fn parse_ts(src: &str, path: &str) -> ParseResult {
        TypescriptParser.parse_string(src, "sock_shop:front-end", path)
    }

    const INDEX_JS: &str = r#"(function () {
  "use strict";

  // Register the add-to-cart handler.
  function addToCart(itemId) {
    fetch("/cart", { method: "POST", body: itemId });
  }

  module.exports = addToCart;
})();
"#;

    #[test]
    fn iife_gets_synthetic_name_and_inner_function_is_extracted() {
        let res = parse_js(INDEX_JS, "index.js");
        let add = res
            .units
            .iter()
            .find(|u| u.name == "addToCart")
            .expect("addToCart function");
        assert_eq!(add.kind, UnitKind::Function);
        assert!(add.callees.iter().any(|c| c == "fetch"));
        assert_eq!(add.parameters, vec!["itemId".to_string()]);

        let iife = res
            .units
            .iter()
            .find(|u| u.name.starts_with("index_anon_l"))
            .expect("synthetic IIFE unit");
        assert_eq!(iife.kind, UnitKind::Function);

        // No unit ever carries an empty name.
        assert!(res.units.iter().all(|u| !u.name.is_empty()));
    }

    #[test]
    fn arrow_assignment_and_class_methods() {
        let src = r#"const greet = (name) => {
  console.log(name);
};

class Cart {
  add(item) {
    this.items.push(item);
    greet(item.name);
  }
}
"#;
        let res = parse_js(src, "cart.js");
        let greet = res.units.iter().find(|u| u.name == "greet").unwrap();
        assert_eq!(greet.kind, UnitKind::Function);
        assert!(greet.callees.iter().any(|c| c == "console.log"));

        let cart = res.units.iter().find(|u| u.name == "Cart").unwrap();
        assert_eq!(cart.kind, UnitKind::Class);
        let add = res.units.iter().find(|u| u.name == "add").unwrap();
        assert_eq!(add.kind, UnitKind::Method);
        assert_eq!(add.parent_id.as_deref(), Some(&cart.id[..]));
        assert!(add.callees.iter().any(|c| c == "greet"));
    }

    #[test]
    fn es6_imports_and_require_are_recorded() {
        let src = r#"import express from "express";
import { helper } from "./util.js";
const morgan = require("morgan");
"#;
        let res = parse_js(src, "app.js");
        assert_eq!(res.imports.len(), 3);
        assert!(res
            .imports
            .iter()
            .any(|i| i.target == "express" && i.origin == ImportOrigin::Package));
        assert!(res
            .imports
            .iter()
            .any(|i| i.target == "./util.js" && i.origin == ImportOrigin::Local));
        assert!(res.imports.iter().any(|i| i.target == "morgan"));
        // imports only: no non-module units
        assert!(res.units.iter().all(|u| u.kind == UnitKind::Module));
    }

    #[test]
    fn router_registration_marks_entry_hint() {
        let src = r#"function listOrders(req, res) {
  res.send([]);
}
router.get("/orders", listOrders);
"#;
        let res = parse_js(src, "orders.js");
        let handler = res.units.iter().find(|u| u.name == "listOrders").unwrap();
        assert!(handler.entry_hint);
    }

    #[test]
    fn typescript_interface_and_enum() {
        let src = r#"export interface Shipment {
  track(id: string): void;
}

enum Status {
  Pending,
  Done,
}

export class Courier {
  deliver(parcel: string): void {
    console.log(parcel);
  }
}
"#;
        let res = parse_ts(src, "shipping.ts");
        let iface = res.units.iter().find(|u| u.name == "Shipment").unwrap();
        assert_eq!(iface.kind, UnitKind::Interface);
        let track = res.units.iter().find(|u| u.name == "track").unwrap();
        assert_eq!(track.kind, UnitKind::Method);
        assert_eq!(track.parent_id.as_deref(), Some(&iface.id[..]));
        assert!(res
            .units
            .iter()
            .any(|u| u.name == "Status" && u.kind == UnitKind::Class));
        let deliver = res.units.iter().find(|u| u.name == "deliver").unwrap();
        assert_eq!(deliver.parameters, vec!["parcel".to_string()]);
    }

    #[test]
    fn empty_source_produces_nothing() {
        let res = parse_js("   \n", "empty.js");
        assert!(res.units.is_empty());
        assert!(res.errors.is_empty());
    }
}
