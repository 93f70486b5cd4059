//! Java extractor.
//!
//! Captures classes, interfaces, enums, their methods and constructors,
//! imports, and method-invocation targets. Spring-style web annotations and
//! `main` mark entry-point hints.

use super::{
    UnitBuilder, dotted_path, is_web_annotation, last_segment, leading_doc, node_text,
    note_syntax_errors, render_signature,
};
use crate::types::{
    CodeUnit, ImportOrigin, ImportRef, Language, ParseIssue, ParseResult, UnitKind,
};
use crate::LanguageParser;
use tracing::debug;
use tree_sitter::{Node, Parser};

const COMMENT_KINDS: &[&str] = &["line_comment", "block_comment"];

pub struct JavaParser;

impl LanguageParser for JavaParser {
    fn language(&self) -> Language {
        Language::Java
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn parse_string(&self, source: &str, namespace: &str, file_path: &str) -> ParseResult {
        extract(source, namespace, file_path)
    }
}

fn extract(source: &str, namespace: &str, file_path: &str) -> ParseResult {
    let mut result = ParseResult::empty(Language::Java, namespace, file_path);
    if source.trim().is_empty() {
        return result;
    }

    let mut parser = Parser::new();
    if let Err(err) = parser.set_language(&tree_sitter_java::LANGUAGE.into()) {
        result.errors.push(ParseIssue {
            file_path: file_path.to_string(),
            line: None,
            message: format!("java grammar unavailable: {err}"),
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

    let b = UnitBuilder::new(namespace, file_path, Language::Java, source);
    let module = b.module_unit();
    let module_id = module.id.clone();
    result.units.push(module);

    walk(root, source, &b, &module_id, None, &mut result);

    debug!(
        file = file_path,
        units = result.units.len(),
        imports = result.imports.len(),
        "java extraction done"
    );
    result
}

fn walk(
    node: Node<'_>,
    source: &str,
    b: &UnitBuilder<'_>,
    parent_id: &str,
    enclosing: Option<usize>,
    out: &mut ParseResult,
) {
    match node.kind() {
        "class_declaration" | "enum_declaration" => {
            if let Some(id) = emit_container(node, source, b, UnitKind::Class, parent_id, out) {
                descend(node, source, b, &id, enclosing, out);
                return;
            }
        }
        "interface_declaration" => {
            if let Some(id) = emit_container(node, source, b, UnitKind::Interface, parent_id, out) {
                descend(node, source, b, &id, enclosing, out);
                return;
            }
        }
        "method_declaration" | "constructor_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                if !name.is_empty() {
                    let mut unit = b.unit(UnitKind::Method, &name, node);
                    unit.parameters = param_names(node.child_by_field_name("parameters"), source);
                    unit.signature = render_signature(&name, &unit.parameters);
                    unit.docstring = leading_doc(node, source, COMMENT_KINDS);
                    unit.parent_id = Some(parent_id.to_string());
                    unit.entry_hint = name == "main" || has_web_annotation(node, source);
                    out.units.push(unit);
                    let idx = out.units.len() - 1;
                    descend(node, source, b, parent_id, Some(idx), out);
                    return;
                }
            }
        }
        "method_invocation" => {
            if let Some(idx) = enclosing {
                if let Some(path) = invocation_path(node, source) {
                    out.units[idx].push_callee(path);
                }
            }
        }
        "import_declaration" => {
            let target = import_target(node, source);
            if !target.is_empty() {
                out.imports.push(ImportRef {
                    module_id: out.units[0].id.clone(),
                    origin: classify_import(&target),
                    line: node.start_position().row + 1,
                    target,
                });
            }
            return;
        }
        _ => {}
    }

    descend(node, source, b, parent_id, enclosing, out);
}

fn descend(
    node: Node<'_>,
    source: &str,
    b: &UnitBuilder<'_>,
    parent_id: &str,
    enclosing: Option<usize>,
    out: &mut ParseResult,
) {
    for i in 0..node.named_child_count() {
        if let Some(child) = node.named_child(i) {
            walk(child, source, b, parent_id, enclosing, out);
        }
    }
}

fn emit_container(
    node: Node<'_>,
    source: &str,
    b: &UnitBuilder<'_>,
    kind: UnitKind,
    parent_id: &str,
    out: &mut ParseResult,
) -> Option<String> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source).to_string();
    if name.is_empty() {
        return None;
    }
    let mut unit: CodeUnit = b.unit(kind, &name, node);
    unit.signature = name.clone();
    unit.docstring = leading_doc(node, source, COMMENT_KINDS);
    unit.parent_id = Some(parent_id.to_string());
    unit.entry_hint = has_web_annotation(node, source);
    let id = unit.id.clone();
    out.units.push(unit);
    Some(id)
}

/// Dotted invocation path: `repo.save(x)` → `repo.save`; calls on computed
/// receivers fall back to the bare method name.
fn invocation_path(node: Node<'_>, source: &str) -> Option<String> {
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, source).to_string())?;
    if name.is_empty() {
        return None;
    }
    match node.child_by_field_name("object") {
        Some(obj) => match dotted_path(obj, source) {
            Some(prefix) => Some(format!("{prefix}.{name}")),
            None => Some(name),
        },
        None => Some(name),
    }
}

fn param_names(params: Option<Node<'_>>, source: &str) -> Vec<String> {
    let Some(list) = params else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for i in 0..list.named_child_count() {
        if let Some(p) = list.named_child(i) {
            match p.kind() {
                "formal_parameter" => {
                    if let Some(n) = p.child_by_field_name("name") {
                        out.push(node_text(n, source).to_string());
                    }
                }
                "spread_parameter" => {
                    // name is the trailing identifier inside the node
                    let mut stack = vec![p];
                    while let Some(n) = stack.pop() {
                        if n.kind() == "identifier" {
                            out.push(node_text(n, source).to_string());
                            break;
                        }
                        for j in (0..n.named_child_count()).rev() {
                            if let Some(c) = n.named_child(j) {
                                stack.push(c);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }
    out
}

fn has_web_annotation(node: Node<'_>, source: &str) -> bool {
    for i in 0..node.child_count() {
        let Some(child) = node.child(i) else { continue };
        if child.kind() != "modifiers" {
            continue;
        }
        for j in 0..child.named_child_count() {
            if let Some(a) = child.named_child(j) {
                if !matches!(a.kind(), "marker_annotation" | "annotation") {
                    continue;
                }
                if let Some(name) = a.child_by_field_name("name") {
                    let text = node_text(name, source);
                    if is_web_annotation(last_segment(text)) {
                        return true;
                    }
                }
            }
        }
    }
    false
}

fn import_target(node: Node<'_>, source: &str) -> String {
    for i in 0..node.named_child_count() {
        if let Some(c) = node.named_child(i) {
            if matches!(c.kind(), "scoped_identifier" | "identifier") {
                return node_text(c, source).to_string();
            }
        }
    }
    String::new()
}

fn classify_import(target: &str) -> ImportOrigin {
    if target.starts_with("java.") || target.starts_with("javax.") {
        ImportOrigin::Std
    } else {
        ImportOrigin::Package
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIPPING_JAVA: &str = r#"package works.weave.socks.shipping;

import java.util.List;
import org.springframework.web.bind.annotation.RestController;
import org.springframework.web.bind.annotation.GetMapping;

/**
 * Shipping endpoints.
 */
@RestController
public class ShippingController {

    private final ShipmentRepository repo;

    @GetMapping("/shipping")
    public List<Shipment> listShipments() {
        return repo.findAll();
    }

    public void archive(Shipment shipment, String reason) {
        repo.save(shipment);
        audit(reason);
    }

    private void audit(String reason) {
    }
}
"#;

    fn parse(src: &str, path: &str) -> ParseResult {
        JavaParser.parse_string(src, "sock_shop:shipping", path)
    }

    #[test]
    fn extracts_class_and_methods_with_parents() {
        let res = parse(SHIPPING_JAVA, "ShippingController.java");
        let class = res
            .units
            .iter()
            .find(|u| u.name == "ShippingController")
            .expect("controller class");
        assert_eq!(class.kind, UnitKind::Class);
        assert!(class.docstring.contains("Shipping endpoints"));
        assert!(class.entry_hint, "@RestController marks the class");

        let list = res.units.iter().find(|u| u.name == "listShipments").unwrap();
        assert_eq!(list.kind, UnitKind::Method);
        assert_eq!(list.parent_id.as_deref(), Some(&class.id[..]));
        assert!(list.entry_hint, "@GetMapping marks the method");

        let archive = res.units.iter().find(|u| u.name == "archive").unwrap();
        assert!(!archive.entry_hint);
        assert_eq!(
            archive.parameters,
            vec!["shipment".to_string(), "reason".to_string()]
        );
        assert_eq!(archive.signature, "archive(shipment, reason)");
    }

    #[test]
    fn captures_invocations_and_imports() {
        let res = parse(SHIPPING_JAVA, "ShippingController.java");
        let archive = res.units.iter().find(|u| u.name == "archive").unwrap();
        assert!(archive.callees.iter().any(|c| c == "repo.save"));
        assert!(archive.callees.iter().any(|c| c == "audit"));

        assert!(res
            .imports
            .iter()
            .any(|i| i.target == "java.util.List" && i.origin == ImportOrigin::Std));
        assert!(res
            .imports
            .iter()
            .any(|i| i.target.ends_with("RestController") && i.origin == ImportOrigin::Package));
    }

    #[test]
    fn main_method_is_an_entry_hint() {
        let src = r#"public class App {
    public static void main(String[] args) {
        run();
    }

    static void run() {}
}
"#;
        let res = parse(src, "App.java");
        let main = res.units.iter().find(|u| u.name == "main").unwrap();
        assert!(main.entry_hint);
        let run = res.units.iter().find(|u| u.name == "run").unwrap();
        assert!(!run.entry_hint);
    }

    #[test]
    fn empty_file_is_silent() {
        let res = parse("", "Empty.java");
        assert!(res.units.is_empty());
        assert!(res.errors.is_empty());
    }
}
