// src/core/languages/java.rs
use std::collections::BTreeMap;
use std::path::Path;
use tree_sitter::{Parser, Node};

use crate::error::{FlowdocError, Result};
use super::LanguageParser;
use super::super::parser::{
    calculate_hash, AnnotationRecord, ClassRecord, FieldRecord, MethodRecord,
};

/// Java-specific parser using Tree-sitter.
///
/// Extracts the first top-level class or interface of a compilation unit,
/// including annotations with raw attribute text and the call expressions
/// found in each method body. Nested and secondary type declarations are
/// ignored.
pub struct JavaParser {
    parser: Parser,
}

impl JavaParser {
    pub const EXTENSIONS: &'static [&'static str] = &["java"];

    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let java_language = tree_sitter_java::language();
        parser.set_language(&java_language)
            .map_err(|e| FlowdocError::Parser(format!("Failed to set Java language: {}", e)))?;

        Ok(Self { parser })
    }
}

impl LanguageParser for JavaParser {
    fn parse(&mut self, content: &str, file_path: &Path) -> Result<ClassRecord> {
        let tree = self.parser.parse(content, None)
            .ok_or_else(|| FlowdocError::Parser("Failed to parse Java code".to_string()))?;

        let root_node = tree.root_node();
        if root_node.has_error() {
            return Err(FlowdocError::Parser(
                format!("Syntax errors in {}", file_path.display())
            ));
        }

        let package_name = self.extract_package(root_node, content);

        let type_decl = self.find_first_type_declaration(root_node)
            .ok_or_else(|| FlowdocError::Parser(
                format!("No class or interface declaration in {}", file_path.display())
            ))?;

        Ok(self.parse_java_type(type_decl, content, package_name, file_path))
    }

    fn language_name(&self) -> &str {
        "java"
    }
}

impl JavaParser {
    /// Package name from the `package` declaration, if any
    fn extract_package(&self, root: Node, source: &str) -> Option<String> {
        let package_decl = self.find_child_by_kind(root, "package_declaration")?;
        let mut cursor = package_decl.walk();
        let name = package_decl
            .named_children(&mut cursor)
            .find(|c| c.kind() == "scoped_identifier" || c.kind() == "identifier")
            .map(|n| self.node_text(n, source));
        name
    }

    fn find_first_type_declaration<'a>(&self, root: Node<'a>) -> Option<Node<'a>> {
        let mut cursor = root.walk();
        let found = root
            .named_children(&mut cursor)
            .find(|c| c.kind() == "class_declaration" || c.kind() == "interface_declaration");
        found
    }

    /// Build the class record for a class or interface declaration
    fn parse_java_type(
        &self,
        node: Node,
        source: &str,
        package_name: Option<String>,
        file_path: &Path,
    ) -> ClassRecord {
        let is_interface = node.kind() == "interface_declaration";

        let class_name = node.child_by_field_name("name")
            .map(|n| self.node_text(n, source))
            .unwrap_or_default();

        let full_class_name = match &package_name {
            Some(package) => format!("{}.{}", package, class_name),
            None => class_name.clone(),
        };

        let modifiers = self.find_child_by_kind(node, "modifiers");
        let annotations = modifiers
            .map(|m| self.extract_annotations(m, source))
            .unwrap_or_default();
        let is_abstract = modifiers.map_or(false, |m| self.has_modifier(m, "abstract"));

        // `extends` of a class. An interface's `extends` list names superinterfaces,
        // so it is recorded in `interfaces` and `super_class` stays empty.
        let super_class = node.child_by_field_name("superclass")
            .and_then(|sc| sc.named_child(0))
            .map(|t| self.type_name(t, source));

        let interfaces = if is_interface {
            self.find_child_by_kind(node, "extends_interfaces")
                .map(|n| self.extract_type_list(n, source))
                .unwrap_or_default()
        } else {
            node.child_by_field_name("interfaces")
                .map(|n| self.extract_type_list(n, source))
                .unwrap_or_default()
        };

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for member in body.named_children(&mut cursor) {
                match member.kind() {
                    "field_declaration" | "constant_declaration" => {
                        if let Some(field) = self.parse_java_field(member, source) {
                            fields.push(field);
                        }
                    }
                    "method_declaration" => {
                        if let Some(method) = self.parse_java_method(member, source) {
                            methods.push(method);
                        }
                    }
                    _ => {}
                }
            }
        }

        ClassRecord {
            class_name,
            package_name,
            full_class_name,
            annotations,
            fields,
            methods,
            super_class,
            interfaces,
            is_interface,
            is_abstract,
            file_path: file_path.to_path_buf(),
            content_hash: calculate_hash(source),
        }
    }

    /// Parse a field declaration; only the first declarator is recorded
    fn parse_java_field(&self, node: Node, source: &str) -> Option<FieldRecord> {
        let declarator = node.child_by_field_name("declarator")?;
        let name = declarator.child_by_field_name("name")
            .map(|n| self.node_text(n, source))?;
        let field_type = node.child_by_field_name("type")
            .map(|n| self.node_text(n, source))
            .unwrap_or_default();
        let annotations = self.find_child_by_kind(node, "modifiers")
            .map(|m| self.extract_annotations(m, source))
            .unwrap_or_default();

        Some(FieldRecord {
            name,
            field_type,
            annotations,
        })
    }

    /// Parse a method declaration with annotations and call expressions
    fn parse_java_method(&self, node: Node, source: &str) -> Option<MethodRecord> {
        let name = node.child_by_field_name("name")
            .map(|n| self.node_text(n, source))?;

        let return_type = node.child_by_field_name("type")
            .map(|n| self.node_text(n, source))
            .unwrap_or_default();

        let modifiers = self.find_child_by_kind(node, "modifiers");
        let annotations = modifiers
            .map(|m| self.extract_annotations(m, source))
            .unwrap_or_default();
        let is_public = modifiers.map_or(false, |m| self.has_modifier(m, "public"));
        let is_static = modifiers.map_or(false, |m| self.has_modifier(m, "static"));

        let parameters = node.child_by_field_name("parameters")
            .map(|p| self.extract_parameters(p, source))
            .unwrap_or_default();

        let signature = format!("{}({})", name, parameters.join(", "));

        let mut called_methods = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            self.collect_calls(body, source, &mut called_methods);
        }

        Some(MethodRecord {
            name,
            parameters,
            return_type,
            annotations,
            called_methods,
            is_public,
            is_static,
            signature,
        })
    }

    /// `"<type> <name>"` for each formal parameter
    fn extract_parameters(&self, node: Node, source: &str) -> Vec<String> {
        let mut parameters = Vec::new();
        let mut cursor = node.walk();
        for param in node.named_children(&mut cursor) {
            match param.kind() {
                "formal_parameter" => {
                    let param_type = param.child_by_field_name("type")
                        .map(|n| self.node_text(n, source))
                        .unwrap_or_default();
                    let param_name = param.child_by_field_name("name")
                        .map(|n| self.node_text(n, source))
                        .unwrap_or_default();
                    parameters.push(format!("{} {}", param_type, param_name));
                }
                "spread_parameter" => {
                    parameters.push(self.collapse_whitespace(&self.node_text(param, source)));
                }
                _ => {}
            }
        }
        parameters
    }

    /// Pre-order walk collecting method invocations.
    ///
    /// `a.b(x)` is recorded as `a.b`, a bare `b(x)` as `b`.
    fn collect_calls(&self, node: Node, source: &str, calls: &mut Vec<String>) {
        if node.kind() == "method_invocation" {
            if let Some(name_node) = node.child_by_field_name("name") {
                let method_name = self.node_text(name_node, source);
                let call = match node.child_by_field_name("object") {
                    Some(object) => format!(
                        "{}.{}",
                        self.collapse_whitespace(&self.node_text(object, source)),
                        method_name
                    ),
                    None => method_name,
                };
                calls.push(call);
            }
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.collect_calls(child, source, calls);
        }
    }

    /// Annotations attached through a `modifiers` node
    fn extract_annotations(&self, modifiers: Node, source: &str) -> Vec<AnnotationRecord> {
        let mut annotations = Vec::new();
        let mut cursor = modifiers.walk();
        for child in modifiers.named_children(&mut cursor) {
            match child.kind() {
                "marker_annotation" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        annotations.push(AnnotationRecord::new(self.node_text(name, source)));
                    }
                }
                "annotation" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        let attributes = child.child_by_field_name("arguments")
                            .map(|args| self.extract_annotation_arguments(args, source))
                            .unwrap_or_default();
                        annotations.push(AnnotationRecord {
                            name: self.node_text(name, source),
                            attributes,
                        });
                    }
                }
                _ => {}
            }
        }
        annotations
    }

    /// `key = value` pairs, or a single member stored under `value`
    fn extract_annotation_arguments(&self, args: Node, source: &str) -> BTreeMap<String, String> {
        let mut attributes = BTreeMap::new();
        let mut cursor = args.walk();
        for child in args.named_children(&mut cursor) {
            if child.kind() == "element_value_pair" {
                let key = child.child_by_field_name("key").map(|k| self.node_text(k, source));
                let value = child.child_by_field_name("value").map(|v| self.node_text(v, source));
                if let (Some(key), Some(value)) = (key, value) {
                    attributes.insert(key, value);
                }
            } else if child.kind() != "comment" {
                attributes.insert("value".to_string(), self.node_text(child, source));
            }
        }
        attributes
    }

    fn has_modifier(&self, modifiers: Node, keyword: &str) -> bool {
        let mut cursor = modifiers.walk();
        let found = modifiers.children(&mut cursor).any(|c| c.kind() == keyword);
        found
    }

    /// Types listed under `implements` / `extends` for interfaces
    fn extract_type_list(&self, node: Node, source: &str) -> Vec<String> {
        let type_list = match self.find_child_by_kind(node, "type_list") {
            Some(list) => list,
            None => return Vec::new(),
        };
        let mut cursor = type_list.walk();
        let types = type_list
            .named_children(&mut cursor)
            .map(|t| self.type_name(t, source))
            .collect();
        types
    }

    /// Type name without generic arguments
    fn type_name(&self, node: Node, source: &str) -> String {
        if node.kind() == "generic_type" {
            if let Some(base) = node.named_child(0) {
                return self.node_text(base, source);
            }
        }
        self.node_text(node, source)
    }

    /// Extract text content of a node
    fn node_text(&self, node: Node, source: &str) -> String {
        source[node.byte_range()].to_string()
    }

    fn collapse_whitespace(&self, text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Find a child node by its kind
    fn find_child_by_kind<'a>(&self, node: Node<'a>, kind: &str) -> Option<Node<'a>> {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == kind {
                return Some(child);
            }
        }
        None
    }
}
