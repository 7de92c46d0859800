use crate::syntax::{Field, NodeKind, SyntaxElement, SyntaxNode};
use serde::Serialize;
use std::collections::BTreeSet;

/// One definition found in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineItem {
    pub kind: &'static str,
    pub name: String,
    pub line: usize,
    pub column: usize,
}

/// Names collected across one or more parsed files.
#[derive(Debug, Default, Serialize)]
pub struct SourceAnalysis {
    pub functions: BTreeSet<String>,
    pub structs: BTreeSet<String>,
    pub globals: BTreeSet<String>,
    pub types: BTreeSet<String>,
    pub calls: BTreeSet<String>,
}

impl SourceAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyze(&mut self, tree: &SyntaxNode, source: &str) {
        for node in tree.descendants() {
            match node.kind() {
                NodeKind::FunctionDefinition => {
                    if let Some(name) = node.field(Field::Name) {
                        self.functions.insert(name.text(source).to_string());
                    }
                }
                NodeKind::StructDefinition => {
                    if let Some(name) = node.field_token(Field::Name) {
                        self.structs.insert(name.value.clone());
                    }
                }
                NodeKind::GlobalsBlock => {
                    for name in declared_names(node) {
                        self.globals.insert(name);
                    }
                }
                NodeKind::VariableDeclaration => {
                    if let Some(ty) = node.field_token(Field::Type) {
                        self.types.insert(ty.value.clone());
                    }
                }
                NodeKind::FunctionCall => {
                    let callee = match (node.field(Field::Prefix), node.field_token(Field::Method)) {
                        (Some(prefix), Some(method)) => {
                            format!("{}:{}", prefix.text(source), method.value)
                        }
                        (Some(prefix), None) => prefix.text(source).to_string(),
                        _ => continue,
                    };
                    self.calls.insert(callee);
                }
                _ => {}
            }
        }
    }

    pub fn print_analysis(&self) {
        println!("\n=== vJASS Analysis Results ===\n");

        let sections = [
            ("Functions", &self.functions),
            ("Structs", &self.structs),
            ("Globals", &self.globals),
            ("Types", &self.types),
            ("Calls", &self.calls),
        ];
        for (title, names) in sections {
            println!("{} found ({})", title, names.len());
            for name in names {
                println!("  - {}", name);
            }
            println!();
        }
    }
}

/// Variable names declared directly in the body of `block`.
fn declared_names(block: &SyntaxNode) -> Vec<String> {
    let Some(body) = block.field_node(Field::Body) else {
        return Vec::new();
    };
    body.child_nodes()
        .filter(|node| node.kind() == NodeKind::VariableDeclaration)
        .flat_map(|decl| decl.fields(Field::Declarator))
        .filter_map(SyntaxElement::as_node)
        .filter_map(|declarator| declarator.field_token(Field::Name))
        .map(|name| name.value.clone())
        .collect()
}

/// Top-level definitions in source order: functions, structs, globals and
/// variable declarations.
pub fn outline(tree: &SyntaxNode, source: &str) -> Vec<OutlineItem> {
    let mut items = Vec::new();

    for node in tree.descendants() {
        let (kind, names): (&'static str, Vec<(String, usize, usize)>) = match node.kind() {
            NodeKind::FunctionDefinition => match node.field(Field::Name) {
                Some(name) if !name.is_missing() => {
                    let start = name.span().start;
                    ("function", vec![(name.text(source).to_string(), start.line, start.column)])
                }
                _ => continue,
            },
            NodeKind::StructDefinition => match node.field_token(Field::Name) {
                Some(name) => ("struct", vec![(name.value.clone(), name.line(), name.column())]),
                None => continue,
            },
            NodeKind::GlobalsBlock => {
                let start = node.span().start;
                ("globals", vec![(String::from("globals"), start.line, start.column)])
            }
            NodeKind::VariableDeclaration => {
                let names = node
                    .fields(Field::Declarator)
                    .filter_map(SyntaxElement::as_node)
                    .filter_map(|d| d.field_token(Field::Name))
                    .map(|t| (t.value.clone(), t.line(), t.column()))
                    .collect();
                ("variable", names)
            }
            _ => continue,
        };

        for (name, line, column) in names {
            items.push(OutlineItem {
                kind,
                name,
                line: line + 1,
                column: column + 1,
            });
        }
    }

    items
}
